//! One-shot hardware peripheral initialization and raw GPIO access.
//!
//! Configures GPIO directions and the per-pin ISR service using raw
//! ESP-IDF sys calls.  Called once from `main()` before the control loop
//! starts.  Host builds get no-op stubs so the rest of the crate links.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAttachFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAttachFailed(pin) => write!(f, "ISR attach failed on GPIO {}", pin),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::GpioConfigFailed(_) => Self::Init("gpio config"),
            HwInitError::IsrInstallFailed(_) | HwInitError::IsrAttachFailed(_) => {
                Self::Init("gpio isr")
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Pulse inputs are already conditioned; no pulls.
    for &pin in &[pins::ROTATION_PULSE_GPIO, pins::HEARTBEAT_PULSE_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    let switch_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::LIMIT_SWITCH_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&switch_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Host stub: reads HIGH, which is "released" for the pulled-up switch.
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &pin in &pins::STEPPER_OUTPUT_GPIOS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        // Coils off until the first move.
        unsafe { gpio_set_level(pin as gpio_num_t, 0) };
    }

    info!("hw_init: stepper outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an output pin configured in
    // init_gpio_outputs(). Control loop only.
    unsafe { gpio_set_level(pin as gpio_num_t, u32::from(high)); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Timing ────────────────────────────────────────────────────

/// Milliseconds since boot.  ISR-safe.
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u64 {
    // SAFETY: esp_timer_get_time is an RTC counter read; safe in any context.
    (unsafe { esp_timer_get_time() } / 1_000) as u64
}

#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// Busy-wait for `us` microseconds.  Used between stepper pulses.
#[cfg(target_os = "espidf")]
pub fn delay_us(us: u32) {
    // SAFETY: ROM busy-wait; no shared state.
    unsafe { esp_rom_delay_us(us) };
}

#[cfg(not(target_os = "espidf"))]
pub fn delay_us(_us: u32) {}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn rotation_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::sensors::rotation_isr_handler();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn heartbeat_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::sensors::heartbeat_isr_handler(uptime_ms());
}

/// Install the per-pin GPIO ISR service and attach both pulse handlers.
/// Call after init_peripherals() and before the control loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service was already
    // installed.  The handlers only touch the edge counter's atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let handlers: [(i32, unsafe extern "C" fn(*mut core::ffi::c_void)); 2] = [
            (pins::ROTATION_PULSE_GPIO, rotation_gpio_isr),
            (pins::HEARTBEAT_PULSE_GPIO, heartbeat_gpio_isr),
        ];
        for (pin, handler) in handlers {
            gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_POSEDGE);
            if gpio_isr_handler_add(pin, Some(handler), core::ptr::null_mut()) != ESP_OK as i32 {
                return Err(HwInitError::IsrAttachFailed(pin));
            }
            gpio_intr_enable(pin);
        }

        info!("hw_init: ISR service installed (rotation, heartbeat)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
