//! Trainer identity from the ESP32 factory MAC address.
//!
//! The last three MAC bytes give a stable name, `dynotrainer-xxyyzz`,
//! used as the MQTT client id so the broker can tell trainers apart.

use core::fmt::Write;

/// `dynotrainer-xxyyzz` fits with room to spare.
pub type ClientIdString = heapless::String<24>;

pub type MacAddress = [u8; 6];

/// Factory MAC from eFuse.  All zeroes if the read fails.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the call writes exactly six bytes into `mac`.
    let ret = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if ret != esp_idf_svc::sys::ESP_OK as i32 {
        log::warn!("device id: eFuse MAC read failed ({})", ret);
    }
    mac
}

#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn client_id(mac: &MacAddress) -> ClientIdString {
    let mut id = ClientIdString::new();
    let _ = write!(id, "dynotrainer-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
