//! WiFi station-mode adapter.
//!
//! Brings the station link up once at boot, starts SNTP so event
//! timestamps are wall-clock, and reports the station address that goes
//! into `start_session`.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: only credential validation and address
//!   formatting, which are target-independent.
//!
//! A failed bring-up is not fatal: the trainer runs offline and events go
//! to the serial log only.

use core::fmt::{self, Write as _};

use crate::app::events::IpString;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && password.len() < 8 {
            return Err(ConnectivityError::InvalidPassword);
        }
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds
            .ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials baked in at build time through `DYNOTRAINER_WIFI_SSID`
    /// and `DYNOTRAINER_WIFI_PASS`.
    pub fn from_build_env() -> Result<Self, ConnectivityError> {
        let ssid = option_env!("DYNOTRAINER_WIFI_SSID").ok_or(ConnectivityError::NoCredentials)?;
        Self::new(ssid, option_env!("DYNOTRAINER_WIFI_PASS").unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Render a station address into the fixed-capacity form carried by
/// `start_session`.  `None` for the unspecified address.
pub fn format_ip(addr: impl fmt::Display) -> Option<IpString> {
    let mut out = IpString::new();
    write!(out, "{addr}").ok()?;
    if out.is_empty() || out == "0.0.0.0" {
        return None;
    }
    Some(out)
}

#[cfg(target_os = "espidf")]
pub use esp::WifiLink;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sntp::EspSntp;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{error, info, warn};

    use super::{ConnectivityError, WifiCredentials, format_ip};
    use crate::app::events::IpString;

    /// Live station link.  Dropping it tears WiFi and SNTP down.
    pub struct WifiLink {
        wifi: BlockingWifi<EspWifi<'static>>,
        _sntp: Option<EspSntp<'static>>,
    }

    impl WifiLink {
        pub fn connect(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: EspDefaultNvsPartition,
            creds: &WifiCredentials,
        ) -> Result<Self, ConnectivityError> {
            let failed = |e: esp_idf_svc::sys::EspError| {
                error!("WiFi: {}", e);
                ConnectivityError::ConnectionFailed
            };

            let driver = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(failed)?;
            let mut wifi = BlockingWifi::wrap(driver, sysloop).map_err(failed)?;

            let config = ClientConfiguration {
                ssid: creds
                    .ssid()
                    .try_into()
                    .map_err(|_| ConnectivityError::InvalidSsid)?,
                password: creds
                    .password()
                    .try_into()
                    .map_err(|_| ConnectivityError::InvalidPassword)?,
                auth_method: if creds.is_open() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            };
            wifi.set_configuration(&Configuration::Client(config))
                .map_err(failed)?;

            info!("WiFi: connecting to '{}'", creds.ssid());
            wifi.start().map_err(failed)?;
            wifi.connect().map_err(failed)?;
            wifi.wait_netif_up().map_err(failed)?;

            let sntp = match EspSntp::new_default() {
                Ok(sntp) => Some(sntp),
                Err(e) => {
                    warn!("SNTP: start failed ({}), timestamps stay on uptime", e);
                    None
                }
            };

            let link = Self { wifi, _sntp: sntp };
            info!("WiFi: connected, ip={:?}", link.station_ip());
            Ok(link)
        }

        pub fn is_connected(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false)
        }

        pub fn station_ip(&self) -> Option<IpString> {
            let info = self.wifi.wifi().sta_netif().get_ip_info().ok()?;
            format_ip(info.ip)
        }
    }
}
