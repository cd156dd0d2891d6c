//! WiFi station-mode link adapter.
//!
//! Implements [`LinkPort`] — association is the only thing the
//! supervisor cares about; DHCP and addressing stay inside here.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Retry policy
//!
//! Deliberately *not* exponential: the supervisor polls at a fixed
//! interval, forever.  Without a link the device has no purpose, and
//! the only fix for a long outage is human intervention at the access
//! point — growing the backoff would just slow recovery.

use core::fmt;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::LinkPort;

// ───────────────────────────────────────────────────────────────
// Credential validation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), CredentialsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CredentialsError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), CredentialsError> {
    if password.is_empty() {
        return Ok(()); // open network
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CredentialsError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Link adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiLink {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    attempts: u32,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    #[cfg(target_os = "espidf")]
    configured: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_associated: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_associate_after: u32,
}

impl WifiLink {
    /// Wrap the ESP-IDF WiFi driver in station mode.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
        ssid: &str,
        password: &str,
    ) -> anyhow::Result<Self> {
        use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

        let (ssid, password) = Self::checked_credentials(ssid, password)?;
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;

        Ok(Self {
            ssid,
            password,
            attempts: 0,
            wifi,
            configured: false,
        })
    }

    /// Host simulation: associates after `sim_associate_after` attempts.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(ssid: &str, password: &str) -> anyhow::Result<Self> {
        let (ssid, password) = Self::checked_credentials(ssid, password)?;
        Ok(Self {
            ssid,
            password,
            attempts: 0,
            sim_associated: false,
            sim_associate_after: 1,
        })
    }

    /// Delay simulated association (exercises the retry path).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_associate_after(&mut self, attempts: u32) {
        self.sim_associate_after = attempts;
        self.sim_associated = false;
    }

    fn checked_credentials(
        ssid: &str,
        password: &str,
    ) -> anyhow::Result<(heapless::String<32>, heapless::String<64>)> {
        validate_ssid(ssid).map_err(|e| anyhow::anyhow!("{e}"))?;
        validate_password(password).map_err(|e| anyhow::anyhow!("{e}"))?;
        let mut s = heapless::String::new();
        let mut p = heapless::String::new();
        // Lengths were just validated against the buffer capacities.
        let _ = s.push_str(ssid);
        let _ = p.push_str(password);
        Ok((s, p))
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_attempt(&mut self) {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        if !self.configured {
            let auth_method = if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            let client_config = Configuration::Client(ClientConfiguration {
                ssid: self.ssid.clone(),
                password: self.password.clone(),
                auth_method,
                ..Default::default()
            });
            if let Err(e) = self.wifi.set_configuration(&client_config) {
                warn!("WiFi: set_configuration failed ({e})");
                return;
            }
            if let Err(e) = self.wifi.start() {
                warn!("WiFi: start failed ({e})");
                return;
            }
            self.configured = true;
        }

        if let Err(e) = self.wifi.connect() {
            warn!("WiFi: connect failed ({e})");
            return;
        }
        if let Err(e) = self.wifi.wait_netif_up() {
            warn!("WiFi: netif not up ({e})");
            return;
        }
        match self.wifi.wifi().sta_netif().get_ip_info() {
            Ok(ip_info) => info!("WiFi: associated, IP {}", ip_info.ip),
            Err(e) => warn!("WiFi: associated but no IP info ({e})"),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_attempt(&mut self) {
        if self.attempts >= self.sim_associate_after {
            if !self.sim_associated {
                info!("WiFi(sim): associated to '{}' (attempt {})", self.ssid, self.attempts);
            }
            self.sim_associated = true;
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_associated(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_associated(&self) -> bool {
        self.sim_associated
    }
}

impl LinkPort for WifiLink {
    fn attempt(&mut self) {
        self.attempts = self.attempts.wrapping_add(1);
        if self.attempts == 1 || self.attempts % 20 == 0 {
            // Periodic, not per-attempt: at a 500 ms poll this logs
            // every 10 s of outage instead of flooding.
            info!("WiFi: waiting for '{}' (attempt {})", self.ssid, self.attempts);
        }
        self.platform_attempt();
    }

    fn is_associated(&self) -> bool {
        self.platform_is_associated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ssid() {
        assert!(WifiLink::new("", "password123").is_err());
    }

    #[test]
    fn rejects_short_password() {
        assert!(WifiLink::new("MyNet", "short").is_err());
    }

    #[test]
    fn accepts_open_network() {
        assert!(WifiLink::new("OpenCafe", "").is_ok());
    }

    #[test]
    fn accepts_valid_wpa2() {
        assert!(WifiLink::new("HomeWiFi", "mysecret8").is_ok());
    }

    #[test]
    fn rejects_control_characters_in_ssid() {
        assert!(WifiLink::new("bad\nssid", "password1").is_err());
    }

    #[test]
    fn sim_association_needs_the_configured_attempts() {
        let mut link = WifiLink::new("TestNet", "password1").unwrap();
        link.sim_associate_after(3);
        assert!(!link.is_associated());
        link.attempt();
        link.attempt();
        assert!(!link.is_associated());
        link.attempt();
        assert!(link.is_associated());
    }
}
