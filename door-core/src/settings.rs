use core::fmt;

use crate::pins::{Board, PinAssignment, PinError, ValidatedPins};
use crate::VISITOR_CAPACITY;

/// 802.11 limits
pub const SSID_MAX: usize = 32;
pub const PASSWORD_MAX: usize = 64;

pub const DEVICE_ID_MAX: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    SsidLength,
    PasswordLength,
    BackendHost,
    BackendAuth,
    DeviceId,
    Pins(PinError),
    Capacity,
    PollInterval,
    UnlockDuration,
    /// `tls_ca` is not a PEM certificate
    TlsCa,
    /// `tls_ca` and `tls_insecure` both set
    TlsTrustConflict,
    /// TLS without a CA and without `tls_insecure`
    TlsCaMissing,
}

impl From<PinError> for SettingsError {
    fn from(e: PinError) -> Self {
        SettingsError::Pins(e)
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::SsidLength => write!(f, "wifi_ssid must be 1..={} bytes", SSID_MAX),
            SettingsError::PasswordLength => {
                write!(f, "wifi_password must be at most {} bytes", PASSWORD_MAX)
            }
            SettingsError::BackendHost => {
                write!(f, "firebase_host must be a bare hostname (no scheme, path or spaces)")
            }
            SettingsError::BackendAuth => write!(f, "firebase_auth must not be empty"),
            SettingsError::DeviceId => write!(
                f,
                "device_id must be 1..={} characters of [A-Za-z0-9_-]",
                DEVICE_ID_MAX
            ),
            SettingsError::Pins(e) => write!(f, "{}", e),
            SettingsError::Capacity => {
                write!(f, "max_visitors must be in 1..={}", VISITOR_CAPACITY)
            }
            SettingsError::PollInterval => write!(f, "poll_interval_seconds must be positive"),
            SettingsError::UnlockDuration => write!(f, "unlock_seconds must be positive"),
            SettingsError::TlsCa => write!(f, "tls_ca must be a PEM certificate"),
            SettingsError::TlsTrustConflict => {
                write!(f, "tls_ca and tls_insecure are mutually exclusive")
            }
            SettingsError::TlsCaMissing => write!(
                f,
                "tls_ca is required, set tls_insecure = true to skip server verification"
            ),
        }
    }
}

#[derive(Clone, Copy)]
pub struct WifiSettings<'a> {
    pub ssid: &'a str,
    /// Empty for an open network
    pub password: &'a str,
}

#[derive(Clone, Copy)]
pub struct BackendSettings<'a> {
    pub host: &'a str,
    pub port: u16,
    pub auth: &'a str,
    pub device_id: &'a str,
    /// PEM CA chain the backend certificate is checked against
    pub tls_ca: Option<&'a str>,
    /// Connect over TLS without checking the server certificate
    pub tls_insecure: bool,
}

/// How the backend certificate is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerTrust<'a> {
    Ca(&'a str),
    /// Explicitly configured, the server is not authenticated
    Unverified,
}

/// Device configuration, validated once at startup.
#[derive(Debug, Clone, Copy)]
pub struct Settings<'a> {
    pub wifi: WifiSettings<'a>,
    pub backend: BackendSettings<'a>,
    pub pins: PinAssignment,
    pub max_visitors: usize,
    pub poll_interval_seconds: u16,
    pub unlock_seconds: u16,
}

// Secrets stay out of logs.
impl fmt::Debug for WifiSettings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiSettings")
            .field("ssid", &self.ssid)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Debug for BackendSettings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth", &"***")
            .field("device_id", &self.device_id)
            .field("tls_ca", &self.tls_ca.is_some())
            .field("tls_insecure", &self.tls_insecure)
            .finish()
    }
}

impl<'a> Settings<'a> {
    /// Check every invariant and return the validated pins. The first
    /// violation found is returned.
    pub fn validate(&self, board: &Board) -> Result<ValidatedPins, SettingsError> {
        let ssid = self.wifi.ssid.len();
        if ssid == 0 || ssid > SSID_MAX {
            return Err(SettingsError::SsidLength);
        }
        if self.wifi.password.len() > PASSWORD_MAX {
            return Err(SettingsError::PasswordLength);
        }

        if !is_bare_host(self.backend.host) {
            return Err(SettingsError::BackendHost);
        }
        if self.backend.auth.is_empty() {
            return Err(SettingsError::BackendAuth);
        }
        if !is_device_id(self.backend.device_id) {
            return Err(SettingsError::DeviceId);
        }

        let pins = self.pins.validate(board)?;

        if self.max_visitors == 0 || self.max_visitors > VISITOR_CAPACITY {
            return Err(SettingsError::Capacity);
        }
        if self.poll_interval_seconds == 0 {
            return Err(SettingsError::PollInterval);
        }
        if self.unlock_seconds == 0 {
            return Err(SettingsError::UnlockDuration);
        }

        match (self.backend.tls_ca, self.backend.tls_insecure) {
            (Some(_), true) => return Err(SettingsError::TlsTrustConflict),
            (Some(pem), false) if !is_pem_certificate(pem) => return Err(SettingsError::TlsCa),
            _ => {}
        }

        Ok(pins)
    }
}

impl<'a> BackendSettings<'a> {
    /// Trust anchor for a TLS connection. Refuses to go unverified unless
    /// `tls_insecure` is set.
    pub fn trust(&self) -> Result<ServerTrust<'a>, SettingsError> {
        match (self.tls_ca, self.tls_insecure) {
            (Some(_), true) => Err(SettingsError::TlsTrustConflict),
            (Some(pem), false) if is_pem_certificate(pem) => Ok(ServerTrust::Ca(pem)),
            (Some(_), false) => Err(SettingsError::TlsCa),
            (None, true) => Ok(ServerTrust::Unverified),
            (None, false) => Err(SettingsError::TlsCaMissing),
        }
    }
}

fn is_pem_certificate(pem: &str) -> bool {
    match (
        pem.find("-----BEGIN CERTIFICATE-----"),
        pem.rfind("-----END CERTIFICATE-----"),
    ) {
        (Some(begin), Some(end)) => begin < end,
        _ => false,
    }
}

fn is_bare_host(host: &str) -> bool {
    !host.is_empty()
        && !host.contains("://")
        && !host
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '?' || c == '#')
}

fn is_device_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= DEVICE_ID_MAX
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const CA: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn sample() -> Settings<'static> {
        Settings {
            wifi: WifiSettings {
                ssid: "home",
                password: "hunter22",
            },
            backend: BackendSettings {
                host: "door-api.example.com",
                port: 443,
                auth: "s3cr3t-token",
                device_id: "front-door",
                tls_ca: Some(CA),
                tls_insecure: false,
            },
            pins: PinAssignment::default(),
            max_visitors: 100,
            poll_interval_seconds: 2,
            unlock_seconds: 5,
        }
    }

    #[test]
    fn reference_settings_validate() {
        let pins = sample().validate(&Board::ESP32).unwrap();
        assert_eq!(pins.door.index(), 5);
        assert_eq!(pins.camera.index(), 4);
    }

    #[test]
    fn ssid_bounds() {
        let mut s = sample();
        s.wifi.ssid = "";
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::SsidLength));
        s.wifi.ssid = "0123456789abcdef0123456789abcdefX";
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::SsidLength));
    }

    #[test]
    fn open_network_is_allowed() {
        let mut s = sample();
        s.wifi.password = "";
        assert!(s.validate(&Board::ESP32).is_ok());
    }

    #[test]
    fn host_must_not_carry_scheme_or_path() {
        let mut s = sample();
        for host in ["", "https://x.firebaseio.com", "x.example.com/api", "a b"] {
            s.backend.host = host;
            assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::BackendHost), "{host}");
        }
    }

    #[test]
    fn empty_token_is_rejected() {
        let mut s = sample();
        s.backend.auth = "";
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::BackendAuth));
    }

    #[test]
    fn device_id_charset() {
        let mut s = sample();
        s.backend.device_id = "front door";
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::DeviceId));
        s.backend.device_id = "door_01-A";
        assert!(s.validate(&Board::ESP32).is_ok());
    }

    #[test]
    fn pin_errors_are_wrapped() {
        let mut s = sample();
        s.pins.camera = s.pins.door;
        assert_eq!(
            s.validate(&Board::ESP32),
            Err(SettingsError::Pins(PinError::Conflict(5)))
        );
    }

    #[test]
    fn capacity_must_be_positive_and_fit() {
        let mut s = sample();
        s.max_visitors = 0;
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::Capacity));
        s.max_visitors = VISITOR_CAPACITY + 1;
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::Capacity));
        s.max_visitors = VISITOR_CAPACITY;
        assert!(s.validate(&Board::ESP32).is_ok());
    }

    #[test]
    fn timing_must_be_positive() {
        let mut s = sample();
        s.poll_interval_seconds = 0;
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::PollInterval));
        let mut s = sample();
        s.unlock_seconds = 0;
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::UnlockDuration));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let out = format!("{:?}", sample());
        assert!(!out.contains("hunter22"));
        assert!(!out.contains("s3cr3t-token"));
        assert!(out.contains("door-api.example.com"));
    }

    #[test]
    fn ca_certificate_is_used_as_trust_anchor() {
        assert_eq!(sample().backend.trust(), Ok(ServerTrust::Ca(CA)));
    }

    #[test]
    fn malformed_ca_is_rejected() {
        let mut s = sample();
        s.backend.tls_ca = Some("MIIB");
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::TlsCa));
        assert_eq!(s.backend.trust(), Err(SettingsError::TlsCa));
        s.backend.tls_ca = Some("-----END CERTIFICATE-----\n-----BEGIN CERTIFICATE-----");
        assert_eq!(s.backend.trust(), Err(SettingsError::TlsCa));
    }

    #[test]
    fn missing_ca_needs_explicit_opt_out() {
        let mut s = sample();
        s.backend.tls_ca = None;
        // fine for plain TCP builds, refused for TLS
        assert!(s.validate(&Board::ESP32).is_ok());
        assert_eq!(s.backend.trust(), Err(SettingsError::TlsCaMissing));

        s.backend.tls_insecure = true;
        assert_eq!(s.backend.trust(), Ok(ServerTrust::Unverified));
    }

    #[test]
    fn ca_and_insecure_conflict() {
        let mut s = sample();
        s.backend.tls_insecure = true;
        assert_eq!(s.validate(&Board::ESP32), Err(SettingsError::TlsTrustConflict));
        assert_eq!(s.backend.trust(), Err(SettingsError::TlsTrustConflict));
    }
}
