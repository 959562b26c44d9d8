use smart_door_core::pins::PinAssignment;
use smart_door_core::settings::{BackendSettings, Settings, WifiSettings};

pub struct Config {
    // Wi-Fi SSID to connect to
    pub wifi_ssid: &'static str,

    // Wi-Fi pre-shared key, empty for an open network
    pub wifi_password: &'static str,

    // Device ID (used as DHCP hostname and to address backend commands)
    pub device_id: &'static str,

    // Door backend hostname, without scheme
    pub firebase_host: &'static str,

    // Door backend port (443 with TLS)
    pub firebase_port: u16,

    // Bearer token sent to the backend
    pub firebase_auth: &'static str,

    // GPIO driving the door lock actuator
    pub door_pin: u8,

    // GPIO driving the camera trigger
    pub camera_pin: u8,

    // Upper bound on visitor records held in memory
    pub max_visitors: usize,

    // Delay between two command polls
    pub poll_interval_seconds: u16,

    // How long the door stays unlocked after an open command
    pub unlock_seconds: u16,

    // PEM CA certificate of the backend
    pub tls_ca: Option<&'static str>,

    // Skip server certificate verification when no CA is given
    pub tls_insecure: bool,
}

// config values are generated at compile time
include!(concat!(env!("OUT_DIR"), "/config.rs"));

pub const WIFI_SSID: &str = CONFIG.wifi_ssid;
pub const WIFI_PASSWORD: &str = CONFIG.wifi_password;
pub const FIREBASE_HOST: &str = CONFIG.firebase_host;
pub const FIREBASE_AUTH: &str = CONFIG.firebase_auth;
pub const DOOR_PIN: u8 = CONFIG.door_pin;
pub const CAMERA_PIN: u8 = CONFIG.camera_pin;
pub const MAX_VISITORS: usize = CONFIG.max_visitors;

const _: () = assert!(DOOR_PIN != CAMERA_PIN, "door and camera need distinct GPIOs");
const _: () = assert!(MAX_VISITORS > 0, "MAX_VISITORS must be positive");
const _: () = assert!(
    MAX_VISITORS <= smart_door_core::VISITOR_CAPACITY,
    "MAX_VISITORS exceeds the visitor log storage"
);

impl Config {
    pub const fn settings(&self) -> Settings<'static> {
        Settings {
            wifi: WifiSettings {
                ssid: self.wifi_ssid,
                password: self.wifi_password,
            },
            backend: BackendSettings {
                host: self.firebase_host,
                port: self.firebase_port,
                auth: self.firebase_auth,
                device_id: self.device_id,
                tls_ca: self.tls_ca,
                tls_insecure: self.tls_insecure,
            },
            pins: PinAssignment {
                door: self.door_pin,
                camera: self.camera_pin,
            },
            max_visitors: self.max_visitors,
            poll_interval_seconds: self.poll_interval_seconds,
            unlock_seconds: self.unlock_seconds,
        }
    }
}
