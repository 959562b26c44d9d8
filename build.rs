use std::{env, error::Error, fs, path::Path};

use serde::Deserialize;
use smart_door_core::pins::{Board, PinAssignment, DEFAULT_CAMERA_PIN, DEFAULT_DOOR_PIN};
use smart_door_core::settings::{BackendSettings, Settings, WifiSettings};

const DEFAULT_MAX_VISITORS: usize = 100;

#[derive(Deserialize)]
struct RawConfig {
    wifi_ssid: String,
    #[serde(default)]
    wifi_password: String,
    device_id: String,
    firebase_host: String,
    #[serde(default = "default_port")]
    firebase_port: u16,
    firebase_auth: String,
    #[serde(default = "default_door_pin")]
    door_pin: u8,
    #[serde(default = "default_camera_pin")]
    camera_pin: u8,
    #[serde(default = "default_max_visitors")]
    max_visitors: usize,
    #[serde(default = "default_poll_interval")]
    poll_interval_seconds: u16,
    #[serde(default = "default_unlock")]
    unlock_seconds: u16,
    tls_ca: Option<String>,
    #[serde(default)]
    tls_insecure: bool,
}

fn default_port() -> u16 {
    443
}
fn default_door_pin() -> u8 {
    DEFAULT_DOOR_PIN
}
fn default_camera_pin() -> u8 {
    DEFAULT_CAMERA_PIN
}
fn default_max_visitors() -> usize {
    DEFAULT_MAX_VISITORS
}
fn default_poll_interval() -> u16 {
    2
}
fn default_unlock() -> u16 {
    5
}

fn main() -> Result<(), Box<dyn Error>> {
    // Tell Cargo to rerun if toml changes
    println!("cargo:rerun-if-changed=cfg.toml");
    println!("cargo:rerun-if-changed=cfg.toml.example");

    let path = if Path::new("cfg.toml").exists() {
        "cfg.toml"
    } else {
        println!("cargo:warning=cfg.toml not found, building with cfg.toml.example");
        "cfg.toml.example"
    };

    // Read and parse
    let toml_str = fs::read_to_string(path)?;
    let raw: RawConfig = toml::from_str(&toml_str)?;

    let settings = Settings {
        wifi: WifiSettings {
            ssid: &raw.wifi_ssid,
            password: &raw.wifi_password,
        },
        backend: BackendSettings {
            host: &raw.firebase_host,
            port: raw.firebase_port,
            auth: &raw.firebase_auth,
            device_id: &raw.device_id,
            tls_ca: raw.tls_ca.as_deref(),
            tls_insecure: raw.tls_insecure,
        },
        pins: PinAssignment {
            door: raw.door_pin,
            camera: raw.camera_pin,
        },
        max_visitors: raw.max_visitors,
        poll_interval_seconds: raw.poll_interval_seconds,
        unlock_seconds: raw.unlock_seconds,
    };
    settings
        .validate(&Board::ESP32)
        .map_err(|e| format!("invalid {}: {}", path, e))?;

    // The firmware refuses to connect in this case, say so early
    if env::var_os("CARGO_FEATURE_TLS").is_some() {
        if let Err(e) = settings.backend.trust() {
            println!("cargo:warning={}: {}", path, e);
        }
    }

    // Generate Rust code
    let out_dir = env::var("OUT_DIR")?;
    let dest_path = Path::new(&out_dir).join("config.rs");
    let code = format!(
        r#"
        pub const CONFIG: Config = Config {{
            wifi_ssid: {ssid:?},
            wifi_password: {psk:?},
            device_id: {dev:?},
            firebase_host: {host:?},
            firebase_port: {port},
            firebase_auth: {auth:?},
            door_pin: {door},
            camera_pin: {camera},
            max_visitors: {max},
            poll_interval_seconds: {poll},
            unlock_seconds: {unlock},
            tls_ca: {ca:?},
            tls_insecure: {insecure},
        }};

        macro_rules! door_gpio {{
            ($p:expr) => {{ $p.GPIO{door} }};
        }}

        macro_rules! camera_gpio {{
            ($p:expr) => {{ $p.GPIO{camera} }};
        }}
    "#,
        ssid = raw.wifi_ssid,
        psk = raw.wifi_password,
        dev = raw.device_id,
        host = raw.firebase_host,
        port = raw.firebase_port,
        auth = raw.firebase_auth,
        door = raw.door_pin,
        camera = raw.camera_pin,
        max = raw.max_visitors,
        poll = raw.poll_interval_seconds,
        unlock = raw.unlock_seconds,
        ca = raw.tls_ca,
        insecure = raw.tls_insecure,
    );

    fs::write(dest_path, code)?;
    Ok(())
}
