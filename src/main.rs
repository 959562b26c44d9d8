#![no_std]
#![no_main]

use core::fmt::Write;

use static_cell::StaticCell;

use embassy_executor::Spawner;
use embassy_net::Stack;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use embassy_time::{Duration, Timer};

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{self as hal};
#[cfg(feature = "tls")]
use esp_mbedtls::Tls;
use esp_println::logger::init_logger;

use hal::{
    gpio::{Level, Output, OutputConfig},
    rng::Rng,
    timer::timg::TimerGroup,
};
use heapless::String;

use smart_door_core::actuator::{CameraTrigger, DoorLock};
use smart_door_core::controller::DoorController;
use smart_door_core::pins::Board;

extern crate alloc;

#[macro_use]
pub mod config;
mod backend;
pub mod constants;
#[cfg(feature = "tls")]
mod credentials;
mod door;
pub mod transport;
mod wifi;

use backend::Backend;
use config::{CONFIG, FIREBASE_HOST, MAX_VISITORS};
use constants::*;
use wifi::Wifi;

esp_bootloader_esp_idf::esp_app_desc!();

#[cfg(feature = "tls")]
static TLS: StaticCell<Tls<'static>> = StaticCell::new();
static STACK: StaticCell<Mutex<NoopRawMutex, Stack<'static>>> = StaticCell::new();

static RX_BUF: StaticCell<Mutex<NoopRawMutex, [u8; RX_BUFFER_SIZE]>> = StaticCell::new();
static TX_BUF: StaticCell<Mutex<NoopRawMutex, [u8; TX_BUFFER_SIZE]>> = StaticCell::new();

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    init_logger(log::LevelFilter::Info);
    log::info!("smart_door {} starting as {}", VERSION, CONFIG.device_id);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Drive both lines to their idle level before anything else
    let door_line = Output::new(door_gpio!(peripherals), Level::Low, OutputConfig::default());
    let camera_line = Output::new(camera_gpio!(peripherals), Level::Low, OutputConfig::default());

    let settings = CONFIG.settings();
    let pins = match settings.validate(&Board::ESP32) {
        Ok(pins) => pins,
        Err(e) => halt(e).await,
    };
    #[cfg(feature = "tls")]
    let trust = match settings.backend.trust() {
        Ok(trust) => trust,
        Err(e) => halt(e).await,
    };
    log::info!("Settings: {:?}", settings);
    log::info!("Door lock on {}, camera trigger on {}", pins.door, pins.camera);

    let rng = Rng::new(peripherals.RNG);

    esp_alloc::heap_allocator!(size: HEAP_SIZE);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let timg1 = TimerGroup::new(peripherals.TIMG1);

    esp_hal_embassy::init(timg0.timer0);

    let door = DoorLock::new(door_line).unwrap();
    let camera = CameraTrigger::new(camera_line).unwrap();
    let controller: door::Controller = DoorController::new(door, camera, MAX_VISITORS);

    let wifi = Wifi::new(
        peripherals.WIFI,
        timg1.timer0,
        peripherals.RADIO_CLK,
        rng,
        spawner,
    )
    .await
    .unwrap();

    let ip = wifi.connect().await.unwrap();
    let mut ip_address: String<16> = String::new();
    write!(ip_address, "{}", ip).ok();

    #[cfg(feature = "tls")]
    let tls_shared = {
        let mut tls = Tls::new(peripherals.SHA)
            .unwrap()
            .with_hardware_rsa(peripherals.RSA);
        tls.set_debug(0);
        TLS.init(tls)
    };

    #[cfg(feature = "tls")]
    let credentials = credentials::init(FIREBASE_HOST, trust).unwrap();

    let stack_shared = Mutex::new(wifi.stack);
    let stack_shared = STACK.init(stack_shared);

    let rx_buf = RX_BUF.init(Mutex::new([0; RX_BUFFER_SIZE]));
    let tx_buf = TX_BUF.init(Mutex::new([0; TX_BUFFER_SIZE]));

    let mut backend = Backend::new(
        stack_shared,
        #[cfg(feature = "tls")]
        tls_shared,
        #[cfg(feature = "tls")]
        credentials,
        rx_buf,
        tx_buf,
    );

    while let Err(e) = backend.register(&ip_address).await {
        log::error!("Registration failed: {:?}, retrying", e);
        Timer::after(Duration::from_secs(POLL_BACKOFF_SECS)).await;
    }

    spawner.spawn(door::door_task(controller, backend)).ok();
}

// Nothing can run with a bad configuration, keep the error visible on the console
async fn halt(e: impl core::fmt::Display) -> ! {
    loop {
        log::error!("Invalid configuration: {}", e);
        Timer::after(Duration::from_secs(60)).await;
    }
}
