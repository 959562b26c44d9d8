use core::str::FromStr;

use embassy_executor::Spawner;
use embassy_net::{DhcpConfig, Ipv4Address, Runner, Stack, StackResources};
use embassy_time::{with_timeout, Duration, Timer};
use esp_hal::peripherals::{RADIO_CLK, WIFI};
use esp_hal::rng::Rng;
use esp_wifi::{
    wifi::{
        ClientConfiguration, Configuration, WifiController, WifiDevice, WifiError, WifiEvent,
        WifiState,
    },
    EspWifiController, EspWifiTimerSource,
};
use heapless::String;
use static_cell::StaticCell;

use crate::config::{CONFIG, WIFI_PASSWORD, WIFI_SSID};
use crate::constants::{WIFI_CONNECT_TIMEOUT_SECS, WIFI_RECONNECT_DELAY_MS};

static RESOURCES: StaticCell<StackResources<5>> = StaticCell::new();
static RADIO: StaticCell<EspWifiController<'static>> = StaticCell::new();

/// Station-mode network stack, addressed by the device id over DHCP.
pub struct Wifi {
    pub stack: Stack<'static>,
}

#[derive(Debug)]
pub enum Error {
    WifiInitFailed,
    HostnameTooLong,
    SpawnFailed,
}

impl Wifi {
    pub async fn new(
        wifi: WIFI<'static>,
        timer: impl EspWifiTimerSource + 'static,
        radio_clk: RADIO_CLK<'static>,
        mut rng: Rng,
        spawner: Spawner,
    ) -> Result<Self, Error> {
        let radio = esp_wifi::init(timer, rng.clone(), radio_clk).map_err(|_| Error::WifiInitFailed)?;
        let (controller, interfaces) =
            esp_wifi::wifi::new(RADIO.init(radio), wifi).map_err(|_| Error::WifiInitFailed)?;

        let mut dhcp = DhcpConfig::default();
        dhcp.hostname =
            Some(String::<32>::from_str(CONFIG.device_id).map_err(|_| Error::HostnameTooLong)?);

        let seed = (rng.random() as u64) << 32 | rng.random() as u64;
        let (stack, runner) = embassy_net::new(
            interfaces.sta,
            embassy_net::Config::dhcpv4(dhcp),
            RESOURCES.init(StackResources::new()),
            seed,
        );

        spawner
            .spawn(keep_associated(controller))
            .map_err(|_| Error::SpawnFailed)?;
        spawner
            .spawn(net_task(runner))
            .map_err(|_| Error::SpawnFailed)?;

        Ok(Self { stack })
    }

    /// Wait for a DHCP lease and return the address the backend should
    /// know this door by.
    pub async fn connect(&self) -> Result<Ipv4Address, Error> {
        log::info!("Waiting for a DHCP lease as {}", CONFIG.device_id);
        loop {
            if self.stack.is_link_up() {
                if let Some(config) = self.stack.config_v4() {
                    log::info!("Network up, address {}", config.address);
                    return Ok(config.address.address());
                }
            }
            Timer::after(Duration::from_millis(500)).await;
        }
    }
}

async fn start(controller: &mut WifiController<'static>) -> Result<(), WifiError> {
    let client = Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID.into(),
        password: WIFI_PASSWORD.into(),
        ..Default::default()
    });
    controller.set_configuration(&client)?;
    controller.start_async().await
}

// Reassociates after every drop so the door keeps polling.
#[embassy_executor::task]
async fn keep_associated(mut controller: WifiController<'static>) {
    loop {
        if esp_wifi::wifi::wifi_state() == WifiState::StaConnected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            log::warn!("Lost association with {:?}", WIFI_SSID);
            Timer::after(Duration::from_millis(WIFI_RECONNECT_DELAY_MS)).await;
        }

        if !matches!(controller.is_started(), Ok(true)) {
            if let Err(e) = start(&mut controller).await {
                log::error!("Wi-Fi start failed: {:?}", e);
                Timer::after(Duration::from_millis(WIFI_RECONNECT_DELAY_MS)).await;
                continue;
            }
        }

        let attempt = with_timeout(
            Duration::from_secs(WIFI_CONNECT_TIMEOUT_SECS),
            controller.connect_async(),
        )
        .await;
        match attempt {
            Ok(Ok(())) => log::info!("Associated with {:?}", WIFI_SSID),
            Ok(Err(e)) => {
                log::warn!("Association with {:?} failed: {:?}", WIFI_SSID, e);
                Timer::after(Duration::from_millis(WIFI_RECONNECT_DELAY_MS)).await;
            }
            Err(_) => {
                log::warn!("Association with {:?} timed out", WIFI_SSID);
                Timer::after(Duration::from_millis(WIFI_RECONNECT_DELAY_MS)).await;
            }
        }
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
