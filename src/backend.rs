use embassy_net::Stack;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use embedded_io_async::{Read, Write};
#[cfg(feature = "tls")]
use esp_mbedtls::Tls;
use heapless::String;

use smart_door_core::api::{self, ApiError};
use smart_door_core::api::Poll;
use smart_door_core::command::{AckStatus, DoorState};
use smart_door_core::http::{self, HttpError, Method};

use crate::config::{CONFIG, FIREBASE_AUTH, FIREBASE_HOST};
use crate::constants::*;
#[cfg(feature = "tls")]
use crate::transport::TlsCredentials;
use crate::transport::Transport;

#[derive(Debug)]
pub enum Error {
    Transport,
    Io,
    /// Response did not fit in `HTTP_RESPONSE_MAX`
    ResponseTooLarge,
    #[allow(dead_code)]
    Http(HttpError),
    #[allow(dead_code)]
    Api(ApiError),
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        Error::Http(e)
    }
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Error::Api(e)
    }
}

/// Client for the door API. Opens one connection per call.
pub struct Backend {
    stack: &'static Mutex<NoopRawMutex, Stack<'static>>,
    #[cfg(feature = "tls")]
    tls: &'static Tls<'static>,
    #[cfg(feature = "tls")]
    credentials: TlsCredentials,
    rx_buf: &'static Mutex<NoopRawMutex, [u8; RX_BUFFER_SIZE]>,
    tx_buf: &'static Mutex<NoopRawMutex, [u8; TX_BUFFER_SIZE]>,
    device_id: &'static str,
}

impl Backend {
    pub fn new(
        stack: &'static Mutex<NoopRawMutex, Stack<'static>>,
        #[cfg(feature = "tls")] tls: &'static Tls<'static>,
        #[cfg(feature = "tls")] credentials: TlsCredentials,
        rx_buf: &'static Mutex<NoopRawMutex, [u8; RX_BUFFER_SIZE]>,
        tx_buf: &'static Mutex<NoopRawMutex, [u8; TX_BUFFER_SIZE]>,
    ) -> Self {
        Self {
            stack,
            #[cfg(feature = "tls")]
            tls,
            #[cfg(feature = "tls")]
            credentials,
            rx_buf,
            tx_buf,
            device_id: CONFIG.device_id,
        }
    }

    pub async fn register(&mut self, ip_address: &str) -> Result<(), Error> {
        let body = api::register_body(self.device_id, ip_address)?;
        let mut response = [0u8; HTTP_RESPONSE_MAX];
        self.exchange(Method::Post, api::REGISTER_PATH, Some(body.as_str()), &mut response)
            .await?;
        log::info!("Registered {} at {}", self.device_id, ip_address);
        Ok(())
    }

    /// Fetch the next pending command, if any.
    pub async fn poll(&mut self) -> Result<Poll, Error> {
        let path = api::command_path(self.device_id)?;
        let mut response = [0u8; HTTP_RESPONSE_MAX];
        let body = self
            .exchange(Method::Get, &path, None, &mut response)
            .await?;
        Ok(api::parse_poll(body)?)
    }

    pub async fn acknowledge(&mut self, timestamp: u64, status: AckStatus) -> Result<(), Error> {
        let body = api::ack_body(self.device_id, timestamp, status)?;
        let mut response = [0u8; HTTP_RESPONSE_MAX];
        self.exchange(Method::Post, api::ACK_PATH, Some(body.as_str()), &mut response)
            .await?;
        log::debug!("Acknowledged command as {}", status.as_str());
        Ok(())
    }

    pub async fn report_status(&mut self, state: DoorState, timestamp: u64) -> Result<(), Error> {
        let body = api::status_body(self.device_id, state, timestamp)?;
        let mut response = [0u8; HTTP_RESPONSE_MAX];
        self.exchange(Method::Post, api::STATUS_PATH, Some(body.as_str()), &mut response)
            .await?;
        log::debug!("Reported door {}", state);
        Ok(())
    }

    async fn exchange<'r>(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&str>,
        response: &'r mut [u8],
    ) -> Result<&'r str, Error> {
        let mut request: String<HTTP_REQUEST_MAX> = String::new();
        http::write_request(&mut request, method, FIREBASE_HOST, path, FIREBASE_AUTH, body)?;

        // Acquire locks for shared resources only when needed
        let stack_guard = self.stack.lock().await;
        let mut rx_buf = self.rx_buf.lock().await;
        let mut tx_buf = self.tx_buf.lock().await;

        #[cfg(feature = "tls")]
        let mut session = Transport::new(
            *stack_guard,
            self.tls,
            &self.credentials,
            &mut *rx_buf,
            &mut *tx_buf,
            FIREBASE_HOST,
            CONFIG.firebase_port,
        )
        .await
        .map_err(|e| {
            log::error!("Backend connection failed: {:?}", e);
            Error::Transport
        })?;

        #[cfg(not(feature = "tls"))]
        let mut session = Transport::new(
            *stack_guard,
            &mut *rx_buf,
            &mut *tx_buf,
            FIREBASE_HOST,
            CONFIG.firebase_port,
        )
        .await
        .map_err(|e| {
            log::error!("Backend connection failed: {:?}", e);
            Error::Transport
        })?;

        session
            .write_all(request.as_bytes())
            .await
            .map_err(|_| Error::Io)?;
        session.flush().await.map_err(|_| Error::Io)?;

        // Read until the server closes the connection
        let mut total_read = 0;
        while total_read < response.len() {
            match session.read(&mut response[total_read..]).await {
                Ok(0) => break,
                Ok(n) => total_read += n,
                Err(e) => {
                    // some servers reset instead of closing cleanly
                    if http::find_header_end(&response[..total_read]).is_some() {
                        log::debug!("Read ended with {:?} after {} bytes", e, total_read);
                        break;
                    }
                    return Err(Error::Io);
                }
            }
        }
        if total_read == response.len() {
            // full buffer, the response only fits if the peer is done
            let mut extra = [0u8; 1];
            if !matches!(session.read(&mut extra).await, Ok(0) | Err(_)) {
                log::warn!("{} {} response exceeds {} bytes", method.as_str(), path, response.len());
                return Err(Error::ResponseTooLarge);
            }
        }
        drop(session);

        let response = http::parse_response(&response[..total_read]).map_err(|e| {
            log::warn!("{} {} failed: {:?}", method.as_str(), path, e);
            e
        })?;
        Ok(response.text()?)
    }
}
