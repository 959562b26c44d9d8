#[cfg(feature = "tls")]
use core::ffi::CStr;
use core::marker::PhantomData;

use embassy_net::{
    dns::{DnsQueryType, Error as DNSError},
    tcp::{ConnectError, TcpSocket},
    Stack,
};
use embassy_time::Duration;
use embedded_io_async::{Error as _, ErrorKind, ErrorType, Read, ReadExactError, Write};
#[cfg(feature = "tls")]
use esp_mbedtls::{asynch::Session, Certificates, Mode, Tls, TlsVersion, X509};

use crate::constants::BACKEND_TIMEOUT_SECS;

const MAX_RETRIES: usize = 3;

#[derive(Debug)]
pub enum Error {
    #[allow(dead_code)]
    DNSQueryFailed(DNSError),
    DNSLookupFailed,
    #[allow(dead_code)]
    SocketConnectionError(ConnectError),
    CACertificateInvalid,
    TLSSessionFailed,
    TLSHandshakeFailed,
}

#[cfg(feature = "tls")]
/// Server name and trust anchor, both NUL-terminated for mbedTLS.
/// Built once at startup.
pub struct TlsCredentials {
    pub servername: &'static CStr,
    /// `None` only when verification was explicitly turned off
    pub ca_chain: Option<&'static [u8]>,
}

/// Wrap Transport (plain TCP or a TLS session)
pub struct Transport<'a, S>
where
    S: Read + Write + 'a,
{
    pub session: S,
    _marker: PhantomData<&'a ()>,
}

async fn open_socket<'a>(
    stack: Stack<'static>,
    rx_buffer: &'a mut [u8],
    tx_buffer: &'a mut [u8],
    hostname: &str,
    port: u16,
) -> Result<TcpSocket<'a>, Error> {
    let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(BACKEND_TIMEOUT_SECS)));

    let addr = stack
        .dns_query(hostname, DnsQueryType::A)
        .await
        .map_err(Error::DNSQueryFailed)?
        .first()
        .copied()
        .ok_or(Error::DNSLookupFailed)?;

    log::debug!("Connecting TCP socket to {}:{}", hostname, port);
    socket
        .connect((addr, port))
        .await
        .map_err(Error::SocketConnectionError)?;

    Ok(socket)
}

#[cfg(feature = "tls")]
impl<'a> Transport<'a, Session<'a, TcpSocket<'a>>> {
    pub async fn new(
        stack: Stack<'static>,
        tls: &'a Tls<'static>,
        credentials: &TlsCredentials,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        hostname: &str,
        port: u16,
    ) -> Result<Self, Error> {
        let socket = open_socket(stack, rx_buffer, tx_buffer, hostname, port).await?;

        let ca_chain = match credentials.ca_chain {
            Some(ca) => Some(X509::pem(ca).map_err(|e| {
                log::error!("CA certificate rejected by mbedTLS: {:?}", e);
                Error::CACertificateInvalid
            })?),
            None => None,
        };
        let certificates = Certificates {
            ca_chain,
            ..Default::default()
        };

        let mut session = Session::new(
            socket,
            Mode::Client {
                servername: credentials.servername,
            },
            TlsVersion::Tls1_2,
            certificates,
            tls.reference(),
        )
        .map_err(|e| {
            log::error!("TLS session setup failed: {:?}", e);
            Error::TLSSessionFailed
        })?;

        session.connect().await.map_err(|e| {
            log::error!("TLS handshake with {} failed: {:?}", hostname, e);
            Error::TLSHandshakeFailed
        })?;
        log::debug!("TLS handshake complete");

        Ok(Self {
            session,
            _marker: PhantomData,
        })
    }
}

#[cfg(not(feature = "tls"))]
impl<'a> Transport<'a, TcpSocket<'a>> {
    pub async fn new(
        stack: Stack<'static>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        hostname: &str,
        port: u16,
    ) -> Result<Self, Error> {
        let session = open_socket(stack, rx_buffer, tx_buffer, hostname, port).await?;
        Ok(Self {
            session,
            _marker: PhantomData,
        })
    }
}

// The peer is gone, retrying cannot help.
fn is_fatal(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
    )
}

impl<'a, S> ErrorType for Transport<'a, S>
where
    S: ErrorType + Read + Write + 'a,
{
    type Error = S::Error;
}

impl<'a, S> Read for Transport<'a, S>
where
    S: ErrorType + Read + Write + 'a,
{
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, S::Error> {
        let mut attempt = 0;
        loop {
            match self.session.read(buf).await {
                Ok(n) => return Ok(n),
                Err(e) => {
                    attempt += 1;
                    if is_fatal(e.kind()) || attempt >= MAX_RETRIES {
                        return Err(e);
                    }
                    log::warn!("read attempt {} failed: {:?}", attempt, e);
                }
            }
        }
    }

    async fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<(), ReadExactError<S::Error>> {
        while !buf.is_empty() {
            match self.read(buf).await {
                Ok(0) => return Err(ReadExactError::UnexpectedEof),
                Ok(n) => buf = &mut buf[n..],
                Err(e) => return Err(ReadExactError::Other(e)),
            }
        }
        Ok(())
    }
}

impl<'a, S> Write for Transport<'a, S>
where
    S: ErrorType + Read + Write + 'a,
{
    async fn write(&mut self, buf: &[u8]) -> Result<usize, S::Error> {
        let mut attempt = 0;
        loop {
            match self.session.write(buf).await {
                Ok(n) => return Ok(n),
                Err(e) => {
                    attempt += 1;
                    if is_fatal(e.kind()) || attempt >= MAX_RETRIES {
                        return Err(e);
                    }
                    log::warn!("write attempt {} failed: {:?}", attempt, e);
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<(), S::Error> {
        let mut attempt = 0;
        loop {
            match self.session.flush().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if is_fatal(e.kind()) || attempt >= MAX_RETRIES {
                        return Err(e);
                    }
                    log::warn!("flush attempt {} failed: {:?}", attempt, e);
                }
            }
        }
    }
}
