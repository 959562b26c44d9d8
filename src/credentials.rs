use core::ffi::CStr;

use heapless::Vec;
use smart_door_core::settings::ServerTrust;
use static_cell::StaticCell;

use crate::constants::TLS_BUFFER_MAX;
use crate::transport::TlsCredentials;

const HOSTNAME_MAX: usize = 128;

static SERVERNAME: StaticCell<[u8; HOSTNAME_MAX]> = StaticCell::new();
static CA_CHAIN: StaticCell<Vec<u8, TLS_BUFFER_MAX>> = StaticCell::new();

#[derive(Debug)]
pub enum Error {
    BufferOverflow,
    InteriorNul,
}

// Writes `s`, trimmed of newlines, into `buffer` as a NUL-terminated string.
pub fn write_trimmed_c_str<'buf>(s: &str, buffer: &'buf mut [u8]) -> Result<&'buf CStr, Error> {
    let trimmed = s.trim_matches('\n');
    let bytes = trimmed.as_bytes();
    let len = bytes.len();

    if len + 1 > buffer.len() {
        return Err(Error::BufferOverflow);
    }

    buffer[..len].copy_from_slice(bytes);
    buffer[len] = 0;

    CStr::from_bytes_with_nul(&buffer[..=len]).map_err(|_| Error::InteriorNul)
}

// PEM text as the NUL-terminated byte string mbedTLS expects.
pub fn build_trimmed_c_str_vec(s: &str) -> Result<Vec<u8, TLS_BUFFER_MAX>, Error> {
    let trimmed = s.trim_matches('\n');
    if trimmed.as_bytes().contains(&0) {
        return Err(Error::InteriorNul);
    }

    let mut buf: Vec<u8, TLS_BUFFER_MAX> = Vec::new();
    buf.extend_from_slice(trimmed.as_bytes())
        .map_err(|_| Error::BufferOverflow)?;
    buf.push(0).map_err(|_| Error::BufferOverflow)?;

    Ok(buf)
}

/// Build the TLS server name and CA chain once. Must only be called once.
pub fn init(hostname: &str, trust: ServerTrust<'_>) -> Result<TlsCredentials, Error> {
    let servername = write_trimmed_c_str(hostname, SERVERNAME.init([0; HOSTNAME_MAX]))?;

    let ca_chain = match trust {
        ServerTrust::Ca(pem) => {
            let ca: &'static Vec<u8, TLS_BUFFER_MAX> = CA_CHAIN.init(build_trimmed_c_str_vec(pem)?);
            log::info!("CA certificate loaded: {} bytes", ca.len());
            Some(ca.as_slice())
        }
        ServerTrust::Unverified => {
            log::warn!("tls_insecure is set, the backend certificate is not verified");
            None
        }
    };

    Ok(TlsCredentials {
        servername,
        ca_chain,
    })
}
