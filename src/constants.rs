/// Current firmware version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the heap in DRAM, shared by the Wi-Fi driver and mbedTLS
pub const HEAP_SIZE: usize = 72 * 1024;

/// Size of the TCP socket receive buffer for encrypted data
pub const RX_BUFFER_SIZE: usize = 4096;
/// Size of the TCP socket transmit buffer for encrypted data
pub const TX_BUFFER_SIZE: usize = 4096;

/// Maximum size for TLS processing buffer (for TLS records)
pub const TLS_BUFFER_MAX: usize = 4096;

/// Room for a framed HTTP request (headers + JSON body)
pub const HTTP_REQUEST_MAX: usize = 768;
/// Room for a whole HTTP response from the door API
pub const HTTP_RESPONSE_MAX: usize = 1024;

/// Timeout for a single backend exchange
pub const BACKEND_TIMEOUT_SECS: u64 = 15;

/// Wait between Wi-Fi reconnection attempts
pub const WIFI_RECONNECT_DELAY_MS: u64 = 5000;
/// Give up on a single association attempt after this long
pub const WIFI_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Back-off after a failed poll before trying again
pub const POLL_BACKOFF_SECS: u64 = 10;
