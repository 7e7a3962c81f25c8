use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 65432;
const DEFAULT_BUS_URL: &str = "redis://127.0.0.1:6379";

/// Per-session idle poll interval (§4.3).
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Direct-Command bridge / physical loop poll interval (§4.4/§4.5).
pub const PHYSICAL_POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Acceptor's accept-with-timeout granularity for re-checking server status (§4.1).
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// TCP keepalive idle time before the first probe (§4.2).
pub const KEEPALIVE_IDLE: Duration = Duration::from_secs(60);
/// TCP keepalive probe interval (§4.2).
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
/// TCP keepalive probe count before the peer is declared dead (§4.2).
pub const KEEPALIVE_RETRIES: u32 = 3;
/// Physical command response read timeout (§4.4).
pub const PHYSICAL_RESPONSE_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Physical response slot TTL (§4.4/§6).
pub const PHYSICAL_RESPONSE_TTL: Duration = Duration::from_secs(60);
/// Disconnect-flag TTL, set by the operator side, never by us; documented
/// here because several places assume it is short (§6).
pub const DISCONNECT_FLAG_MAX_TTL: Duration = Duration::from_secs(10);

/// Runtime configuration, loaded once at startup from the environment. No
/// subcommands or config file — the source system has neither (§6/SPEC_FULL
/// Configuration).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub bus_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let bus_url = std::env::var("BUS_URL").unwrap_or_else(|_| DEFAULT_BUS_URL.to_owned());
        Self { host, port, bus_url }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            bus_url: DEFAULT_BUS_URL.to_owned(),
        }
    }
}
