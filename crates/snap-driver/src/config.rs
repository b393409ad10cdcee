//! Driver configuration

use snap_net::ClientConfig;

/// URL that installs an empty page instead of hitting the network
pub const BLANK_URL: &str = "about:blank";

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// HTTP client settings
    pub client: ClientConfig,
    /// URL reported by the empty page shown before the first navigation
    pub blank_url: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            blank_url: BLANK_URL.to_string(),
        }
    }
}
