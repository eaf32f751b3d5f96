// Runtime configuration and the fixed NAKALA constants used across the
// crate. Values come from the environment (optionally a `.env` file loaded
// by `main`) and fall back to the public test instance.

use std::time::Duration;

/// Public NAKALA test instance.
pub const DEFAULT_API_URL: &str = "https://apitest.nakala.fr";

/// Shared test key published in the NAKALA documentation.
pub const DEFAULT_API_KEY: &str = "aae99aba-476e-4ff2-2886-0aaf1bfa6fd2";

/// Pause between consecutive requests.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const DCTERMS_URI: &str = "http://purl.org/dc/terms/URI";

pub const DEMO_LICENSE: &str = "CC-BY-4.0";
/// COAR resource type "image".
pub const DEMO_TYPE_URI: &str = "http://purl.org/coar/resource_type/c_c513";
/// COAR resource type "text".
pub const TEXT_TYPE_URI: &str = "http://purl.org/coar/resource_type/c_18cf";
pub const DEMO_GIVENNAME: &str = "Demo";
pub const DEMO_SURNAME: &str = "User";
pub const DEMO_ORCID: &str = "0000-0002-1825-0097";

/// Settings shared by the API client and the narrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    /// Block on Enter between steps instead of sleeping.
    pub interactive: bool,
    pub rate_limit_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            interactive: true,
            rate_limit_delay: RATE_LIMIT_DELAY,
        }
    }
}

impl Config {
    /// Read `NAKALA_API_URL`, `NAKALA_API_KEY` and `NAKALA_INTERACTIVE_MODE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let api_url = lookup("NAKALA_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        let api_key = lookup("NAKALA_API_KEY").unwrap_or(defaults.api_key);
        let interactive = lookup("NAKALA_INTERACTIVE_MODE")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.interactive);

        Self {
            api_url,
            api_key,
            interactive,
            rate_limit_delay: defaults.rate_limit_delay,
        }
    }
}
