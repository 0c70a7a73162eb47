use serde::Deserialize;
use std::env;

/// Engine configuration. Embedders either construct this directly or load
/// it from layered config files plus `USHER__`-prefixed environment
/// variables.
#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    /// Trailing-edge debounce window for order sync, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Internal confirmation path used when neither an override URL nor a
    /// form-configured URL is present
    #[serde(default = "default_confirmation_path")]
    pub confirmation_path: String,

    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_confirmation_path() -> String {
    "/checkout/confirmed".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            confirmation_path: default_confirmation_path(),
            currency: default_currency(),
        }
    }
}

impl CheckoutConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("USHER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
