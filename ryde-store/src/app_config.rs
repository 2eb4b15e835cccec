use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Length of the payment window a hold stays open, 90 seconds unless
    /// overridden.
    #[serde(default = "default_reservation_hold_seconds")]
    pub reservation_hold_seconds: u64,

    /// How long a counter-offer stays open for the host.
    #[serde(default = "default_offer_ttl_seconds")]
    pub offer_ttl_seconds: u64,

    /// Platform cut applied on top of settled fares.
    #[serde(default)]
    pub booking_fee_cents: i64,
}

fn default_reservation_hold_seconds() -> u64 {
    90
}

fn default_offer_ttl_seconds() -> u64 {
    900
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            reservation_hold_seconds: default_reservation_hold_seconds(),
            offer_ttl_seconds: default_offer_ttl_seconds(),
            booking_fee_cents: 0,
        }
    }
}

impl BusinessRules {
    pub fn reservation_hold(&self) -> Duration {
        Duration::from_secs(self.reservation_hold_seconds)
    }

    pub fn offer_ttl(&self) -> Duration {
        Duration::from_secs(self.offer_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            business_rules: BusinessRules::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .set_default("business_rules.reservation_hold_seconds", 90)?
            .set_default("business_rules.offer_ttl_seconds", 900)?
            .set_default("business_rules.booking_fee_cents", 0)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `RYDE__BUSINESS_RULES__OFFER_TTL_SECONDS=300`
            .add_source(config::Environment::with_prefix("RYDE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
