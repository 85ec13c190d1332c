use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::model::common::{MajorityRule, Percentage};

/// Default configuration file.
pub const CONFIG_FILE: &str = "Tally.toml";
/// Prefix of environment variables overriding the configuration file.
pub const ENV_PREFIX: &str = "TALLY_";

/// Application configuration, derived from `Tally.toml` and `TALLY_*`
/// environment variables.
#[derive(Debug, Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_quorum_threshold")]
    default_quorum_threshold: Percentage,
    #[serde(default)]
    default_majority_rule: MajorityRule,
    #[serde(default = "default_log_config")]
    log_config: PathBuf,
    // secrets
    hmac_secret: String,
}

fn default_quorum_threshold() -> Percentage {
    Percentage::HALF
}

fn default_log_config() -> PathBuf {
    PathBuf::from("log4rs.yaml")
}

impl Config {
    /// Load from the default file and environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }

    /// Quorum threshold for elections without their own, in basis points.
    /// Configured via `DEFAULT_QUORUM_THRESHOLD`.
    pub fn default_quorum_threshold(&self) -> Percentage {
        self.default_quorum_threshold
    }

    /// Majority rule for elections without their own.
    pub fn default_majority_rule(&self) -> MajorityRule {
        self.default_majority_rule
    }

    /// Path of the log4rs configuration file.
    pub fn log_config(&self) -> &Path {
        &self.log_config
    }

    /// Secret key used to sign HMACs: voter pseudonyms and re-identification grants.
    pub fn hmac_secret(&self) -> &[u8] {
        self.hmac_secret.as_bytes()
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                default_quorum_threshold: Percentage::HALF,
                default_majority_rule: MajorityRule::Absolute,
                log_config: default_log_config(),
                hmac_secret: "test secret".to_string(),
            }
        }
    }
}
