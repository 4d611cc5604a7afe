pub mod policy;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub policy_path: Option<PathBuf>,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_input_size: usize,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let policy_path = std::env::var("POLICY_PATH").ok().map(PathBuf::from);

        let max_input_size = std::env::var("MAX_INPUT_SIZE")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_INPUT_SIZE value".to_string()))?;

        Ok(Settings {
            policy_path,
            limits: LimitsConfig { max_input_size },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_input_size == 0 {
            return Err(Error::Config("MAX_INPUT_SIZE must be non-zero".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings {
            policy_path: None,
            limits: LimitsConfig {
                max_input_size: 10_485_760,
            },
        };

        assert!(settings.validate().is_ok());

        settings.limits.max_input_size = 0;
        assert!(settings.validate().is_err());
    }
}
