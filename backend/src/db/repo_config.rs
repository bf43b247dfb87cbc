//! `[repository]` section of the service configuration file.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::factory::RepositoryType;
use super::repositories::local::DEFAULT_HISTORY_CAPACITY;
use super::repository::RepositoryError;

/// Repository settings as read from TOML.
///
/// ```toml
/// [repository]
/// type = "local"
/// history_capacity = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
    /// Metric snapshots kept per pet.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_repo_type() -> String {
    "local".to_string()
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl RepositoryConfig {
    pub fn repository_type(&self) -> Result<RepositoryType, RepositoryError> {
        RepositoryType::from_str(&self.repo_type).map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_section() {
        let cfg: RepositoryConfig = toml::from_str("type = \"LOCAL\"\nhistory_capacity = 10").unwrap();
        assert_eq!(cfg.repository_type().unwrap(), RepositoryType::Local);
        assert_eq!(cfg.history_capacity, 10);
    }

    #[test]
    fn test_defaults() {
        let cfg: RepositoryConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, RepositoryConfig::default());
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let cfg = RepositoryConfig {
            repo_type: "mongo".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.repository_type(),
            Err(RepositoryError::ConfigurationError { .. })
        ));
    }
}
