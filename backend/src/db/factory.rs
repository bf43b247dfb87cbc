//! Repository factory for dependency injection.

use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
use super::repository::{FullRepository, RepositoryResult};

/// Available storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "memory" | "in-memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

/// Creates repository instances from configuration.
pub struct RepositoryFactory;

impl RepositoryFactory {
    pub fn create(repo_type: RepositoryType) -> Arc<dyn FullRepository> {
        match repo_type {
            RepositoryType::Local => Self::create_local(),
        }
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a repository from the `[repository]` configuration section.
    pub fn from_config(config: &RepositoryConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
        match config.repository_type()? {
            RepositoryType::Local => Ok(Arc::new(LocalRepository::with_history_capacity(
                config.history_capacity,
            ))),
        }
    }
}
