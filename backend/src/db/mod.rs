//! Storage layer.
//!
//! Services talk to storage only through the repository traits, so the
//! backend can be swapped without touching business logic.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  HTTP handlers / realtime hub               │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  PetEngine / AuthService (services, auth)   │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  Repository traits (repository/)            │
//! └───────────────────┬─────────────────────────┘
//!                     │
//!     ┌───────────────▼──────────────┐
//!     │       LocalRepository        │
//!     │         (in-memory)          │
//!     └──────────────────────────────┘
//! ```

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod checksum;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use checksum::token_digest;
pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
pub use repository::{
    ErrorContext, FullRepository, LedgerRepository, PetRepository, RepositoryError,
    RepositoryResult, SocialRepository, UserRepository,
};
