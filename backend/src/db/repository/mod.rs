//! Repository trait definitions.
//!
//! Storage is split into focused traits so implementations and test doubles
//! stay small:
//!
//! - [`error`]: error types for repository operations
//! - [`users`]: accounts
//! - [`pets`]: the versioned pet aggregate
//! - [`ledger`]: transactions, metric history and activity logs
//! - [`social`]: invitations, notifications, chat and achievements
//!
//! Services take an `Arc<dyn FullRepository>` when they need everything.

pub mod error;
pub mod ledger;
pub mod pets;
pub mod social;
pub mod users;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use ledger::LedgerRepository;
pub use pets::PetRepository;
pub use social::SocialRepository;
pub use users::UserRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Implemented automatically for any type that implements all four traits.
pub trait FullRepository:
    UserRepository + PetRepository + LedgerRepository + SocialRepository
{
}

impl<T> FullRepository for T where
    T: UserRepository + PetRepository + LedgerRepository + SocialRepository
{
}
