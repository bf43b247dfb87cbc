pub mod catalog;
pub mod counter;
pub mod ledger;
pub mod macros;
pub mod pet;
pub mod social;
pub mod task;
pub mod user;

pub use ledger::*;
pub use pet::*;
pub use social::*;
pub use task::*;
pub use user::*;
