//! HTTP server module for the Purretys backend.
//!
//! Exposes the pet engine as a REST API, plus WebSocket and SSE channels for
//! live co-owner updates.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers, ws, sse)                      │
//! │  - Bearer auth, request parsing, JSON errors              │
//! │  - CORS, compression, tracing                             │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/, auth/)                         │
//! │  - PetEngine: versioned pet mutations                     │
//! │  - ConnectionManager: realtime fan-out                    │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (db/)                                   │
//! │  - FullRepository trait, LocalRepository                  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
pub mod ws;

pub use auth::AuthUser;
pub use error::{ApiError, AppError};
pub use router::create_router;
pub use state::AppState;
