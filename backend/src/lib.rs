//! # Purretys backend
//!
//! Shared virtual pets: users adopt cats, invite co-owners, care for them,
//! earn currency through tasks and see each other's actions live.
//!
//! ## Architecture
//!
//! - [`api`]: strongly typed identifiers shared by every layer
//! - [`models`]: domain records (users, pets, tasks, ledgers, social) and the
//!   static item and achievement catalogs
//! - [`db`]: repository traits and the in-memory implementation
//! - [`auth`]: password hashing, JWT access/refresh tokens, sessions
//! - [`services`]: the [`services::PetEngine`] with versioned pet mutations,
//!   decay and background maintenance
//! - [`realtime`]: room-based fan-out to WebSocket and SSE clients
//! - [`http`]: axum REST API, WebSocket and SSE endpoints
//! - [`doctor`]: environment smoke test used by `purretys-doctor`
//! - [`config`]: layered settings (defaults, TOML, environment)

// RepositoryError carries context for debugging and is large.
#![allow(clippy::result_large_err)]

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod doctor;
pub mod models;
pub mod realtime;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
