//! HTTP front end for the gamekube provisioner
//!
//! Routes:
//! - `GET /ping` liveness check
//! - `POST /server` create a game server from form or JSON attributes

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod server;

pub use config::{ApplyStrategy, Config, LogFormat};
pub use error::ApiError;
pub use server::{router, serve, AppState};
