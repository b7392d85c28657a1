//! Vote and nomination engine for the chapel membership backend.
//!
//! The request layer authenticates callers and routes commands; this crate
//! owns the vote categories themselves: creation, race-free ballot
//! casting, tallying, and one-time result publication, all enforced
//! through the store's conditional updates.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod notify;

pub use config::{Config, WindowStartPolicy};
pub use engine::BallotEngine;
pub use error::{Error, Result};
pub use model::auth::{Identity, Role};
