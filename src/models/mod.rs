//! Data models and schemas for the authentication client.
//!
//! This module contains all the data structures used throughout the client,
//! including wire envelopes, factor payloads, profile data, and audit types.

pub mod audit;
pub mod envelope;
pub mod factors;
pub mod health;
pub mod user;

pub(crate) mod timefmt;

pub use audit::*;
pub use envelope::*;
pub use factors::*;
pub use health::*;
pub use user::*;
