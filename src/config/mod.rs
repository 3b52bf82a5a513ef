//! Configuration structures and loading utilities.
//!
//! This module contains all configuration structures used by the client,
//! including environment variable loading and default values.

pub mod devices;
pub mod policy;
pub mod service;
pub mod store;

pub use devices::*;
pub use policy::*;
pub use service::*;
pub use store::*;
