//! Utility functions and helper modules.
//!
//! This module contains validation and encoding helpers used throughout
//! the authentication flows.

pub mod encoding;
pub mod validate;

pub use encoding::*;
pub use validate::*;
