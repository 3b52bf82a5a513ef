//! Business logic and service layer modules.
//!
//! This module contains the core logic of the client, including flow
//! orchestration, device lifecycles, the service wire client, and the
//! session-owning application shell.

pub mod capture;
pub mod fingerprint;
pub mod orchestrator;
pub mod session;
pub mod shell;

pub use capture::*;
pub use fingerprint::*;
pub use orchestrator::*;
pub use session::*;
pub use shell::*;
