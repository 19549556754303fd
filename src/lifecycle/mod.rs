//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! SIGTERM/SIGINT → shutdown_signal → Shutdown::trigger
//!     → server and admin stop accepting
//!     → in-flight requests finish, their traces close
//!     → exit
//! ```

pub mod signals;

pub use signals::{shutdown_signal, Shutdown};
