//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates (invalid → keep current)
//!     → HttpServer rebuilds the DispatchInterceptor
//!     → atomic swap behind the tower layer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AgentConfig, ListenerConfig, LogFormat, ObservabilityConfig, TimeoutConfig,
    TraceConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
