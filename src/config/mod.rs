//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → context.rs (Context snapshot; payer key from the environment)
//!     → Client (ArcSwap<Context>, replaced wholesale by `configure`)
//! ```
//!
//! # Design Decisions
//! - A snapshot is immutable; child contexts copy and override
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Private keys never come from the config file

pub mod context;
pub mod loader;
pub mod schema;
pub mod validation;

pub use context::{Context, Observers, ReceiveObserver, SendObserver, PAYER_KEY_ENV};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ClientConfig;
pub use validation::{validate_config, ValidationError};
