pub mod config;
pub mod error;
pub mod parse;
pub mod types;

pub use config::{
    ConfigSource, MAX_LOG_EXCERPT_LINES, ProbeSpec, ProberConfig, PublicEndpoint, ServiceSpec,
    ValidationResult,
};
pub use error::{ProbeError, Result};
pub use types::*;
