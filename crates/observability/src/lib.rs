//! Toolhost Observability - logging set-up shared by the toolhost binaries
//!
//! # Quick Start
//!
//! ```no_run
//! use toolhost_observability::{ObservabilityConfig, init};
//!
//! let config = ObservabilityConfig::new("toolhost").with_log_level("info");
//! init(config)?;
//!
//! // Or build the configuration from environment variables
//! // toolhost_observability::init(ObservabilityConfig::from_env())?;
//!
//! tracing::info!("Service started");
//! # Ok::<(), toolhost_observability::ObservabilityError>(())
//! ```
//!
//! # Environment Variables
//!
//! - `TOOLHOST_SERVICE_NAME` - Service name
//! - `TOOLHOST_LOG` or `RUST_LOG` - Log level filter
//! - `NO_COLOR` - Disable ANSI colors

pub mod config;
pub mod error;
mod log_sink;
pub mod telemetry;

pub use config::{LogSink, ObservabilityConfig};
pub use error::ObservabilityError;
pub use telemetry::init;
