pub mod artifact;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod logging;
pub mod report;
pub mod state;

pub use client::ReportingClient;
pub use error::{ClientError, ReporterError};
pub use events::RunnerEvent;
pub use execution::{HierarchyController, ReporterOptions, SyncBridge};
