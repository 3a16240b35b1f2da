#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScanEngineError`)
//! - [`config`]: Engine configuration (`ScannerConfig`, builder)
//! - [`exceptions`]: Allow-list store (`ExceptionStore`, `ExceptionRule`, `FileExceptionsLoader`)
//! - [`workqueue`]: At-most-once concurrent work queue (`WorkQueue`)
//! - [`scanner`]: Main orchestrator (`PackageScanner`, `PackageScannerBuilder`)
//!
//! # Architecture
//!
//! ```text
//! ManifestReader --> PackageManifest --> ExceptionStore (Filtering)
//!                                              |
//!                                        WorkQueue<Package> (Enriching)
//!                                        |   Enricher*  --> 전이 의존성 재제출
//!                                              |
//!                                        Analyzer* (Analyzing)
//!                                        |   AnalyzerEvent --> Reporter*
//!                                              |
//!                                        Reporter*.add_manifest (Reporting)
//! ```

pub mod config;
pub mod error;
pub mod exceptions;
pub mod scanner;
pub mod workqueue;

// --- Public API Re-exports ---

// Scanner (main orchestrator)
pub use scanner::{PackageScanner, PackageScannerBuilder, ScanState};

// Configuration
pub use config::{ScannerConfig, ScannerConfigBuilder};

// Error
pub use error::ScanEngineError;

// Exceptions
pub use exceptions::{
    ExceptionMatch, ExceptionRule, ExceptionStore, ExceptionsLoader, FileExceptionsLoader,
};

// Work queue
pub use workqueue::{QueueHandler, WorkQueue};
