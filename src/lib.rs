//! Duplicate file-reference cleanup for Xcode project files
//!
//! `pbxproj` holds the pure text pipeline; `cleanup` wraps it with file I/O,
//! backups and confirmation.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod pbxproj;

pub use error::{CleanupError, Result};
