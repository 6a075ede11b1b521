//! Cache module for job artifacts.
//!
//! Provides the filesystem store that makes conversion idempotent.

pub mod artifacts;

// Re-export commonly used types
pub use artifacts::ArtifactStore;
