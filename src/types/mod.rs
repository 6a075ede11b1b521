//! Core types for the separation service.
//!
//! This module re-exports all the core data types used throughout the service:
//! - [`Job`]: A submission tracked through the pipeline states
//! - [`JobId`]: The sanitized identifier namespacing a job's artifacts
//! - [`Track`]: One separated stem with its label and URL

mod job;
mod track;

// Re-export all types at the module level
pub use job::{
    split_filename, Job, JobId, JobState, SourceKind, AUDIO_ONLY_EXTENSIONS,
    CANONICAL_EXTENSION, MAX_JOB_ID_LEN, VIDEO_EXTENSIONS,
};
pub use track::{DisplayNames, Track, STANDARD_STEMS};
