//! vocal-split: media ingestion and stem separation service.
//!
//! An uploaded media file is normalized to canonical WAV with ffmpeg,
//! probed for its duration, split into per-instrument stems by a pluggable
//! separation engine (spleeter by default) and published over HTTP.
//!
//! # Modules
//!
//! - [`types`]: Core data types (Job, JobId, Track, DisplayNames)
//! - [`config`]: Runtime configuration (ServiceConfig, JobIdentity)
//! - [`error`]: Error types and codes (PipelineError, ErrorCode)
//! - [`cache`]: Filesystem artifact store
//! - [`media`]: ffmpeg transcoder and ffprobe duration prober
//! - [`separation`]: Model registry and separation engines
//! - [`pipeline`]: Job orchestration and result assembly
//! - [`api`]: axum router and handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use vocal_split::{
//!     config::ServiceConfig,
//!     pipeline::{Pipeline, Upload},
//!     types::{DisplayNames, JobId},
//! };
//!
//! let config = ServiceConfig::rooted_at("/srv/vocal-split");
//! let pipeline = Pipeline::from_config(&config, DisplayNames::standard())?;
//!
//! let ingested = pipeline.ingest(Upload::new("song.mp3", std::fs::read("song.mp3")?))?;
//! let separated = pipeline.separate(&ingested.job.job_id, "2stems")?;
//! for track in &separated.tracks.tracks {
//!     println!("{}: {}", track.display_name, track.file_url);
//! }
//! ```

pub mod api;
pub mod browser;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod separation;
pub mod types;
pub mod update;

// Re-export commonly used types at crate root for convenience
pub use config::{JobIdentity, ServiceConfig};
pub use error::{ErrorCode, PipelineError, Result};
pub use pipeline::{Pipeline, Upload};
pub use types::{DisplayNames, Job, JobId, JobState, Track};
