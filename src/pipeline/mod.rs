//! Job pipeline: orchestration, result assembly and job records.
//!
//! The pipeline module drives a submitted file through its stages:
//! 1. Admission (format dispatch and identifier sanitizing)
//! 2. Conversion to canonical audio, or a cache hit
//! 3. Model check, duration probe and separation
//! 4. Assembly of tracks with public URLs

pub mod assembler;
pub mod ledger;
pub mod orchestrator;

pub use assembler::{AssembledTracks, ResultAssembler, FILES_ROUTE};
pub use ledger::{JobLedger, LedgerSummary, DEFAULT_LEDGER_CAPACITY};
pub use orchestrator::{IngestOutcome, Pipeline, SeparationOutcome, Upload};
