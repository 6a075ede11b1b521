//! Source separation: model lookup and engine adapters.

pub mod backend;
pub mod registry;
pub mod spleeter;

pub use backend::{SeparationRequest, Separator};
pub use registry::{ModelRegistry, MODEL_MARKER};
pub use spleeter::SpleeterSeparator;
