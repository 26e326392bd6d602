//! Named calls and the call pipeline.

pub mod pipeline;
pub mod registry;

pub use pipeline::{CallFailure, CallPipeline};
pub use registry::{CallHandler, CallRegistry};
