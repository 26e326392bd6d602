//! Hook system: pipe keys, hook handlers, and the per-call hook pipes.

pub mod definitions;
pub mod registry;

pub use definitions::{HookStage, Payload, PipeKey, PipelineStage};
pub use registry::{HookHandler, HookPipe, HookRegistry, PipeFailure};
