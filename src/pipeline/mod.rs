//! The resource load pipeline and render verification.

mod loader;
mod verify;

pub use loader::{LoadPipeline, PipelineConfig};
pub use verify::{ProbeResult, RenderProbe, VerifyConfig};
