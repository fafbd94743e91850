//! frames in flight 的资源实例与 viewport 生命周期

pub mod frame_counter;
pub mod id_pool;
pub mod render_pipeline;
mod state;
pub mod viewport;

pub use frame_counter::{FrameCounter, FrameLabel};
pub use render_pipeline::{RenderPipeline, RenderPipelineBuilder, RenderPipelineDesc};
pub use viewport::RenderPipelineViewport;
