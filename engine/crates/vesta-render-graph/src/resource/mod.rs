//! 分层的资源存储
//!
//! [`ResourceConfig`] 是所有 plugin 在构建阶段声明的静态信息；
//! [`ResourceStorage`] 是运行时的分层存储：root → global → scene → viewport。
//! 查找时先查本层，再沿父层向上查。

pub mod config;
pub mod descriptor;
pub mod names;
pub mod pipeline_storage;
pub mod render_pass;
pub mod storage;

pub use config::ResourceConfig;
pub use descriptor::{DescriptorProvider, StaticDescriptorSet};
pub use names::{DescriptorName, PipelineName, RenderPassName};
pub use pipeline_storage::{PipelineFactory, PipelineFactoryContext};
pub use render_pass::{FrameRenderState, RenderPass};
pub use storage::ResourceStorage;
