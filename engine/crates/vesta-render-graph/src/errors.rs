//! 错误类型
//!
//! 配置错误（重复声明、stage 循环依赖、viewport 数量超限等）在构建阶段立即返回；
//! 查找类错误（pipeline 不存在）在使用时返回。descriptor 查找失败不算错误，返回 `None`。

use ash::vk;
use thiserror::Error;

use crate::render_stage::RenderStageId;
use crate::resource::names::{DescriptorName, PipelineName};

#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // RenderGraph 配置
    // ========================================================================
    /// 同一个 stage 被插入了两次
    #[error("render stage {0} is already defined")]
    StageAlreadyDefined(RenderStageId),

    /// `before` / `after` 引用的锚点 stage 不存在
    #[error("anchor render stage {0} is not defined")]
    AnchorStageMissing(RenderStageId),

    #[error("render stage {0} is not defined")]
    StageNotFound(RenderStageId),

    /// stage 之间的顺序约束存在环
    #[error("render stage ordering contains a cycle through {0}")]
    StageCycle(RenderStageId),

    // ========================================================================
    // 资源
    // ========================================================================
    #[error("descriptor {0} is declared more than once")]
    DuplicateDescriptor(DescriptorName),

    #[error("descriptor {0} is not declared in the resource config")]
    UndeclaredDescriptor(DescriptorName),

    #[error("pipeline {0} is not defined in any resource layer")]
    PipelineNotFound(PipelineName),

    #[error("failed to create pipeline {name}: {source}")]
    PipelineCreation {
        name: PipelineName,
        #[source]
        source: anyhow::Error,
    },

    /// 父层的 storage 已经被释放
    #[error("parent resource storage has been released")]
    DetachedStorage,

    // ========================================================================
    // RenderPipeline
    // ========================================================================
    #[error("no free viewport slot, at most {max} viewports are supported")]
    ViewportLimitExceeded { max: usize },

    #[error("viewport {0} does not exist")]
    ViewportNotFound(usize),

    #[error("viewport belongs to another render pipeline")]
    ForeignViewport,

    /// viewport handle 比 pipeline 活得更久
    #[error("render pipeline has been destroyed")]
    PipelineDestroyed,

    #[error("render target has {requested} frames but the pipeline was built for {max}")]
    FrameCountExceeded { requested: usize, max: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// plugin 回调返回的错误
    #[error("plugin {plugin} failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("pipeline state lock poisoned")]
    LockPoisoned,

    #[error("vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
