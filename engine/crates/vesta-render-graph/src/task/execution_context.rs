use std::sync::Arc;

use vesta_gfx::commands::command_buffer::GfxCommandBuffer;

use crate::dependency::{DependencyRegion, ResourceAccess};
use crate::render_stage::RenderStageId;
use crate::resource::render_pass::{FrameRenderState, RenderPass};

/// 录制一个 stage 时所有任务共享的上下文
///
/// 同一 stage 的任务写入同一个 command buffer，并向同一个 [`DependencyRegion`] 声明访问；
/// 录制结束后 region 用来和相邻的 stage 生成 barrier
pub struct DeviceExecutionContext<'a> {
    cmd: &'a GfxCommandBuffer,
    dependencies: &'a mut DependencyRegion,
    stage: RenderStageId,
    render_passes: &'a [Arc<dyn RenderPass>],
    frame_state: &'a FrameRenderState,
}

impl<'a> DeviceExecutionContext<'a> {
    pub fn new(
        cmd: &'a GfxCommandBuffer,
        dependencies: &'a mut DependencyRegion,
        stage: RenderStageId,
        render_passes: &'a [Arc<dyn RenderPass>],
        frame_state: &'a FrameRenderState,
    ) -> Self {
        Self {
            cmd,
            dependencies,
            stage,
            render_passes,
            frame_state,
        }
    }
}

// getters
impl DeviceExecutionContext<'_> {
    #[inline]
    pub fn cmd(&self) -> &GfxCommandBuffer {
        self.cmd
    }

    #[inline]
    pub fn stage(&self) -> RenderStageId {
        self.stage
    }

    /// 挂在当前 stage 上的 render pass，静态的在前，动态的在后
    #[inline]
    pub fn render_passes(&self) -> &[Arc<dyn RenderPass>] {
        self.render_passes
    }

    #[inline]
    pub fn frame_state(&self) -> &FrameRenderState {
        self.frame_state
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_state.frame_index
    }

    #[inline]
    pub fn dependencies(&self) -> &DependencyRegion {
        self.dependencies
    }
}

// 声明访问
impl DeviceExecutionContext<'_> {
    /// 见 [`DependencyRegion::consume`]
    #[inline]
    pub fn consume(&mut self, access: impl Into<ResourceAccess>) {
        self.dependencies.consume(access);
    }

    /// 见 [`DependencyRegion::produce`]
    #[inline]
    pub fn produce(&mut self, access: impl Into<ResourceAccess>) {
        self.dependencies.produce(access);
    }
}
