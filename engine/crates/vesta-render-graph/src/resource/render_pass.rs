use ash::vk;
use vesta_gfx::commands::command_buffer::GfxCommandBuffer;

use crate::resource::names::RenderPassName;

/// 录制某个 viewport 时和帧相关的信息
#[derive(Clone, Copy, Debug)]
pub struct FrameRenderState {
    /// frames in flight 中的序号
    pub frame_index: usize,
    pub viewport_index: usize,
    /// viewport 在 render target 中的区域
    pub area: vk::Rect2D,
    pub target_image: vk::Image,
    pub target_view: vk::ImageView,
    pub target_extent: vk::Extent2D,
}

/// 挂在某个 render stage 上的 render pass
///
/// 静态的 pass 在构建阶段通过 [`RenderGraph::add_pass`](crate::render_graph::RenderGraph::add_pass) 挂到 stage 上；
/// 动态的 pass（比如每个光源一个 shadow pass）在运行时挂到某一层 [`ResourceStorage`](super::ResourceStorage) 上。
pub trait RenderPass: Send + Sync {
    fn name(&self) -> &RenderPassName;

    fn num_subpasses(&self) -> u32 {
        1
    }

    fn begin(&self, cmd: &GfxCommandBuffer, contents: vk::SubpassContents, frame: &FrameRenderState);

    fn end(&self, cmd: &GfxCommandBuffer);
}
