use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use itertools::Itertools;

use crate::basic::color::LabelColor;
use crate::commands::barrier::{GfxBufferBarrier, GfxImageBarrier};
use crate::commands::command_pool::GfxCommandPool;
use crate::device::GfxDevice;

/// 命令缓冲封装
///
/// 所有命令都经由 [`GfxDevice`] 发出。clone 出来的对象指向同一个 vk::CommandBuffer。
///
/// # 使用示例
/// ```ignore
/// let cmd = GfxCommandBuffer::new(&pool, "my-pass")?;
/// cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "my-pass")?;
/// cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline);
/// // 绘制命令...
/// cmd.end()?;
/// ```
#[derive(Clone)]
pub struct GfxCommandBuffer {
    vk_handle: vk::CommandBuffer,
    device: Arc<dyn GfxDevice>,

    name: String,
}
// new & init
impl GfxCommandBuffer {
    pub fn new(command_pool: &GfxCommandPool, debug_name: &str) -> VkResult<Self> {
        let device = command_pool.device().clone();
        let handles = device.allocate_command_buffers(command_pool.handle(), vk::CommandBufferLevel::PRIMARY, 1)?;
        let vk_handle = handles.first().copied().ok_or(vk::Result::ERROR_UNKNOWN)?;
        Ok(Self {
            vk_handle,
            device,
            name: debug_name.to_string(),
        })
    }
}
// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command
    ///
    /// 自动设置 debug label
    #[inline]
    pub fn begin(&self, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) -> VkResult<()> {
        self.device.begin_command_buffer(self.vk_handle, usage_flag)?;
        self.begin_label(debug_label_name, LabelColor::COLOR_CMD);
        Ok(())
    }

    /// 结束录制 command
    ///
    /// 结束 debug label
    #[inline]
    pub fn end(&self) -> VkResult<()> {
        self.end_label();
        self.device.end_command_buffer(self.vk_handle)
    }
}
// getters
impl GfxCommandBuffer {
    /// getter
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn device(&self) -> &Arc<dyn GfxDevice> {
        &self.device
    }
}
// 状态与数据类型的命令
impl GfxCommandBuffer {
    /// - command type: state
    /// - supported queue types: graphics, compute
    #[inline]
    pub fn cmd_bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        self.device.cmd_bind_pipeline(self.vk_handle, bind_point, pipeline);
    }

    /// - command type: state
    /// - supported queue types: graphics, compute
    #[inline]
    pub fn bind_descriptor_sets(
        &self,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        self.device.cmd_bind_descriptor_sets(self.vk_handle, bind_point, pipeline_layout, first_set, descriptor_sets);
    }

    /// - command type: action
    /// - supported queue types: graphics, compute
    ///
    /// 需要在 render pass 之外进行，image 必须处于 `GENERAL` 或 `TRANSFER_DST_OPTIMAL`
    #[inline]
    pub fn cmd_clear_color_image(
        &self,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        self.device.cmd_clear_color_image(self.vk_handle, image, layout, color, ranges);
    }
}
// 同步命令
impl GfxCommandBuffer {
    /// 一次性提交 image 和 buffer barrier
    ///
    /// - command type: synchronize
    /// - supported queue types: graphics, compute, transfer
    pub fn pipeline_barrier(&self, image_barriers: &[GfxImageBarrier], buffer_barriers: &[GfxBufferBarrier]) {
        if image_barriers.is_empty() && buffer_barriers.is_empty() {
            return;
        }
        let images = image_barriers.iter().map(|b| *b.inner()).collect_vec();
        let buffers = buffer_barriers.iter().map(|b| *b.inner()).collect_vec();
        self.device.cmd_pipeline_barrier2(self.vk_handle, &images, &buffers);
    }

    /// - command type: synchronize
    /// - supported queue types: graphics, compute, transfer
    #[inline]
    pub fn image_memory_barrier(&self, barriers: &[GfxImageBarrier]) {
        self.pipeline_barrier(barriers, &[]);
    }

    /// - command type: synchronize
    /// - supported queue types: graphics, compute, transfer
    #[inline]
    pub fn buffer_memory_barrier(&self, barriers: &[GfxBufferBarrier]) {
        self.pipeline_barrier(&[], barriers);
    }
}
// debug 相关命令
impl GfxCommandBuffer {
    /// - command type: state, action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn begin_label(&self, label_name: &str, label_color: glam::Vec4) {
        self.device.cmd_begin_label(self.vk_handle, label_name, label_color.to_array());
    }

    /// - command type: state, action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn end_label(&self) {
        self.device.cmd_end_label(self.vk_handle);
    }

    /// - command type: action
    /// - supported queue type: graphics, compute
    #[inline]
    pub fn insert_label(&self, label_name: &str, label_color: glam::Vec4) {
        self.device.cmd_insert_label(self.vk_handle, label_name, label_color.to_array());
    }
}

impl std::fmt::Debug for GfxCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GfxCommandBuffer").field("vk_handle", &self.vk_handle).field("name", &self.name).finish()
    }
}
