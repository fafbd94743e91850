//! 两个录制单元之间的 barrier 集合

use ash::vk;
use ash::vk::Handle;
use vesta_gfx::commands::barrier::{GfxBufferBarrier, GfxImageBarrier};
use vesta_gfx::commands::command_buffer::GfxCommandBuffer;

use super::resource_state::{BufferState, ImageState};

/// 图像 Barrier 描述
#[derive(Clone, Copy, Debug)]
pub struct ImageBarrierDesc {
    pub image: vk::Image,
    /// 源状态（上一个写入者留下的状态）
    pub src_state: ImageState,
    /// 目标状态
    pub dst_state: ImageState,
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
    /// 只覆盖两次访问重叠的部分
    pub range: vk::ImageSubresourceRange,
}

impl ImageBarrierDesc {
    pub fn to_gfx_barrier(&self) -> GfxImageBarrier {
        GfxImageBarrier::new(self.image)
            .layouts(self.src_state.layout, self.dst_state.layout)
            .src(self.src_state.stage, self.src_state.src_access())
            .dst(self.dst_state.stage, self.dst_state.access)
            .queue_families(self.src_queue_family, self.dst_queue_family)
            .range(self.range)
    }
}

/// 缓冲区 Barrier 描述
#[derive(Clone, Copy, Debug)]
pub struct BufferBarrierDesc {
    pub buffer: vk::Buffer,
    pub src_state: BufferState,
    pub dst_state: BufferState,
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
    pub offset: vk::DeviceSize,
    /// WHOLE_SIZE 表示到缓冲区末尾
    pub size: vk::DeviceSize,
}

impl BufferBarrierDesc {
    pub fn to_gfx_barrier(&self) -> GfxBufferBarrier {
        GfxBufferBarrier::new(self.buffer)
            .range(self.offset, self.size)
            .src(self.src_state.stage, self.src_state.src_access())
            .dst(self.dst_state.stage, self.dst_state.access)
            .queue_families(self.src_queue_family, self.dst_queue_family)
    }
}

/// 相邻两个录制单元之间需要的 Barrier 集合
#[derive(Clone, Debug, Default)]
pub struct StageBarriers {
    /// 图像 barriers
    pub image_barriers: Vec<ImageBarrierDesc>,
    /// 缓冲区 barriers
    pub buffer_barriers: Vec<BufferBarrierDesc>,
}

impl StageBarriers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查是否有 barrier
    pub fn has_barriers(&self) -> bool {
        !self.image_barriers.is_empty() || !self.buffer_barriers.is_empty()
    }

    /// 获取图像 barrier 数量
    pub fn image_barrier_count(&self) -> usize {
        self.image_barriers.len()
    }

    /// 获取缓冲区 barrier 数量
    pub fn buffer_barrier_count(&self) -> usize {
        self.buffer_barriers.len()
    }

    /// 按 handle 排序，保证同样的输入得到同样的录制结果
    pub(crate) fn sort(&mut self) {
        self.image_barriers.sort_by_key(|b| (b.image.as_raw(), b.range.base_mip_level, b.range.base_array_layer));
        self.buffer_barriers.sort_by_key(|b| (b.buffer.as_raw(), b.offset));
    }

    /// 把所有 barrier 合并为一次 `vkCmdPipelineBarrier2`
    pub fn record(&self, cmd: &GfxCommandBuffer) {
        if !self.has_barriers() {
            return;
        }
        let images: Vec<_> = self.image_barriers.iter().map(ImageBarrierDesc::to_gfx_barrier).collect();
        let buffers: Vec<_> = self.buffer_barriers.iter().map(BufferBarrierDesc::to_gfx_barrier).collect();
        cmd.pipeline_barrier(&images, &buffers);
    }

    /// 以可读的形式输出到日志
    pub fn log(&self, label: &str) {
        if !self.has_barriers() {
            log::debug!("{label}: no barriers required");
            return;
        }
        log::debug!(
            "{label}: {} image, {} buffer barriers",
            self.image_barrier_count(),
            self.buffer_barrier_count()
        );
        for barrier in &self.image_barriers {
            log::debug!(
                "  image {:?}: {:?} -> {:?}, stage {} -> {}, access {} -> {}",
                barrier.image,
                barrier.src_state.layout,
                barrier.dst_state.layout,
                format_pipeline_stage(barrier.src_state.stage),
                format_pipeline_stage(barrier.dst_state.stage),
                format_access_flags(barrier.src_state.access),
                format_access_flags(barrier.dst_state.access),
            );
        }
        for barrier in &self.buffer_barriers {
            log::debug!(
                "  buffer {:?} [{}, +{}]: stage {} -> {}, access {} -> {}",
                barrier.buffer,
                barrier.offset,
                barrier.size,
                format_pipeline_stage(barrier.src_state.stage),
                format_pipeline_stage(barrier.dst_state.stage),
                format_access_flags(barrier.src_state.access),
                format_access_flags(barrier.dst_state.access),
            );
        }
    }
}

/// 格式化 PipelineStageFlags2 为可读字符串
pub fn format_pipeline_stage(stage: vk::PipelineStageFlags2) -> String {
    const NAMES: &[(vk::PipelineStageFlags2, &str)] = &[
        (vk::PipelineStageFlags2::TOP_OF_PIPE, "TOP_OF_PIPE"),
        (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, "BOTTOM_OF_PIPE"),
        (vk::PipelineStageFlags2::DRAW_INDIRECT, "DRAW_INDIRECT"),
        (vk::PipelineStageFlags2::VERTEX_INPUT, "VERTEX_INPUT"),
        (vk::PipelineStageFlags2::INDEX_INPUT, "INDEX_INPUT"),
        (vk::PipelineStageFlags2::VERTEX_SHADER, "VERTEX_SHADER"),
        (vk::PipelineStageFlags2::FRAGMENT_SHADER, "FRAGMENT_SHADER"),
        (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, "COLOR_ATTACHMENT_OUTPUT"),
        (vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, "EARLY_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS, "LATE_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::COMPUTE_SHADER, "COMPUTE_SHADER"),
        (vk::PipelineStageFlags2::TRANSFER, "TRANSFER"),
        (vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR, "RAY_TRACING_SHADER"),
        (vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR, "ACCEL_STRUCT_BUILD"),
        (vk::PipelineStageFlags2::ALL_GRAPHICS, "ALL_GRAPHICS"),
        (vk::PipelineStageFlags2::ALL_COMMANDS, "ALL_COMMANDS"),
    ];

    let stages: Vec<&str> = NAMES.iter().filter(|(flag, _)| stage.contains(*flag)).map(|(_, name)| *name).collect();
    if stages.is_empty() { format!("{:?}", stage) } else { stages.join(" | ") }
}

/// 格式化 AccessFlags2 为可读字符串
pub fn format_access_flags(access: vk::AccessFlags2) -> String {
    const NAMES: &[(vk::AccessFlags2, &str)] = &[
        (vk::AccessFlags2::INDIRECT_COMMAND_READ, "INDIRECT_CMD_READ"),
        (vk::AccessFlags2::INDEX_READ, "INDEX_READ"),
        (vk::AccessFlags2::VERTEX_ATTRIBUTE_READ, "VERTEX_ATTR_READ"),
        (vk::AccessFlags2::UNIFORM_READ, "UNIFORM_READ"),
        (vk::AccessFlags2::SHADER_SAMPLED_READ, "SHADER_SAMPLED_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_READ, "STORAGE_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_WRITE, "STORAGE_WRITE"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_READ, "COLOR_ATTACH_READ"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_WRITE, "COLOR_ATTACH_WRITE"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, "DEPTH_ATTACH_READ"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE, "DEPTH_ATTACH_WRITE"),
        (vk::AccessFlags2::TRANSFER_READ, "TRANSFER_READ"),
        (vk::AccessFlags2::TRANSFER_WRITE, "TRANSFER_WRITE"),
        (vk::AccessFlags2::MEMORY_READ, "MEMORY_READ"),
        (vk::AccessFlags2::MEMORY_WRITE, "MEMORY_WRITE"),
    ];

    if access == vk::AccessFlags2::NONE {
        return "NONE".to_string();
    }
    let flags: Vec<&str> = NAMES.iter().filter(|(flag, _)| access.contains(*flag)).map(|(_, name)| *name).collect();
    if flags.is_empty() { format!("{:?}", access) } else { flags.join(" | ") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_queue_family_is_ignored() {
        let desc = ImageBarrierDesc {
            image: vk::Image::from_raw(7),
            src_state: ImageState::COLOR_ATTACHMENT_WRITE,
            dst_state: ImageState::SHADER_READ_FRAGMENT,
            src_queue_family: 0,
            dst_queue_family: 0,
            range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
        };
        let barrier = desc.to_gfx_barrier();
        let inner = barrier.inner();
        assert_eq!(inner.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
        assert_eq!(inner.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(inner.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(inner.src_access_mask, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(format_access_flags(vk::AccessFlags2::NONE), "NONE");
        assert_eq!(
            format_pipeline_stage(vk::PipelineStageFlags2::TRANSFER | vk::PipelineStageFlags2::COMPUTE_SHADER),
            "COMPUTE_SHADER | TRANSFER"
        );
    }
}
