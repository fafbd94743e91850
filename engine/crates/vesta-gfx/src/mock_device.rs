//! 不需要 GPU 的 [`GfxDevice`] 实现
//!
//! 每个 command buffer 录制的命令都会被转换成 [`MockCommand`] 保存下来，
//! 测试可以据此检查录制顺序和 barrier 的内容。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;

use crate::device::GfxDevice;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockImageBarrier {
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
    pub aspect_mask: vk::ImageAspectFlags,
    /// (base_mip_level, level_count)
    pub mip_levels: (u32, u32),
    /// (base_array_layer, layer_count)
    pub array_layers: (u32, u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockBufferBarrier {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MockCommand {
    Begin,
    End,
    Barrier {
        images: Vec<MockImageBarrier>,
        buffers: Vec<MockBufferBarrier>,
    },
    BindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    },
    BindDescriptorSets {
        bind_point: vk::PipelineBindPoint,
        first_set: u32,
        sets: Vec<vk::DescriptorSet>,
    },
    ClearColorImage {
        image: vk::Image,
        layout: vk::ImageLayout,
    },
    BeginLabel(String),
    EndLabel,
    InsertLabel(String),
}

/// 设备对象的计数，用于检查 pool 的复用情况
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MockDeviceStats {
    pub pools_created: usize,
    pub pools_destroyed: usize,
    pub pool_resets: usize,
    pub buffers_allocated: usize,
    pub pipelines_destroyed: usize,
}

#[derive(Default)]
struct MockDeviceState {
    next_handle: u64,
    pool_buffers: HashMap<vk::CommandPool, Vec<vk::CommandBuffer>>,
    commands: HashMap<vk::CommandBuffer, Vec<MockCommand>>,
    recording: HashSet<vk::CommandBuffer>,
    stats: MockDeviceStats,
}

impl MockDeviceState {
    fn next_raw(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn push(&mut self, cmd: vk::CommandBuffer, command: MockCommand) {
        debug_assert!(self.recording.contains(&cmd), "command recorded outside of begin/end: {command:?}");
        self.commands.entry(cmd).or_default().push(command);
    }
}

#[derive(Default)]
pub struct MockDevice {
    state: Mutex<MockDeviceState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockDeviceState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    /// 某个 command buffer 自上次 reset 以来录制的全部命令
    pub fn commands(&self, cmd: vk::CommandBuffer) -> Vec<MockCommand> {
        self.with_state(|state| state.commands.get(&cmd).cloned().unwrap_or_default())
    }

    /// 某个 command buffer 中录制的 barrier 命令
    pub fn barriers(&self, cmd: vk::CommandBuffer) -> Vec<MockCommand> {
        self.commands(cmd).into_iter().filter(|c| matches!(c, MockCommand::Barrier { .. })).collect()
    }

    /// 某个 command buffer 中插入的 label
    pub fn inserted_labels(&self, cmd: vk::CommandBuffer) -> Vec<String> {
        self.commands(cmd)
            .into_iter()
            .filter_map(|c| match c {
                MockCommand::InsertLabel(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn is_recording(&self, cmd: vk::CommandBuffer) -> bool {
        self.with_state(|state| state.recording.contains(&cmd))
    }

    pub fn stats(&self) -> MockDeviceStats {
        self.with_state(|state| state.stats)
    }

    /// 生成一个唯一的假 handle，用于测试中的 image / buffer / pipeline
    pub fn fake_handle<T: Handle>(&self) -> T {
        self.with_state(|state| T::from_raw(state.next_raw()))
    }
}

impl GfxDevice for MockDevice {
    fn graphics_queue_family(&self) -> u32 {
        0
    }

    fn create_command_pool(&self, _queue_family: u32, _flags: vk::CommandPoolCreateFlags) -> VkResult<vk::CommandPool> {
        self.with_state(|state| {
            let pool = vk::CommandPool::from_raw(state.next_raw());
            state.pool_buffers.insert(pool, Vec::new());
            state.stats.pools_created += 1;
            Ok(pool)
        })
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.with_state(|state| {
            if let Some(buffers) = state.pool_buffers.remove(&pool) {
                for cmd in buffers {
                    state.commands.remove(&cmd);
                    state.recording.remove(&cmd);
                }
            }
            state.stats.pools_destroyed += 1;
        })
    }

    fn reset_command_pool(&self, pool: vk::CommandPool) -> VkResult<()> {
        self.with_state(|state| {
            let buffers = state.pool_buffers.get(&pool).cloned().ok_or(vk::Result::ERROR_UNKNOWN)?;
            for cmd in buffers {
                state.commands.remove(&cmd);
                state.recording.remove(&cmd);
            }
            state.stats.pool_resets += 1;
            Ok(())
        })
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        _level: vk::CommandBufferLevel,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        self.with_state(|state| {
            if !state.pool_buffers.contains_key(&pool) {
                return Err(vk::Result::ERROR_UNKNOWN);
            }
            let buffers: Vec<_> = (0..count).map(|_| vk::CommandBuffer::from_raw(state.next_raw())).collect();
            if let Some(pool_buffers) = state.pool_buffers.get_mut(&pool) {
                pool_buffers.extend_from_slice(&buffers);
            }
            state.stats.buffers_allocated += buffers.len();
            Ok(buffers)
        })
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, _usage: vk::CommandBufferUsageFlags) -> VkResult<()> {
        self.with_state(|state| {
            if !state.recording.insert(cmd) {
                return Err(vk::Result::ERROR_UNKNOWN);
            }
            state.commands.insert(cmd, vec![MockCommand::Begin]);
            Ok(())
        })
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.with_state(|state| {
            if !state.recording.contains(&cmd) {
                return Err(vk::Result::ERROR_UNKNOWN);
            }
            state.push(cmd, MockCommand::End);
            state.recording.remove(&cmd);
            Ok(())
        })
    }

    fn cmd_pipeline_barrier2(
        &self,
        cmd: vk::CommandBuffer,
        image_barriers: &[vk::ImageMemoryBarrier2<'_>],
        buffer_barriers: &[vk::BufferMemoryBarrier2<'_>],
    ) {
        let images = image_barriers
            .iter()
            .map(|b| MockImageBarrier {
                image: b.image,
                old_layout: b.old_layout,
                new_layout: b.new_layout,
                src_stage: b.src_stage_mask,
                src_access: b.src_access_mask,
                dst_stage: b.dst_stage_mask,
                dst_access: b.dst_access_mask,
                src_queue_family: b.src_queue_family_index,
                dst_queue_family: b.dst_queue_family_index,
                aspect_mask: b.subresource_range.aspect_mask,
                mip_levels: (b.subresource_range.base_mip_level, b.subresource_range.level_count),
                array_layers: (b.subresource_range.base_array_layer, b.subresource_range.layer_count),
            })
            .collect();
        let buffers = buffer_barriers
            .iter()
            .map(|b| MockBufferBarrier {
                buffer: b.buffer,
                offset: b.offset,
                size: b.size,
                src_stage: b.src_stage_mask,
                src_access: b.src_access_mask,
                dst_stage: b.dst_stage_mask,
                dst_access: b.dst_access_mask,
            })
            .collect();
        self.with_state(|state| state.push(cmd, MockCommand::Barrier { images, buffers }));
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        self.with_state(|state| state.push(cmd, MockCommand::BindPipeline { bind_point, pipeline }));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        _layout: vk::PipelineLayout,
        first_set: u32,
        sets: &[vk::DescriptorSet],
    ) {
        self.with_state(|state| {
            state.push(
                cmd,
                MockCommand::BindDescriptorSets {
                    bind_point,
                    first_set,
                    sets: sets.to_vec(),
                },
            )
        });
    }

    fn cmd_clear_color_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        _color: &vk::ClearColorValue,
        _ranges: &[vk::ImageSubresourceRange],
    ) {
        self.with_state(|state| state.push(cmd, MockCommand::ClearColorImage { image, layout }));
    }

    fn cmd_begin_label(&self, cmd: vk::CommandBuffer, name: &str, _color: [f32; 4]) {
        self.with_state(|state| state.push(cmd, MockCommand::BeginLabel(name.to_string())));
    }

    fn cmd_end_label(&self, cmd: vk::CommandBuffer) {
        self.with_state(|state| state.push(cmd, MockCommand::EndLabel));
    }

    fn cmd_insert_label(&self, cmd: vk::CommandBuffer, name: &str, _color: [f32; 4]) {
        self.with_state(|state| state.push(cmd, MockCommand::InsertLabel(name.to_string())));
    }

    fn destroy_pipeline(&self, _pipeline: vk::Pipeline, _layout: vk::PipelineLayout) {
        self.with_state(|state| state.stats.pipelines_destroyed += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_recorded_commands() {
        let device = MockDevice::new();
        let pool = device.create_command_pool(0, vk::CommandPoolCreateFlags::TRANSIENT).unwrap();
        let cmd = device.allocate_command_buffers(pool, vk::CommandBufferLevel::PRIMARY, 1).unwrap()[0];

        device.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT).unwrap();
        device.cmd_insert_label(cmd, "marker", [0.0; 4]);
        device.end_command_buffer(cmd).unwrap();
        assert_eq!(device.commands(cmd).len(), 3);
        assert_eq!(device.inserted_labels(cmd), vec!["marker".to_string()]);

        device.reset_command_pool(pool).unwrap();
        assert!(device.commands(cmd).is_empty());
        assert_eq!(device.stats().pool_resets, 1);
    }

    #[test]
    fn test_double_begin_is_rejected() {
        let device = MockDevice::new();
        let pool = device.create_command_pool(0, vk::CommandPoolCreateFlags::empty()).unwrap();
        let cmd = device.allocate_command_buffers(pool, vk::CommandBufferLevel::PRIMARY, 1).unwrap()[0];

        device.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::empty()).unwrap();
        assert!(device.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::empty()).is_err());
        assert!(device.is_recording(cmd));
    }
}
