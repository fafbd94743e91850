//! 命令层面的设备抽象
//!
//! [`GfxDevice`] 只暴露渲染管线在录制阶段真正需要的那一小部分 Vulkan 命令。
//! 录制发生在多个 worker 线程上，因此实现必须是 `Send + Sync` 的。

use std::ffi::CString;

use ash::prelude::VkResult;
use ash::vk;

/// 录制命令所需的设备接口
///
/// 所有方法都对应一个 Vulkan 调用，调用方负责满足 Vulkan 的外部同步要求：
/// 同一个 command pool 以及从中分配的 command buffer 同一时刻只能在一个线程上使用。
pub trait GfxDevice: Send + Sync {
    /// graphics queue family，用于创建 command pool
    fn graphics_queue_family(&self) -> u32;

    fn create_command_pool(&self, queue_family: u32, flags: vk::CommandPoolCreateFlags) -> VkResult<vk::CommandPool>;

    fn destroy_command_pool(&self, pool: vk::CommandPool);

    /// 将 pool 内的所有 command buffer 重置到初始状态，不释放内存
    fn reset_command_pool(&self, pool: vk::CommandPool) -> VkResult<()>;

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>>;

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, usage: vk::CommandBufferUsageFlags) -> VkResult<()>;

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;

    fn cmd_pipeline_barrier2(
        &self,
        cmd: vk::CommandBuffer,
        image_barriers: &[vk::ImageMemoryBarrier2<'_>],
        buffer_barriers: &[vk::BufferMemoryBarrier2<'_>],
    );

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline);

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        sets: &[vk::DescriptorSet],
    );

    fn cmd_clear_color_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    );

    fn cmd_begin_label(&self, cmd: vk::CommandBuffer, name: &str, color: [f32; 4]);

    fn cmd_end_label(&self, cmd: vk::CommandBuffer);

    fn cmd_insert_label(&self, cmd: vk::CommandBuffer, name: &str, color: [f32; 4]);

    fn destroy_pipeline(&self, pipeline: vk::Pipeline, layout: vk::PipelineLayout);

    /// 底层的 ash device，用于录制本接口没有覆盖的命令
    ///
    /// 测试用的 device 返回 `None`
    fn ash_device(&self) -> Option<&ash::Device> {
        None
    }
}

/// 基于 `ash::Device` 的实现
///
/// 不拥有 device 的生命周期，device 由创建者负责销毁
pub struct AshDevice {
    device: ash::Device,
    debug_utils: Option<ash::ext::debug_utils::Device>,
    graphics_queue_family: u32,
}

// new & init
impl AshDevice {
    /// `enable_debug_utils` 为 true 时，instance 必须开启了 `VK_EXT_debug_utils`
    pub fn new(instance: &ash::Instance, device: ash::Device, graphics_queue_family: u32, enable_debug_utils: bool) -> Self {
        let debug_utils = enable_debug_utils.then(|| ash::ext::debug_utils::Device::new(instance, &device));
        Self {
            device,
            debug_utils,
            graphics_queue_family,
        }
    }
}

impl AshDevice {
    fn label_info<'a>(name: &'a CString, color: [f32; 4]) -> vk::DebugUtilsLabelEXT<'a> {
        vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(color)
    }
}

impl GfxDevice for AshDevice {
    #[inline]
    fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    fn create_command_pool(&self, queue_family: u32, flags: vk::CommandPoolCreateFlags) -> VkResult<vk::CommandPool> {
        let info = vk::CommandPoolCreateInfo::default().queue_family_index(queue_family).flags(flags);
        unsafe { self.device.create_command_pool(&info, None) }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) }
    }

    fn reset_command_pool(&self, pool: vk::CommandPool) -> VkResult<()> {
        unsafe { self.device.reset_command_pool(pool, vk::CommandPoolResetFlags::empty()) }
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let info = vk::CommandBufferAllocateInfo::default().command_pool(pool).level(level).command_buffer_count(count);
        unsafe { self.device.allocate_command_buffers(&info) }
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, usage: vk::CommandBufferUsageFlags) -> VkResult<()> {
        unsafe { self.device.begin_command_buffer(cmd, &vk::CommandBufferBeginInfo::default().flags(usage)) }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
    }

    fn cmd_pipeline_barrier2(
        &self,
        cmd: vk::CommandBuffer,
        image_barriers: &[vk::ImageMemoryBarrier2<'_>],
        buffer_barriers: &[vk::BufferMemoryBarrier2<'_>],
    ) {
        let dependency_info = vk::DependencyInfo::default()
            .image_memory_barriers(image_barriers)
            .buffer_memory_barriers(buffer_barriers);
        unsafe { self.device.cmd_pipeline_barrier2(cmd, &dependency_info) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe { self.device.cmd_bind_pipeline(cmd, bind_point, pipeline) }
    }

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        sets: &[vk::DescriptorSet],
    ) {
        unsafe { self.device.cmd_bind_descriptor_sets(cmd, bind_point, layout, first_set, sets, &[]) }
    }

    fn cmd_clear_color_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        unsafe { self.device.cmd_clear_color_image(cmd, image, layout, color, ranges) }
    }

    fn cmd_begin_label(&self, cmd: vk::CommandBuffer, name: &str, color: [f32; 4]) {
        if let Some(debug_utils) = &self.debug_utils {
            let name = CString::new(name).unwrap_or_default();
            unsafe { debug_utils.cmd_begin_debug_utils_label(cmd, &Self::label_info(&name, color)) }
        }
    }

    fn cmd_end_label(&self, cmd: vk::CommandBuffer) {
        if let Some(debug_utils) = &self.debug_utils {
            unsafe { debug_utils.cmd_end_debug_utils_label(cmd) }
        }
    }

    fn cmd_insert_label(&self, cmd: vk::CommandBuffer, name: &str, color: [f32; 4]) {
        if let Some(debug_utils) = &self.debug_utils {
            let name = CString::new(name).unwrap_or_default();
            unsafe { debug_utils.cmd_insert_debug_utils_label(cmd, &Self::label_info(&name, color)) }
        }
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline, layout: vk::PipelineLayout) {
        unsafe {
            self.device.destroy_pipeline(pipeline, None);
            self.device.destroy_pipeline_layout(layout, None);
        }
    }

    #[inline]
    fn ash_device(&self) -> Option<&ash::Device> {
        Some(&self.device)
    }
}
