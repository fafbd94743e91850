use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;

use crate::device::GfxDevice;

/// command pool 是和 queue family 绑定的，而不是和 queue 绑定的
///
/// 一个 pool 同一时刻只能在一个线程上使用，并行录制时每个线程各自持有自己的 pool
pub struct GfxCommandPool {
    handle: vk::CommandPool,
    queue_family: u32,
    device: Arc<dyn GfxDevice>,

    debug_name: String,
}
// new & init
impl GfxCommandPool {
    #[inline]
    pub fn new(
        device: Arc<dyn GfxDevice>,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
        debug_name: &str,
    ) -> VkResult<Self> {
        let handle = device.create_command_pool(queue_family, flags)?;
        log::debug!("Create CommandPool: {}", debug_name);
        Ok(Self {
            handle,
            queue_family,
            device,
            debug_name: debug_name.to_string(),
        })
    }
}
// getters
impl GfxCommandPool {
    /// getter
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }

    #[inline]
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    #[inline]
    pub fn device(&self) -> &Arc<dyn GfxDevice> {
        &self.device
    }

    #[inline]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }
}
// tools
impl GfxCommandPool {
    /// 这个调用并不会释放资源，而是将 pool 内的 command buffer 设置到初始状态
    ///
    /// reset 之后，pool 内的 command buffer 又可以重新录制命令
    pub fn reset_all_buffers(&self) -> VkResult<()> {
        self.device.reset_command_pool(self.handle)
    }
}

impl Drop for GfxCommandPool {
    fn drop(&mut self) {
        self.device.destroy_command_pool(self.handle);
        log::debug!("Dropping CommandPool: {}", self.debug_name);
    }
}
