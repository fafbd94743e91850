use std::sync::Arc;

use ash::vk;

use crate::commands::command_buffer::GfxCommandBuffer;
use crate::device::GfxDevice;

/// 已经创建好的 pipeline 及其 layout
///
/// 通过 [`GfxPipeline::new`] 创建的对象拥有 handle，drop 时销毁；
/// 通过 [`GfxPipeline::from_raw`] 创建的对象只是借用外部的 handle
pub struct GfxPipeline {
    handle: vk::Pipeline,
    layout: vk::PipelineLayout,
    bind_point: vk::PipelineBindPoint,
    owner: Option<Arc<dyn GfxDevice>>,

    name: String,
}
// new & init
impl GfxPipeline {
    pub fn new(
        device: Arc<dyn GfxDevice>,
        handle: vk::Pipeline,
        layout: vk::PipelineLayout,
        bind_point: vk::PipelineBindPoint,
        name: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            layout,
            bind_point,
            owner: Some(device),
            name: name.into(),
        }
    }

    pub fn from_raw(
        handle: vk::Pipeline,
        layout: vk::PipelineLayout,
        bind_point: vk::PipelineBindPoint,
        name: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            layout,
            bind_point,
            owner: None,
            name: name.into(),
        }
    }
}
// getters
impl GfxPipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.handle
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        self.bind_point
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
// tools
impl GfxPipeline {
    #[inline]
    pub fn bind(&self, cmd: &GfxCommandBuffer) {
        cmd.cmd_bind_pipeline(self.bind_point, self.handle);
    }
}

impl std::fmt::Debug for GfxPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GfxPipeline")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .field("bind_point", &self.bind_point)
            .finish()
    }
}

impl Drop for GfxPipeline {
    fn drop(&mut self) {
        if let Some(device) = self.owner.take() {
            device.destroy_pipeline(self.handle, self.layout);
            log::debug!("Dropping Pipeline: {}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_device::MockDevice;

    #[test]
    fn test_only_owned_pipeline_is_destroyed() {
        let device = Arc::new(MockDevice::new());
        let owned = GfxPipeline::new(
            device.clone(),
            device.fake_handle(),
            device.fake_handle(),
            vk::PipelineBindPoint::GRAPHICS,
            "owned",
        );
        let borrowed =
            GfxPipeline::from_raw(device.fake_handle(), device.fake_handle(), vk::PipelineBindPoint::COMPUTE, "raw");
        drop(owned);
        drop(borrowed);
        assert_eq!(device.stats().pipelines_destroyed, 1);
    }
}
