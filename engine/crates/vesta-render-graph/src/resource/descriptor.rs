use ash::vk;
use vesta_gfx::commands::command_buffer::GfxCommandBuffer;

/// 可以绑定到 pipeline 的 descriptor set
pub trait DescriptorProvider: Send + Sync {
    fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout;

    fn bind_descriptor_set(
        &self,
        cmd: &GfxCommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        set_index: u32,
    );
}

/// 内容在创建后不再变化的 descriptor set
#[derive(Clone, Copy, Debug)]
pub struct StaticDescriptorSet {
    layout: vk::DescriptorSetLayout,
    set: vk::DescriptorSet,
}

impl StaticDescriptorSet {
    pub fn new(layout: vk::DescriptorSetLayout, set: vk::DescriptorSet) -> Self {
        Self { layout, set }
    }

    #[inline]
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.set
    }
}

impl DescriptorProvider for StaticDescriptorSet {
    fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    fn bind_descriptor_set(
        &self,
        cmd: &GfxCommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        set_index: u32,
    ) {
        cmd.bind_descriptor_sets(bind_point, pipeline_layout, set_index, std::slice::from_ref(&self.set));
    }
}
