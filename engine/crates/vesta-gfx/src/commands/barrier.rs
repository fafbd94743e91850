//! `vk::ImageMemoryBarrier2` / `vk::BufferMemoryBarrier2` 的 builder
//!
//! 创建时只需要给出资源，其余字段默认为：不转移 queue family、整个资源、空的 stage / access。

use ash::vk;

/// 一张 color 图像的全部 mip 和 layer
pub const COLOR_ALL_SUBRESOURCES: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: vk::REMAINING_MIP_LEVELS,
    base_array_layer: 0,
    layer_count: vk::REMAINING_ARRAY_LAYERS,
};

/// 两个 queue family 相同时不需要所有权转移
#[inline]
fn ownership_transfer(src: u32, dst: u32) -> (u32, u32) {
    if src == dst { (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED) } else { (src, dst) }
}

#[derive(Clone, Copy, Debug)]
pub struct GfxImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

impl GfxImageBarrier {
    pub fn new(image: vk::Image) -> Self {
        Self {
            inner: vk::ImageMemoryBarrier2 {
                image,
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::UNDEFINED,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                subresource_range: COLOR_ALL_SUBRESOURCES,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'static> {
        &self.inner
    }

    #[inline]
    pub fn layouts(mut self, old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Self {
        self.inner.old_layout = old_layout;
        self.inner.new_layout = new_layout;
        self
    }

    /// 等待的 stage 和需要 make available 的写入
    #[inline]
    pub fn src(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = stage;
        self.inner.src_access_mask = access;
        self
    }

    #[inline]
    pub fn dst(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = stage;
        self.inner.dst_access_mask = access;
        self
    }

    #[inline]
    pub fn queue_families(mut self, src: u32, dst: u32) -> Self {
        (self.inner.src_queue_family_index, self.inner.dst_queue_family_index) = ownership_transfer(src, dst);
        self
    }

    #[inline]
    pub fn range(mut self, range: vk::ImageSubresourceRange) -> Self {
        self.inner.subresource_range = range;
        self
    }

    #[inline]
    pub fn is_layout_transition(&self) -> bool {
        self.inner.old_layout != self.inner.new_layout
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GfxBufferBarrier {
    inner: vk::BufferMemoryBarrier2<'static>,
}

impl GfxBufferBarrier {
    pub fn new(buffer: vk::Buffer) -> Self {
        Self {
            inner: vk::BufferMemoryBarrier2 {
                buffer,
                offset: 0,
                size: vk::WHOLE_SIZE,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::BufferMemoryBarrier2<'static> {
        &self.inner
    }

    #[inline]
    pub fn src(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = stage;
        self.inner.src_access_mask = access;
        self
    }

    #[inline]
    pub fn dst(mut self, stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = stage;
        self.inner.dst_access_mask = access;
        self
    }

    #[inline]
    pub fn queue_families(mut self, src: u32, dst: u32) -> Self {
        (self.inner.src_queue_family_index, self.inner.dst_queue_family_index) = ownership_transfer(src, dst);
        self
    }

    /// `size` 为 `WHOLE_SIZE` 时覆盖到 buffer 末尾
    #[inline]
    pub fn range(mut self, offset: vk::DeviceSize, size: vk::DeviceSize) -> Self {
        self.inner.offset = offset;
        self.inner.size = size;
        self
    }
}
