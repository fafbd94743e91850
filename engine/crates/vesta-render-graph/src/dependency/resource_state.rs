//! 一次访问的同步状态：pipeline stage + access mask（+ image layout）
//!
//! 录制单元通过 consume / produce 声明这些状态，barrier 由相邻单元的状态差异推导出来。

use ash::vk;

/// 在 const 上下文中合并 flags
macro_rules! flags {
    ($ty:ident: $($flag:ident)|+) => {
        vk::$ty::from_raw(0 $(| vk::$ty::$flag.as_raw())+)
    };
}

/// 会产生数据的 access，出现在 barrier 的 src 一侧时才有意义
const WRITE_ACCESS: vk::AccessFlags2 = flags!(AccessFlags2:
    SHADER_WRITE
    | SHADER_STORAGE_WRITE
    | COLOR_ATTACHMENT_WRITE
    | DEPTH_STENCIL_ATTACHMENT_WRITE
    | TRANSFER_WRITE
    | HOST_WRITE
    | MEMORY_WRITE
    | ACCELERATION_STRUCTURE_WRITE_KHR);

#[inline]
fn writes(access: vk::AccessFlags2) -> bool {
    access.intersects(WRITE_ACCESS)
}

/// 读操作不需要 make available，src access 只保留写入
#[inline]
fn src_access_of(access: vk::AccessFlags2) -> vk::AccessFlags2 {
    access & WRITE_ACCESS
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    pub layout: vk::ImageLayout,
}

impl Default for ImageState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl ImageState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self { stage, access, layout }
    }

    /// 内容无效，作为第一次写入前的状态
    pub const UNDEFINED: Self =
        Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::UNDEFINED);

    pub const GENERAL: Self = Self::new(
        vk::PipelineStageFlags2::ALL_COMMANDS,
        flags!(AccessFlags2: MEMORY_READ | MEMORY_WRITE),
        vk::ImageLayout::GENERAL,
    );

    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// blend 等需要读回 attachment 的情况
    pub const COLOR_ATTACHMENT_READ_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        flags!(AccessFlags2: COLOR_ATTACHMENT_READ | COLOR_ATTACHMENT_WRITE),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    pub const DEPTH_ATTACHMENT_READ_WRITE: Self = Self::new(
        flags!(PipelineStageFlags2: EARLY_FRAGMENT_TESTS | LATE_FRAGMENT_TESTS),
        flags!(AccessFlags2: DEPTH_STENCIL_ATTACHMENT_READ | DEPTH_STENCIL_ATTACHMENT_WRITE),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    );

    pub const SHADER_READ_FRAGMENT: Self = Self::new(
        vk::PipelineStageFlags2::FRAGMENT_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    pub const SHADER_READ_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    pub const STORAGE_WRITE_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::AccessFlags2::SHADER_STORAGE_WRITE,
        vk::ImageLayout::GENERAL,
    );

    pub const STORAGE_WRITE_RAY_TRACING: Self = Self::new(
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        vk::AccessFlags2::SHADER_STORAGE_WRITE,
        vk::ImageLayout::GENERAL,
    );

    pub const TRANSFER_SRC: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_READ,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );

    /// clear / copy / blit 的目标
    pub const TRANSFER_DST: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    /// 交给 presentation engine，之后不再有 GPU 访问
    pub const PRESENT: Self =
        Self::new(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::PRESENT_SRC_KHR);
}

impl ImageState {
    #[inline]
    pub fn is_write(&self) -> bool {
        writes(self.access)
    }

    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        src_access_of(self.access)
    }

    /// 同一个单元内的两次访问：stage 和 access 取并集，layout 必须一致
    #[inline]
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.layout, other.layout, "merging image accesses with different layouts");
        self.stage |= other.stage;
        self.access |= other.access;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
}

impl Default for BufferState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl BufferState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self { stage, access }
    }

    pub const UNDEFINED: Self = Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE);

    pub const VERTEX_BUFFER: Self =
        Self::new(vk::PipelineStageFlags2::VERTEX_INPUT, vk::AccessFlags2::VERTEX_ATTRIBUTE_READ);
    pub const INDEX_BUFFER: Self = Self::new(vk::PipelineStageFlags2::INDEX_INPUT, vk::AccessFlags2::INDEX_READ);
    pub const INDIRECT_BUFFER: Self =
        Self::new(vk::PipelineStageFlags2::DRAW_INDIRECT, vk::AccessFlags2::INDIRECT_COMMAND_READ);

    pub const UNIFORM_VERTEX: Self = Self::new(vk::PipelineStageFlags2::VERTEX_SHADER, vk::AccessFlags2::UNIFORM_READ);
    pub const UNIFORM_FRAGMENT: Self =
        Self::new(vk::PipelineStageFlags2::FRAGMENT_SHADER, vk::AccessFlags2::UNIFORM_READ);

    pub const STORAGE_READ_COMPUTE: Self =
        Self::new(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::SHADER_STORAGE_READ);
    pub const STORAGE_WRITE_COMPUTE: Self =
        Self::new(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::SHADER_STORAGE_WRITE);

    pub const TRANSFER_SRC: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_READ);
    pub const TRANSFER_DST: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE);

    pub const ACCELERATION_STRUCTURE_BUILD_INPUT: Self = Self::new(
        vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
    );
}

impl BufferState {
    #[inline]
    pub fn is_write(&self) -> bool {
        writes(self.access)
    }

    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        src_access_of(self.access)
    }

    #[inline]
    pub fn merge(&mut self, other: &Self) {
        self.stage |= other.stage;
        self.access |= other.access;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_detection() {
        assert!(ImageState::COLOR_ATTACHMENT_WRITE.is_write());
        assert!(ImageState::TRANSFER_DST.is_write());
        assert!(ImageState::GENERAL.is_write());
        assert!(!ImageState::SHADER_READ_FRAGMENT.is_write());
        assert!(!ImageState::PRESENT.is_write());
        assert!(BufferState::STORAGE_WRITE_COMPUTE.is_write());
        assert!(!BufferState::UNIFORM_FRAGMENT.is_write());
    }

    #[test]
    fn test_src_access_keeps_only_writes() {
        assert_eq!(ImageState::COLOR_ATTACHMENT_READ_WRITE.src_access(), vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
        assert_eq!(ImageState::SHADER_READ_FRAGMENT.src_access(), vk::AccessFlags2::NONE);
        assert_eq!(BufferState::INDIRECT_BUFFER.src_access(), vk::AccessFlags2::NONE);
    }

    #[test]
    fn test_merge_unions_flags() {
        let mut state = ImageState::SHADER_READ_FRAGMENT;
        state.merge(&ImageState::SHADER_READ_COMPUTE);
        assert!(state.stage.contains(vk::PipelineStageFlags2::FRAGMENT_SHADER | vk::PipelineStageFlags2::COMPUTE_SHADER));
        assert_eq!(state.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        let mut buffer = BufferState::UNIFORM_VERTEX;
        buffer.merge(&BufferState::STORAGE_READ_COMPUTE);
        assert!(buffer.access.contains(vk::AccessFlags2::UNIFORM_READ | vk::AccessFlags2::SHADER_STORAGE_READ));
    }
}
