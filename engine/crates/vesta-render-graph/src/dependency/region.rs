use std::collections::HashMap;
use std::collections::hash_map::Entry;

use ash::vk;

use super::barrier::{BufferBarrierDesc, ImageBarrierDesc, StageBarriers};
use super::range::{
    intersect_buffer_ranges, intersect_subresource_ranges, subtract_buffer_ranges, subtract_subresource_ranges,
    union_buffer_ranges, union_subresource_ranges,
};
use super::resource_state::{BufferState, ImageState};

/// 对一个 image 的一次访问
#[derive(Clone, Copy, Debug)]
pub struct ImageAccess {
    pub image: vk::Image,
    pub range: vk::ImageSubresourceRange,
    pub state: ImageState,
    pub queue_family: u32,
}

impl ImageAccess {
    /// 默认覆盖 color aspect 的全部 mip 和 layer
    pub fn new(image: vk::Image, state: ImageState) -> Self {
        Self {
            image,
            range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: vk::REMAINING_MIP_LEVELS,
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            },
            state,
            queue_family: vk::QUEUE_FAMILY_IGNORED,
        }
    }

    #[inline]
    pub fn with_range(mut self, range: vk::ImageSubresourceRange) -> Self {
        self.range = range;
        self
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: vk::ImageAspectFlags) -> Self {
        self.range.aspect_mask = aspect;
        self
    }

    #[inline]
    pub fn with_queue_family(mut self, queue_family: u32) -> Self {
        self.queue_family = queue_family;
        self
    }

    fn union(&mut self, other: &Self) {
        debug_assert_eq!(self.image, other.image, "union of accesses to different images");
        debug_assert_eq!(self.queue_family, other.queue_family, "union of accesses on different queue families");
        self.state.merge(&other.state);
        self.range = union_subresource_ranges(&self.range, &other.range);
    }
}

/// 对一个 buffer 的一次访问
#[derive(Clone, Copy, Debug)]
pub struct BufferAccess {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    /// WHOLE_SIZE 表示到缓冲区末尾
    pub size: vk::DeviceSize,
    pub state: BufferState,
    pub queue_family: u32,
}

impl BufferAccess {
    /// 默认覆盖整个 buffer
    pub fn new(buffer: vk::Buffer, state: BufferState) -> Self {
        Self {
            buffer,
            offset: 0,
            size: vk::WHOLE_SIZE,
            state,
            queue_family: vk::QUEUE_FAMILY_IGNORED,
        }
    }

    #[inline]
    pub fn with_range(mut self, offset: vk::DeviceSize, size: vk::DeviceSize) -> Self {
        self.offset = offset;
        self.size = size;
        self
    }

    #[inline]
    pub fn with_queue_family(mut self, queue_family: u32) -> Self {
        self.queue_family = queue_family;
        self
    }

    fn union(&mut self, other: &Self) {
        debug_assert_eq!(self.buffer, other.buffer, "union of accesses to different buffers");
        debug_assert_eq!(self.queue_family, other.queue_family, "union of accesses on different queue families");
        self.state.merge(&other.state);
        (self.offset, self.size) = union_buffer_ranges((self.offset, self.size), (other.offset, other.size));
    }
}

/// image 或 buffer 的访问
#[derive(Clone, Copy, Debug)]
pub enum ResourceAccess {
    Image(ImageAccess),
    Buffer(BufferAccess),
}

impl From<ImageAccess> for ResourceAccess {
    fn from(access: ImageAccess) -> Self {
        Self::Image(access)
    }
}

impl From<BufferAccess> for ResourceAccess {
    fn from(access: BufferAccess) -> Self {
        Self::Buffer(access)
    }
}

fn insert_image(map: &mut HashMap<vk::Image, ImageAccess>, access: ImageAccess) {
    match map.entry(access.image) {
        Entry::Occupied(mut e) => e.get_mut().union(&access),
        Entry::Vacant(e) => {
            e.insert(access);
        }
    }
}

fn insert_buffer(map: &mut HashMap<vk::Buffer, BufferAccess>, access: BufferAccess) {
    match map.entry(access.buffer) {
        Entry::Occupied(mut e) => e.get_mut().union(&access),
        Entry::Vacant(e) => {
            e.insert(access);
        }
    }
}

/// 一个录制单元内声明的所有资源访问
///
/// 同一资源的多次同类访问会合并：范围取并集，stage 和 access 取并集。
///
/// 一条链上的第一个 region 不会为它 consume 的资源生成 barrier：此时资源之前的内容
/// 视为未定义（layout 为 `UNDEFINED`），由第一个使用者自行处理。
///
/// 之前的 region 写入、且没有被本 region 的写入覆盖的部分记录在 `inherited_*` 中，
/// 同一资源可能有多段，各段互不重叠，也不和本 region 的写入重叠。
#[derive(Clone, Debug, Default)]
pub struct DependencyRegion {
    consumed_images: HashMap<vk::Image, ImageAccess>,
    produced_images: HashMap<vk::Image, ImageAccess>,
    inherited_images: HashMap<vk::Image, Vec<ImageAccess>>,
    consumed_buffers: HashMap<vk::Buffer, BufferAccess>,
    produced_buffers: HashMap<vk::Buffer, BufferAccess>,
    inherited_buffers: HashMap<vk::Buffer, Vec<BufferAccess>>,
}

// new & 声明访问
impl DependencyRegion {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明读取（或需要某个 layout）
    pub fn consume(&mut self, access: impl Into<ResourceAccess>) {
        match access.into() {
            ResourceAccess::Image(access) => insert_image(&mut self.consumed_images, access),
            ResourceAccess::Buffer(access) => insert_buffer(&mut self.consumed_buffers, access),
        }
    }

    /// 声明写入，之后的 region 如果读取这个资源，会在两者之间生成 barrier
    pub fn produce(&mut self, access: impl Into<ResourceAccess>) {
        match access.into() {
            ResourceAccess::Image(access) => insert_image(&mut self.produced_images, access),
            ResourceAccess::Buffer(access) => insert_buffer(&mut self.produced_buffers, access),
        }
    }
}

// getters
impl DependencyRegion {
    #[inline]
    pub fn consumed_image(&self, image: vk::Image) -> Option<&ImageAccess> {
        self.consumed_images.get(&image)
    }

    #[inline]
    pub fn produced_image(&self, image: vk::Image) -> Option<&ImageAccess> {
        self.produced_images.get(&image)
    }

    /// 由之前的 region 转交过来的写入
    #[inline]
    pub fn inherited_images(&self, image: vk::Image) -> &[ImageAccess] {
        self.inherited_images.get(&image).map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn consumed_buffer(&self, buffer: vk::Buffer) -> Option<&BufferAccess> {
        self.consumed_buffers.get(&buffer)
    }

    #[inline]
    pub fn produced_buffer(&self, buffer: vk::Buffer) -> Option<&BufferAccess> {
        self.produced_buffers.get(&buffer)
    }

    #[inline]
    pub fn inherited_buffers(&self, buffer: vk::Buffer) -> &[BufferAccess] {
        self.inherited_buffers.get(&buffer).map_or(&[], Vec::as_slice)
    }

    /// 本 region 自己没有声明任何访问
    pub fn is_empty(&self) -> bool {
        self.consumed_images.is_empty()
            && self.produced_images.is_empty()
            && self.consumed_buffers.is_empty()
            && self.produced_buffers.is_empty()
    }
}

// barrier 生成
impl DependencyRegion {
    /// 所有会转交给下一个 region 的写入：本 region 的写入加上继承来的写入
    fn pending_images(&self) -> impl Iterator<Item = &ImageAccess> {
        self.produced_images.values().chain(self.inherited_images.values().flatten())
    }

    fn pending_buffers(&self) -> impl Iterator<Item = &BufferAccess> {
        self.produced_buffers.values().chain(self.inherited_buffers.values().flatten())
    }

    /// 生成 `from` 之后、`to` 之前需要的 barrier
    ///
    /// - `from` 的写入（包括它继承的写入）和 `to` 的读取范围重叠：生成一个覆盖重叠部分的 barrier
    /// - 重叠部分转交给 `to`，layout 更新为 `to` 读取时的 layout，stage 加上 `to` 的 stage，
    ///   这样下一次 layout 转换会等待 `to` 的读取完成
    /// - 没有重叠的部分保持写入者的状态转交给 `to`，更后面的读取者依然能和最初的写入者同步
    /// - 被 `to` 自己的写入覆盖的部分不再转交
    pub fn gen_barriers(from: &DependencyRegion, to: &mut DependencyRegion) -> StageBarriers {
        let mut barriers = StageBarriers::new();

        let mut forwarded_images = Vec::new();
        for produced in from.pending_images() {
            let mut pieces = Vec::new();
            let overlap = to
                .consumed_images
                .get(&produced.image)
                .and_then(|consumed| intersect_subresource_ranges(&produced.range, &consumed.range).map(|r| (consumed, r)));

            match overlap {
                Some((consumed, range)) => {
                    barriers.image_barriers.push(ImageBarrierDesc {
                        image: produced.image,
                        src_state: produced.state,
                        dst_state: consumed.state,
                        src_queue_family: produced.queue_family,
                        dst_queue_family: consumed.queue_family,
                        range,
                    });
                    pieces.push(ImageAccess {
                        range,
                        state: ImageState {
                            stage: produced.state.stage | consumed.state.stage,
                            access: produced.state.access,
                            layout: consumed.state.layout,
                        },
                        queue_family: consumed.queue_family,
                        ..*produced
                    });
                    pieces.extend(
                        subtract_subresource_ranges(&produced.range, &range).into_iter().map(|r| produced.with_range(r)),
                    );
                }
                None => pieces.push(*produced),
            }

            for piece in pieces {
                match to.produced_images.get(&piece.image) {
                    Some(own) => forwarded_images.extend(
                        subtract_subresource_ranges(&piece.range, &own.range).into_iter().map(|r| piece.with_range(r)),
                    ),
                    None => forwarded_images.push(piece),
                }
            }
        }

        let mut forwarded_buffers = Vec::new();
        for produced in from.pending_buffers() {
            let mut pieces = Vec::new();
            let overlap = to.consumed_buffers.get(&produced.buffer).and_then(|consumed| {
                intersect_buffer_ranges((produced.offset, produced.size), (consumed.offset, consumed.size))
                    .map(|r| (consumed, r))
            });

            match overlap {
                Some((consumed, (offset, size))) => {
                    barriers.buffer_barriers.push(BufferBarrierDesc {
                        buffer: produced.buffer,
                        src_state: produced.state,
                        dst_state: consumed.state,
                        src_queue_family: produced.queue_family,
                        dst_queue_family: consumed.queue_family,
                        offset,
                        size,
                    });
                    pieces.push(BufferAccess {
                        offset,
                        size,
                        state: BufferState {
                            stage: produced.state.stage | consumed.state.stage,
                            access: produced.state.access,
                        },
                        queue_family: consumed.queue_family,
                        ..*produced
                    });
                    pieces.extend(
                        subtract_buffer_ranges((produced.offset, produced.size), (offset, size))
                            .into_iter()
                            .map(|(offset, size)| produced.with_range(offset, size)),
                    );
                }
                None => pieces.push(*produced),
            }

            for piece in pieces {
                match to.produced_buffers.get(&piece.buffer) {
                    Some(own) => forwarded_buffers.extend(
                        subtract_buffer_ranges((piece.offset, piece.size), (own.offset, own.size))
                            .into_iter()
                            .map(|(offset, size)| piece.with_range(offset, size)),
                    ),
                    None => forwarded_buffers.push(piece),
                }
            }
        }

        for access in forwarded_images {
            to.inherited_images.entry(access.image).or_default().push(access);
        }
        for access in forwarded_buffers {
            to.inherited_buffers.entry(access.buffer).or_default().push(access);
        }

        barriers.sort();
        barriers
    }
}
