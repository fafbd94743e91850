//! 半开区间 `[start, end)` 的求交
//!
//! image 的 mip / layer 范围和 buffer 的字节范围都归结为这里的区间运算。

use ash::vk;

/// 两个区间求交后的三段结果
///
/// `before` 和 `after` 是并集中位于重叠部分前后的片段，两区间不相交时，中间的空隙不属于任何一段。
/// 空片段一律为 `None`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeIntersection<T> {
    pub before: Option<(T, T)>,
    pub overlap: Option<(T, T)>,
    pub after: Option<(T, T)>,
}

fn non_empty<T: Ord>(start: T, end: T) -> Option<(T, T)> {
    (start < end).then_some((start, end))
}

/// 对 `[a_start, a_end)` 和 `[b_start, b_end)` 求交，常数时间
pub fn intersect_ranges<T: Ord + Copy>(a_start: T, a_end: T, b_start: T, b_end: T) -> RangeIntersection<T> {
    let lo = a_start.min(b_start);
    let hi = a_end.max(b_end);
    let overlap_start = a_start.max(b_start);
    let overlap_end = a_end.min(b_end);

    RangeIntersection {
        before: non_empty(lo, overlap_start.min(overlap_end)),
        overlap: non_empty(overlap_start, overlap_end),
        after: non_empty(overlap_start.max(overlap_end), hi),
    }
}

/// `[a_start, a_end)` 中不属于 `[b_start, b_end)` 的片段，最多两段
pub fn subtract_ranges<T: Ord + Copy>(a_start: T, a_end: T, b_start: T, b_end: T) -> impl Iterator<Item = (T, T)> {
    let r = intersect_ranges(a_start, a_end, b_start, b_end);
    [r.before, r.after].into_iter().flatten().filter(move |&(start, end)| a_start <= start && end <= a_end)
}

// REMAINING_MIP_LEVELS 和 REMAINING_ARRAY_LAYERS 都是 !0，统一映射为无穷远
const UNBOUNDED: u64 = u64::MAX;

#[inline]
fn span_end(base: u32, count: u32) -> u64 {
    if count == vk::REMAINING_MIP_LEVELS { UNBOUNDED } else { u64::from(base) + u64::from(count) }
}

#[inline]
fn span_count(start: u64, end: u64) -> u32 {
    if end == UNBOUNDED { vk::REMAINING_MIP_LEVELS } else { (end - start) as u32 }
}

/// 两个 subresource range 的交集，aspect 取交集，mip 和 layer 各自求交
pub fn intersect_subresource_ranges(
    a: &vk::ImageSubresourceRange,
    b: &vk::ImageSubresourceRange,
) -> Option<vk::ImageSubresourceRange> {
    let aspect_mask = a.aspect_mask & b.aspect_mask;
    if aspect_mask.is_empty() {
        return None;
    }

    let (mip_start, mip_end) = intersect_ranges(
        u64::from(a.base_mip_level),
        span_end(a.base_mip_level, a.level_count),
        u64::from(b.base_mip_level),
        span_end(b.base_mip_level, b.level_count),
    )
    .overlap?;
    let (layer_start, layer_end) = intersect_ranges(
        u64::from(a.base_array_layer),
        span_end(a.base_array_layer, a.layer_count),
        u64::from(b.base_array_layer),
        span_end(b.base_array_layer, b.layer_count),
    )
    .overlap?;

    Some(vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: mip_start as u32,
        level_count: span_count(mip_start, mip_end),
        base_array_layer: layer_start as u32,
        layer_count: span_count(layer_start, layer_end),
    })
}

/// `a` 中不属于 `b` 的部分，拆成互不重叠的若干个 range
///
/// 先切掉 `b` 没有的 aspect，再按 mip 切，最后在重叠的 mip 内按 layer 切，最多五段。
pub fn subtract_subresource_ranges(
    a: &vk::ImageSubresourceRange,
    b: &vk::ImageSubresourceRange,
) -> Vec<vk::ImageSubresourceRange> {
    let mut pieces = Vec::new();

    let only_a = a.aspect_mask & !b.aspect_mask;
    if !only_a.is_empty() {
        pieces.push(vk::ImageSubresourceRange { aspect_mask: only_a, ..*a });
    }
    let common = a.aspect_mask & b.aspect_mask;
    if common.is_empty() {
        return pieces;
    }

    let a_mips = (u64::from(a.base_mip_level), span_end(a.base_mip_level, a.level_count));
    let b_mips = (u64::from(b.base_mip_level), span_end(b.base_mip_level, b.level_count));
    let a_layers = (u64::from(a.base_array_layer), span_end(a.base_array_layer, a.layer_count));
    let b_layers = (u64::from(b.base_array_layer), span_end(b.base_array_layer, b.layer_count));

    let piece = |(mip_start, mip_end): (u64, u64), (layer_start, layer_end): (u64, u64)| vk::ImageSubresourceRange {
        aspect_mask: common,
        base_mip_level: mip_start as u32,
        level_count: span_count(mip_start, mip_end),
        base_array_layer: layer_start as u32,
        layer_count: span_count(layer_start, layer_end),
    };

    pieces.extend(subtract_ranges(a_mips.0, a_mips.1, b_mips.0, b_mips.1).map(|mips| piece(mips, a_layers)));
    if let Some(mips) = intersect_ranges(a_mips.0, a_mips.1, b_mips.0, b_mips.1).overlap {
        pieces.extend(subtract_ranges(a_layers.0, a_layers.1, b_layers.0, b_layers.1).map(|layers| piece(mips, layers)));
    }
    pieces
}

/// 包含两个 subresource range 的最小范围
pub fn union_subresource_ranges(a: &vk::ImageSubresourceRange, b: &vk::ImageSubresourceRange) -> vk::ImageSubresourceRange {
    let mip_start = a.base_mip_level.min(b.base_mip_level);
    let mip_end = span_end(a.base_mip_level, a.level_count).max(span_end(b.base_mip_level, b.level_count));
    let layer_start = a.base_array_layer.min(b.base_array_layer);
    let layer_end = span_end(a.base_array_layer, a.layer_count).max(span_end(b.base_array_layer, b.layer_count));

    vk::ImageSubresourceRange {
        aspect_mask: a.aspect_mask | b.aspect_mask,
        base_mip_level: mip_start,
        level_count: span_count(u64::from(mip_start), mip_end),
        base_array_layer: layer_start,
        layer_count: span_count(u64::from(layer_start), layer_end),
    }
}

#[inline]
fn buffer_end(offset: vk::DeviceSize, size: vk::DeviceSize) -> u64 {
    if size == vk::WHOLE_SIZE { UNBOUNDED } else { offset.saturating_add(size) }
}

#[inline]
fn buffer_size(offset: vk::DeviceSize, end: u64) -> vk::DeviceSize {
    if end == UNBOUNDED { vk::WHOLE_SIZE } else { end - offset }
}

/// buffer 字节范围 `(offset, size)` 的交集，`WHOLE_SIZE` 表示到 buffer 末尾
pub fn intersect_buffer_ranges(
    a: (vk::DeviceSize, vk::DeviceSize),
    b: (vk::DeviceSize, vk::DeviceSize),
) -> Option<(vk::DeviceSize, vk::DeviceSize)> {
    let (start, end) = intersect_ranges(a.0, buffer_end(a.0, a.1), b.0, buffer_end(b.0, b.1)).overlap?;
    Some((start, buffer_size(start, end)))
}

/// `a` 中不属于 `b` 的字节范围，最多两段
pub fn subtract_buffer_ranges(
    a: (vk::DeviceSize, vk::DeviceSize),
    b: (vk::DeviceSize, vk::DeviceSize),
) -> Vec<(vk::DeviceSize, vk::DeviceSize)> {
    subtract_ranges(a.0, buffer_end(a.0, a.1), b.0, buffer_end(b.0, b.1))
        .map(|(start, end)| (start, buffer_size(start, end)))
        .collect()
}

pub fn union_buffer_ranges(
    a: (vk::DeviceSize, vk::DeviceSize),
    b: (vk::DeviceSize, vk::DeviceSize),
) -> (vk::DeviceSize, vk::DeviceSize) {
    let start = a.0.min(b.0);
    let end = buffer_end(a.0, a.1).max(buffer_end(b.0, b.1));
    (start, buffer_size(start, end))
}
