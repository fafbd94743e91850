//! 一次 `draw` 产生的全部录制任务

use std::sync::Arc;

use crate::plugin::scene::SceneRef;
use crate::render_graph::RenderLayout;
use crate::resource::render_pass::FrameRenderState;
use crate::resource::storage::ResourceStorage;
use crate::task::TaskQueue;

/// 一个 viewport 在本帧的录制任务
///
/// global 和 scene scope 的任务只会出现在第一个用到它们的 group 中
pub struct DrawGroup {
    pub(crate) viewport_index: usize,
    pub(crate) frame_state: FrameRenderState,
    pub(crate) layout: Arc<RenderLayout>,
    pub(crate) resources: Arc<ResourceStorage>,
    pub(crate) scene: SceneRef,
    pub(crate) task_queue: TaskQueue<()>,
}

impl DrawGroup {
    #[inline]
    pub fn viewport_index(&self) -> usize {
        self.viewport_index
    }

    #[inline]
    pub fn frame_state(&self) -> &FrameRenderState {
        &self.frame_state
    }

    #[inline]
    pub fn layout(&self) -> &Arc<RenderLayout> {
        &self.layout
    }

    /// viewport scope 的 storage
    #[inline]
    pub fn resources(&self) -> &Arc<ResourceStorage> {
        &self.resources
    }

    #[inline]
    pub fn scene(&self) -> &SceneRef {
        &self.scene
    }

    #[inline]
    pub fn task_queue(&self) -> &TaskQueue<()> {
        &self.task_queue
    }

    #[inline]
    pub fn task_queue_mut(&mut self) -> &mut TaskQueue<()> {
        &mut self.task_queue
    }
}

pub struct Frame {
    pub(crate) frame_index: usize,
    pub(crate) frame_id: u64,
    pub(crate) frame_name: String,
    pub(crate) draw_groups: Vec<DrawGroup>,
}

impl Frame {
    /// frame in flight 序号
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    #[inline]
    pub fn frame_name(&self) -> &str {
        &self.frame_name
    }

    #[inline]
    pub fn draw_groups(&self) -> &[DrawGroup] {
        &self.draw_groups
    }

    #[inline]
    pub fn draw_groups_mut(&mut self) -> &mut [DrawGroup] {
        &mut self.draw_groups
    }
}
