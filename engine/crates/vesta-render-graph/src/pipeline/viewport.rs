use std::sync::{Arc, Mutex, PoisonError, Weak};

use ash::vk;

use crate::errors::{RenderError, RenderResult};
use crate::pipeline::state::PipelineState;
use crate::plugin::scene::SceneRef;
use crate::plugin::target::Camera;

/// viewport 句柄
///
/// 只通过 `Weak` 引用 pipeline：pipeline 先于句柄释放时，所有访问返回
/// [`RenderError::PipelineDestroyed`]。句柄 drop 时释放 viewport 的资源，
/// 最后一个引用某场景的 viewport 释放时，场景资源也一起释放。
pub struct RenderPipelineViewport {
    pipeline: Weak<Mutex<PipelineState>>,
    index: usize,
}

impl RenderPipelineViewport {
    pub(crate) fn new(pipeline: Weak<Mutex<PipelineState>>, index: usize) -> Self {
        Self { pipeline, index }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PipelineState) -> RenderResult<R>) -> RenderResult<R> {
        let shared = self.pipeline.upgrade().ok_or(RenderError::PipelineDestroyed)?;
        let mut state = shared.lock().map_err(|_| RenderError::LockPoisoned)?;
        f(&mut state)
    }

    pub(crate) fn belongs_to(&self, shared: &Arc<Mutex<PipelineState>>) -> bool {
        std::ptr::eq(self.pipeline.as_ptr(), Arc::as_ptr(shared))
    }
}

// getters
impl RenderPipelineViewport {
    /// 在 pipeline 中的槽位，同时存在的 viewport 各不相同
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// pipeline 是否还存在
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.pipeline.strong_count() > 0
    }

    pub fn area(&self) -> RenderResult<vk::Rect2D> {
        self.with_state(|state| Ok(state.viewport_info(self.index)?.area))
    }

    pub fn camera(&self) -> RenderResult<Camera> {
        self.with_state(|state| Ok(state.viewport_info(self.index)?.camera))
    }

    pub fn scene(&self) -> RenderResult<SceneRef> {
        self.with_state(|state| state.viewport_scene(self.index))
    }
}

// setters
impl RenderPipelineViewport {
    /// 只更新相机，不重建资源
    pub fn set_camera(&self, camera: Camera) -> RenderResult<()> {
        self.with_state(|state| state.set_viewport_camera(self.index, camera))
    }

    /// 更新区域，并在每个 frame in flight 中重建 viewport 资源
    pub fn resize(&self, area: vk::Rect2D) -> RenderResult<()> {
        self.with_state(|state| state.resize_viewport(self.index, area))
    }

    /// 切换显示的场景，重建 viewport 资源
    ///
    /// 新场景第一次出现时创建 scene 资源；旧场景没有其他 viewport 使用时被释放
    pub fn set_scene(&self, scene: SceneRef) -> RenderResult<()> {
        self.with_state(|state| state.set_viewport_scene(self.index, scene))
    }
}

impl Drop for RenderPipelineViewport {
    fn drop(&mut self) {
        match self.pipeline.upgrade() {
            Some(shared) => {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                state.free_viewport(self.index);
            }
            None => log::warn!("Viewport {} outlived its render pipeline", self.index),
        }
    }
}

impl std::fmt::Debug for RenderPipelineViewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipelineViewport").field("index", &self.index).field("alive", &self.is_alive()).finish()
    }
}
