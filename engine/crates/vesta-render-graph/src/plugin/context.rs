use std::ops::Deref;
use std::sync::Arc;

use vesta_gfx::device::GfxDevice;

use crate::plugin::scene::{AssetManager, SceneRef};
use crate::plugin::target::{Camera, RenderTarget, RenderTargetFrame, ViewportInfo};
use crate::resource::storage::ResourceStorage;

// ============================================================================
// 创建资源时使用的 context
// ============================================================================

/// 创建 global 资源时可用的信息
///
/// 每个 frame in flight 各创建一份资源，`frame_index` 表示当前创建的是哪一份
pub struct PluginBuildContext<'a> {
    pub(crate) device: &'a Arc<dyn GfxDevice>,
    pub(crate) num_frames: usize,
    pub(crate) num_viewports: usize,
    pub(crate) frame_index: usize,
    pub(crate) render_target: &'a Arc<RenderTarget>,
    pub(crate) asset_manager: Option<&'a Arc<dyn AssetManager>>,
}

impl PluginBuildContext<'_> {
    #[inline]
    pub fn device(&self) -> &Arc<dyn GfxDevice> {
        self.device
    }

    /// frames in flight 的数量
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// 最多同时存在的 viewport 数量
    #[inline]
    pub fn num_viewports(&self) -> usize {
        self.num_viewports
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    #[inline]
    pub fn render_target(&self) -> &Arc<RenderTarget> {
        self.render_target
    }

    #[inline]
    pub fn asset_manager(&self) -> Option<&Arc<dyn AssetManager>> {
        self.asset_manager
    }
}

/// 创建 scene 资源时可用的信息
pub struct SceneBuildContext<'a> {
    pub(crate) base: PluginBuildContext<'a>,
    pub(crate) scene: &'a SceneRef,
}

impl SceneBuildContext<'_> {
    #[inline]
    pub fn scene(&self) -> &SceneRef {
        self.scene
    }
}

impl<'a> Deref for SceneBuildContext<'a> {
    type Target = PluginBuildContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// 创建 viewport 资源时可用的信息
pub struct ViewportBuildContext<'a> {
    pub(crate) base: SceneBuildContext<'a>,
    pub(crate) viewport: &'a ViewportInfo,
}

impl ViewportBuildContext<'_> {
    #[inline]
    pub fn viewport(&self) -> &ViewportInfo {
        self.viewport
    }
}

impl<'a> Deref for ViewportBuildContext<'a> {
    type Target = SceneBuildContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

// ============================================================================
// 每帧更新和录制时使用的 context
// ============================================================================
//
// 这些 context 会被 move 进任务里，在录制线程上使用，因此只持有 Arc

/// global scope 的每帧信息
#[derive(Clone)]
pub struct GlobalUpdateContext {
    pub(crate) frame_index: usize,
    pub(crate) frame_id: u64,
    /// 当前 scope 的 storage，查找时会沿父层回退
    pub(crate) resources: Arc<ResourceStorage>,
    pub(crate) render_target: Arc<RenderTarget>,
}

impl GlobalUpdateContext {
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    #[inline]
    pub fn resources(&self) -> &Arc<ResourceStorage> {
        &self.resources
    }

    #[inline]
    pub fn render_target(&self) -> &Arc<RenderTarget> {
        &self.render_target
    }

    /// 本帧写入的 render target 图像
    #[inline]
    pub fn target_frame(&self) -> Option<&RenderTargetFrame> {
        self.render_target.frame(self.frame_index)
    }
}

/// scene scope 的每帧信息
#[derive(Clone)]
pub struct SceneUpdateContext {
    pub(crate) base: GlobalUpdateContext,
    pub(crate) scene: SceneRef,
}

impl SceneUpdateContext {
    #[inline]
    pub fn scene(&self) -> &SceneRef {
        &self.scene
    }
}

impl Deref for SceneUpdateContext {
    type Target = GlobalUpdateContext;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// viewport scope 的每帧信息
#[derive(Clone)]
pub struct ViewportDrawContext {
    pub(crate) base: SceneUpdateContext,
    pub(crate) viewport: ViewportInfo,
}

impl ViewportDrawContext {
    #[inline]
    pub fn viewport(&self) -> &ViewportInfo {
        &self.viewport
    }

    #[inline]
    pub fn viewport_index(&self) -> usize {
        self.viewport.index
    }

    #[inline]
    pub fn area(&self) -> ash::vk::Rect2D {
        self.viewport.area
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.viewport.camera
    }
}

impl Deref for ViewportDrawContext {
    type Target = SceneUpdateContext;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
