use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;
use vesta_gfx::device::GfxDevice;

use crate::errors::{RenderError, RenderResult};
use crate::frame::Frame;
use crate::pipeline::state::PipelineState;
use crate::pipeline::viewport::RenderPipelineViewport;
use crate::plugin::render_plugin::RenderPlugin;
use crate::plugin::scene::{AssetManager, SceneRef};
use crate::plugin::target::{Camera, RenderTarget};
use crate::render_graph::RenderLayout;

/// 构建 [`RenderPipeline`] 所需的配置
///
/// frames in flight 的数量取自 `render_target` 的帧数
pub struct RenderPipelineDesc {
    pub device: Arc<dyn GfxDevice>,
    pub render_target: Arc<RenderTarget>,
    /// 最多同时存在的 viewport 数量
    pub max_viewports: usize,
    pub asset_manager: Option<Arc<dyn AssetManager>>,
}

pub struct RenderPipelineBuilder {
    desc: RenderPipelineDesc,
    plugins: Vec<Arc<dyn RenderPlugin>>,
}

impl RenderPipelineBuilder {
    pub fn new(desc: RenderPipelineDesc) -> Self {
        Self {
            desc,
            plugins: Vec::new(),
        }
    }

    /// plugin 按添加的顺序定义 stage、创建资源和任务
    pub fn add_plugin(mut self, plugin: impl RenderPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn add_shared_plugin(mut self, plugin: Arc<dyn RenderPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn build(self) -> RenderResult<RenderPipeline> {
        let RenderPipelineDesc {
            device,
            render_target,
            max_viewports,
            asset_manager,
        } = self.desc;

        let state = PipelineState::new(device.clone(), render_target, max_viewports, asset_manager, self.plugins)?;
        Ok(RenderPipeline {
            device,
            layout: state.layout().clone(),
            num_frames: state.num_frames(),
            max_viewports: state.max_viewports(),
            shared: Arc::new(Mutex::new(state)),
        })
    }
}

/// 渲染管线
///
/// 每个 frame in flight 持有一份 global / scene / viewport 资源；`draw` 轮流使用它们。
/// viewport 由 [`RenderPipelineViewport`] 句柄表示，句柄 drop 时释放对应的资源。
pub struct RenderPipeline {
    device: Arc<dyn GfxDevice>,
    layout: Arc<RenderLayout>,
    num_frames: usize,
    max_viewports: usize,

    shared: Arc<Mutex<PipelineState>>,
}

// new & init
impl RenderPipeline {
    pub fn builder(desc: RenderPipelineDesc) -> RenderPipelineBuilder {
        RenderPipelineBuilder::new(desc)
    }

    fn lock(&self) -> RenderResult<MutexGuard<'_, PipelineState>> {
        self.shared.lock().map_err(|_| RenderError::LockPoisoned)
    }
}

// viewport
impl RenderPipeline {
    /// 创建一个 viewport
    ///
    /// 场景第一次出现时会先创建 scene 资源；任何一步失败都会撤销已经创建的部分
    pub fn make_viewport(&self, area: vk::Rect2D, camera: Camera, scene: SceneRef) -> RenderResult<RenderPipelineViewport> {
        let index = self.lock()?.attach_viewport(area, camera, scene)?;
        Ok(RenderPipelineViewport::new(Arc::downgrade(&self.shared), index))
    }

    /// 当前存活的 viewport 数量
    pub fn num_viewports(&self) -> RenderResult<usize> {
        Ok(self.lock()?.live_viewports())
    }

    /// 当前被 viewport 引用的场景数量
    pub fn num_scenes(&self) -> RenderResult<usize> {
        Ok(self.lock()?.live_scenes())
    }
}

// draw
impl RenderPipeline {
    /// 按给定顺序为这些 viewport 生成一帧的任务
    pub fn draw(&self, viewports: &[&RenderPipelineViewport]) -> RenderResult<Frame> {
        let mut indices = Vec::with_capacity(viewports.len());
        for viewport in viewports {
            if !viewport.belongs_to(&self.shared) {
                return Err(RenderError::ForeignViewport);
            }
            indices.push(viewport.index());
        }
        self.lock()?.draw(&indices)
    }

    /// 按 index 顺序绘制所有存活的 viewport
    pub fn draw_all_viewports(&self) -> RenderResult<Frame> {
        let mut state = self.lock()?;
        let indices = state.viewport_indices();
        state.draw(&indices)
    }

    /// 更换 render target，并在所有 scope 上重建资源
    ///
    /// render target 的帧数不能超过构建时的帧数
    pub fn change_render_target(&self, render_target: Arc<RenderTarget>) -> RenderResult<()> {
        self.lock()?.change_render_target(render_target)
    }
}

// getters
impl RenderPipeline {
    #[inline]
    pub fn device(&self) -> &Arc<dyn GfxDevice> {
        &self.device
    }

    #[inline]
    pub fn layout(&self) -> &Arc<RenderLayout> {
        &self.layout
    }

    /// frames in flight 的数量
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn max_viewports(&self) -> usize {
        self.max_viewports
    }

    /// 下一次 `draw` 使用的帧序号
    pub fn frame_id(&self) -> RenderResult<u64> {
        Ok(self.lock()?.frame_id())
    }

    pub fn render_target(&self) -> RenderResult<Arc<RenderTarget>> {
        Ok(self.lock()?.render_target().clone())
    }
}
