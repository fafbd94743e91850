//! 扩展点
//!
//! 每个 [`RenderPlugin`] 在构建阶段声明 stage 和资源，之后在 global、scene、viewport
//! 三个 scope 上分别创建资源对象。资源对象每帧先 `host_update`，再 `create_tasks`。

pub mod context;
pub mod render_plugin;
pub mod scene;
pub mod target;

pub use context::{
    GlobalUpdateContext, PluginBuildContext, SceneBuildContext, SceneUpdateContext, ViewportBuildContext,
    ViewportDrawContext,
};
pub use render_plugin::{GlobalResources, RenderPlugin, SceneResources, ViewportResources};
pub use scene::{AssetManager, Scene, SceneKey, SceneRef};
pub use target::{Camera, RenderTarget, RenderTargetFrame, ViewportInfo};
