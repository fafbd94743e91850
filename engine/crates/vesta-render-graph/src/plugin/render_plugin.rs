use crate::errors::RenderResult;
use crate::plugin::context::{
    GlobalUpdateContext, PluginBuildContext, SceneBuildContext, SceneUpdateContext, ViewportBuildContext,
    ViewportDrawContext,
};
use crate::render_graph::RenderGraph;
use crate::resource::config::ResourceConfig;
use crate::resource::storage::ResourceStorage;
use crate::task::TaskQueue;

/// global scope 的资源，每个 frame in flight 一份
pub trait GlobalResources: Send {
    /// 创建之后调用一次，向本层 storage 提供 descriptor 和 pipeline
    fn register_resources(&mut self, _storage: &mut ResourceStorage) -> anyhow::Result<()> {
        Ok(())
    }

    /// 每帧调用，先于 `create_tasks`
    fn host_update(&mut self, _ctx: &GlobalUpdateContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_tasks(&mut self, _queue: &mut TaskQueue<GlobalUpdateContext>) {}
}

/// scene scope 的资源，被多个 viewport 共享
pub trait SceneResources: Send {
    fn register_resources(&mut self, _storage: &mut ResourceStorage) -> anyhow::Result<()> {
        Ok(())
    }

    fn host_update(&mut self, _ctx: &SceneUpdateContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_tasks(&mut self, _queue: &mut TaskQueue<SceneUpdateContext>) {}
}

/// viewport scope 的资源
pub trait ViewportResources: Send {
    fn register_resources(&mut self, _storage: &mut ResourceStorage) -> anyhow::Result<()> {
        Ok(())
    }

    fn host_update(&mut self, _ctx: &ViewportDrawContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_tasks(&mut self, _queue: &mut TaskQueue<ViewportDrawContext>, _ctx: &ViewportDrawContext) {}
}

/// 渲染功能的扩展点
///
/// 构建 pipeline 时，所有 plugin 先依次 `define_render_stages`，再依次 `define_resources`。
/// 之后各个 `create_*` 在需要时被调用，返回 `None` 表示该 scope 不需要资源。
pub trait RenderPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn define_render_stages(&self, graph: &mut RenderGraph) -> RenderResult<()>;

    fn define_resources(&self, _config: &mut ResourceConfig) -> RenderResult<()> {
        Ok(())
    }

    fn create_global_resources(&self, _ctx: &PluginBuildContext<'_>) -> anyhow::Result<Option<Box<dyn GlobalResources>>> {
        Ok(None)
    }

    fn create_scene_resources(&self, _ctx: &SceneBuildContext<'_>) -> anyhow::Result<Option<Box<dyn SceneResources>>> {
        Ok(None)
    }

    fn create_viewport_resources(
        &self,
        _ctx: &ViewportBuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn ViewportResources>>> {
        Ok(None)
    }

    /// render target 变化时调用，默认直接重新创建
    ///
    /// `old` 是当前正在使用的资源，只能读取。所有 scope 都重建成功后才会替换并释放旧资源，
    /// 任何一个失败时旧资源原样保留。
    fn recreate_global_resources(
        &self,
        _old: Option<&dyn GlobalResources>,
        ctx: &PluginBuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn GlobalResources>>> {
        self.create_global_resources(ctx)
    }

    fn recreate_scene_resources(
        &self,
        _old: Option<&dyn SceneResources>,
        ctx: &SceneBuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn SceneResources>>> {
        self.create_scene_resources(ctx)
    }

    fn recreate_viewport_resources(
        &self,
        _old: Option<&dyn ViewportResources>,
        ctx: &ViewportBuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn ViewportResources>>> {
        self.create_viewport_resources(ctx)
    }
}
