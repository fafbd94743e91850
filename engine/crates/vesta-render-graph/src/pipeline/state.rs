use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use ash::vk;
use vesta_gfx::device::GfxDevice;

use crate::errors::{RenderError, RenderResult};
use crate::frame::{DrawGroup, Frame};
use crate::pipeline::frame_counter::{FrameCounter, FrameLabel};
use crate::pipeline::id_pool::IdPool;
use crate::plugin::context::{
    GlobalUpdateContext, PluginBuildContext, SceneBuildContext, SceneUpdateContext, ViewportBuildContext,
    ViewportDrawContext,
};
use crate::plugin::render_plugin::{GlobalResources, RenderPlugin, SceneResources, ViewportResources};
use crate::plugin::scene::{AssetManager, SceneKey, SceneRef};
use crate::plugin::target::{Camera, RenderTarget, ViewportInfo};
use crate::render_graph::{RenderGraph, RenderLayout};
use crate::resource::config::ResourceConfig;
use crate::resource::render_pass::FrameRenderState;
use crate::resource::storage::ResourceStorage;
use crate::task::TaskQueue;

/// 每个 plugin 一项，plugin 不需要该 scope 的资源时为 `None`
type PluginResources<R> = Vec<Option<Box<R>>>;

struct GlobalInstance {
    storage: Arc<ResourceStorage>,
    resources: PluginResources<dyn GlobalResources>,
}

struct SceneInstance {
    storage: Arc<ResourceStorage>,
    resources: PluginResources<dyn SceneResources>,
}

struct ViewportInstance {
    storage: Arc<ResourceStorage>,
    resources: PluginResources<dyn ViewportResources>,
}

/// 一个 frame in flight 的全部资源
///
/// 字段按 viewport → scene → global 的顺序释放
struct PipelineInstance {
    viewports: Vec<Option<ViewportInstance>>,
    scenes: HashMap<SceneKey, SceneInstance>,
    global: GlobalInstance,
}

struct ViewportSlot {
    info: ViewportInfo,
    scene: SceneRef,
}

struct SceneUsage {
    scene: SceneRef,
    use_count: usize,
}

fn plugin_error(plugin: &str) -> impl FnOnce(anyhow::Error) -> RenderError + '_ {
    move |source| RenderError::Plugin {
        plugin: plugin.to_string(),
        source,
    }
}

/// 依次为每个 plugin 创建（或重建）资源，并注册到 `storage`
///
/// `old` 为 `None` 时调用 `create_*`，否则调用 `recreate_*`，旧资源只借给 plugin 读取
fn instantiate<R: ?Sized>(
    plugins: &[Arc<dyn RenderPlugin>],
    old: Option<&PluginResources<R>>,
    storage: &mut ResourceStorage,
    create: impl Fn(&dyn RenderPlugin, Option<Option<&R>>) -> anyhow::Result<Option<Box<R>>>,
    register: impl Fn(&mut R, &mut ResourceStorage) -> anyhow::Result<()>,
) -> RenderResult<PluginResources<R>> {
    let mut resources = Vec::with_capacity(plugins.len());
    for (i, plugin) in plugins.iter().enumerate() {
        let previous = old.map(|old| old.get(i).and_then(Option::as_deref));
        let mut created = create(plugin.as_ref(), previous).map_err(plugin_error(plugin.name()))?;
        if let Some(res) = created.as_mut() {
            register(&mut **res, &mut *storage).map_err(plugin_error(plugin.name()))?;
        }
        resources.push(created);
    }
    Ok(resources)
}

/// [`RenderPipeline`](super::RenderPipeline) 的全部可变状态，由一把锁保护
pub(crate) struct PipelineState {
    device: Arc<dyn GfxDevice>,
    render_target: Arc<RenderTarget>,
    asset_manager: Option<Arc<dyn AssetManager>>,
    num_frames: usize,
    max_viewports: usize,

    plugins: Vec<Arc<dyn RenderPlugin>>,
    layout: Arc<RenderLayout>,
    root: Arc<ResourceStorage>,

    instances: Vec<PipelineInstance>,
    viewport_ids: IdPool,
    viewports: Vec<Option<ViewportSlot>>,
    scenes: HashMap<SceneKey, SceneUsage>,
    frame_counter: FrameCounter,
}

// new & init
impl PipelineState {
    pub(crate) fn new(
        device: Arc<dyn GfxDevice>,
        render_target: Arc<RenderTarget>,
        max_viewports: usize,
        asset_manager: Option<Arc<dyn AssetManager>>,
        plugins: Vec<Arc<dyn RenderPlugin>>,
    ) -> RenderResult<Self> {
        let num_frames = render_target.num_frames();
        if num_frames == 0 {
            return Err(RenderError::InvalidConfig("render target has no frames".to_string()));
        }
        if max_viewports == 0 {
            return Err(RenderError::InvalidConfig("max_viewports must be at least 1".to_string()));
        }

        let mut graph = RenderGraph::new();
        for plugin in &plugins {
            plugin.define_render_stages(&mut graph)?;
        }
        let mut config = ResourceConfig::new();
        for plugin in &plugins {
            plugin.define_resources(&mut config)?;
        }

        let layout = Arc::new(graph.compile()?);
        layout.print_execution_plan();

        let root = Arc::new(ResourceStorage::new_root(device.clone(), Arc::new(config)));

        let mut state = Self {
            device,
            render_target,
            asset_manager,
            num_frames,
            max_viewports,
            plugins,
            layout,
            root,
            instances: Vec::with_capacity(num_frames),
            viewport_ids: IdPool::new(max_viewports),
            viewports: (0..max_viewports).map(|_| None).collect(),
            scenes: HashMap::new(),
            frame_counter: FrameCounter::new(0, num_frames),
        };

        for frame_index in 0..num_frames {
            let global = state.build_global(frame_index, None)?;
            state.instances.push(PipelineInstance {
                viewports: (0..max_viewports).map(|_| None).collect(),
                scenes: HashMap::new(),
                global,
            });
        }

        log::info!(
            "Render pipeline built: {} plugins, {} stages, {} frames in flight, {} viewports",
            state.plugins.len(),
            state.layout.len(),
            num_frames,
            max_viewports
        );
        Ok(state)
    }

    fn build_context(&self, frame_index: usize) -> PluginBuildContext<'_> {
        PluginBuildContext {
            device: &self.device,
            num_frames: self.num_frames,
            num_viewports: self.max_viewports,
            frame_index,
            render_target: &self.render_target,
            asset_manager: self.asset_manager.as_ref(),
        }
    }

    fn build_global(
        &self,
        frame_index: usize,
        old: Option<&PluginResources<dyn GlobalResources>>,
    ) -> RenderResult<GlobalInstance> {
        let ctx = self.build_context(frame_index);
        let mut storage = ResourceStorage::derive(&self.root, format!("global{}", FrameLabel(frame_index)));
        let resources = instantiate(
            &self.plugins,
            old,
            &mut storage,
            |plugin, previous| match previous {
                None => plugin.create_global_resources(&ctx),
                Some(previous) => plugin.recreate_global_resources(previous, &ctx),
            },
            |res, storage| res.register_resources(storage),
        )?;
        Ok(GlobalInstance {
            storage: Arc::new(storage),
            resources,
        })
    }

    /// `parent` 是同一 frame 的 global storage
    fn build_scene(
        &self,
        frame_index: usize,
        parent: &Arc<ResourceStorage>,
        scene: &SceneRef,
        old: Option<&PluginResources<dyn SceneResources>>,
    ) -> RenderResult<SceneInstance> {
        let ctx = SceneBuildContext {
            base: self.build_context(frame_index),
            scene,
        };
        let mut storage =
            ResourceStorage::derive(parent, format!("scene[{}]{}", scene.name(), FrameLabel(frame_index)));
        let resources = instantiate(
            &self.plugins,
            old,
            &mut storage,
            |plugin, previous| match previous {
                None => plugin.create_scene_resources(&ctx),
                Some(previous) => plugin.recreate_scene_resources(previous, &ctx),
            },
            |res, storage| res.register_resources(storage),
        )?;
        Ok(SceneInstance {
            storage: Arc::new(storage),
            resources,
        })
    }

    /// `parent` 是同一 frame 中该 viewport 所显示场景的 storage
    fn build_viewport(
        &self,
        frame_index: usize,
        parent: &Arc<ResourceStorage>,
        info: &ViewportInfo,
        scene: &SceneRef,
        old: Option<&PluginResources<dyn ViewportResources>>,
    ) -> RenderResult<ViewportInstance> {
        let ctx = ViewportBuildContext {
            base: SceneBuildContext {
                base: self.build_context(frame_index),
                scene,
            },
            viewport: info,
        };
        let mut storage =
            ResourceStorage::derive(parent, format!("viewport[{}]{}", info.index, FrameLabel(frame_index)));
        let resources = instantiate(
            &self.plugins,
            old,
            &mut storage,
            |plugin, previous| match previous {
                None => plugin.create_viewport_resources(&ctx),
                Some(previous) => plugin.recreate_viewport_resources(previous, &ctx),
            },
            |res, storage| res.register_resources(storage),
        )?;
        Ok(ViewportInstance {
            storage: Arc::new(storage),
            resources,
        })
    }
}

fn scene_storage<'a>(
    scenes: &'a HashMap<SceneKey, SceneInstance>,
    scene: &SceneRef,
) -> RenderResult<&'a Arc<ResourceStorage>> {
    scenes
        .get(&SceneKey::of(scene))
        .map(|instance| &instance.storage)
        .ok_or_else(|| RenderError::InvalidConfig(format!("scene \"{}\" has no resources", scene.name())))
}

// getters
impl PipelineState {
    #[inline]
    pub(crate) fn device(&self) -> &Arc<dyn GfxDevice> {
        &self.device
    }

    #[inline]
    pub(crate) fn layout(&self) -> &Arc<RenderLayout> {
        &self.layout
    }

    #[inline]
    pub(crate) fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub(crate) fn max_viewports(&self) -> usize {
        self.max_viewports
    }

    #[inline]
    pub(crate) fn frame_id(&self) -> u64 {
        self.frame_counter.frame_id()
    }

    #[inline]
    pub(crate) fn render_target(&self) -> &Arc<RenderTarget> {
        &self.render_target
    }

    #[inline]
    pub(crate) fn live_viewports(&self) -> usize {
        self.viewport_ids.len()
    }

    #[inline]
    pub(crate) fn live_scenes(&self) -> usize {
        self.scenes.len()
    }

    /// 存活的 viewport，按 index 升序
    pub(crate) fn viewport_indices(&self) -> Vec<usize> {
        self.viewports.iter().enumerate().filter(|(_, slot)| slot.is_some()).map(|(index, _)| index).collect()
    }

    fn slot(&self, index: usize) -> RenderResult<&ViewportSlot> {
        self.viewports.get(index).and_then(Option::as_ref).ok_or(RenderError::ViewportNotFound(index))
    }

    fn slot_mut(&mut self, index: usize) -> RenderResult<&mut ViewportSlot> {
        self.viewports.get_mut(index).and_then(Option::as_mut).ok_or(RenderError::ViewportNotFound(index))
    }

    pub(crate) fn viewport_info(&self, index: usize) -> RenderResult<ViewportInfo> {
        Ok(self.slot(index)?.info)
    }

    pub(crate) fn viewport_scene(&self, index: usize) -> RenderResult<SceneRef> {
        Ok(self.slot(index)?.scene.clone())
    }
}

// scene 引用计数
impl PipelineState {
    /// 场景第一次被使用时在每个 frame in flight 中创建 scene 资源
    fn acquire_scene(&mut self, scene: &SceneRef) -> RenderResult<()> {
        let key = SceneKey::of(scene);
        if let Some(usage) = self.scenes.get_mut(&key) {
            usage.use_count += 1;
            return Ok(());
        }

        for frame_index in 0..self.instances.len() {
            match self.build_scene(frame_index, &self.instances[frame_index].global.storage, scene, None) {
                Ok(instance) => {
                    self.instances[frame_index].scenes.insert(key, instance);
                }
                Err(err) => {
                    for instance in &mut self.instances {
                        instance.scenes.remove(&key);
                    }
                    return Err(err);
                }
            }
        }

        self.scenes.insert(
            key,
            SceneUsage {
                scene: scene.clone(),
                use_count: 1,
            },
        );
        log::info!("Create scene resources: {}", scene.name());
        Ok(())
    }

    /// 最后一个使用者释放时销毁 scene 资源
    fn release_scene(&mut self, scene: &SceneRef) {
        let key = SceneKey::of(scene);
        let Entry::Occupied(mut usage) = self.scenes.entry(key) else {
            log::warn!("Release unknown scene: {}", scene.name());
            return;
        };

        usage.get_mut().use_count -= 1;
        if usage.get().use_count == 0 {
            let usage = usage.remove();
            for instance in &mut self.instances {
                instance.scenes.remove(&key);
            }
            log::info!("Release scene resources: {}", usage.scene.name());
        }
    }
}

// viewport
impl PipelineState {
    pub(crate) fn attach_viewport(&mut self, area: vk::Rect2D, camera: Camera, scene: SceneRef) -> RenderResult<usize> {
        let index = self.viewport_ids.alloc().ok_or(RenderError::ViewportLimitExceeded {
            max: self.max_viewports,
        })?;
        let info = ViewportInfo { index, area, camera };

        if let Err(err) = self.acquire_scene(&scene) {
            self.viewport_ids.free(index);
            return Err(err);
        }

        for frame_index in 0..self.instances.len() {
            let built = scene_storage(&self.instances[frame_index].scenes, &scene)
                .and_then(|parent| self.build_viewport(frame_index, parent, &info, &scene, None));
            match built {
                Ok(instance) => self.instances[frame_index].viewports[index] = Some(instance),
                Err(err) => {
                    for instance in &mut self.instances {
                        instance.viewports[index] = None;
                    }
                    self.release_scene(&scene);
                    self.viewport_ids.free(index);
                    return Err(err);
                }
            }
        }

        log::info!("Create viewport {} for scene {}", index, scene.name());
        self.viewports[index] = Some(ViewportSlot { info, scene });
        Ok(index)
    }

    /// viewport handle 释放时调用
    pub(crate) fn free_viewport(&mut self, index: usize) {
        let Some(slot) = self.viewports.get_mut(index).and_then(Option::take) else {
            log::warn!("Free unknown viewport {}", index);
            return;
        };

        for instance in &mut self.instances {
            instance.viewports[index] = None;
        }
        self.viewport_ids.free(index);
        self.release_scene(&slot.scene);
        log::info!("Free viewport {}", index);
    }

    pub(crate) fn set_viewport_camera(&mut self, index: usize, camera: Camera) -> RenderResult<()> {
        self.slot_mut(index)?.info.camera = camera;
        Ok(())
    }

    pub(crate) fn resize_viewport(&mut self, index: usize, area: vk::Rect2D) -> RenderResult<()> {
        let previous = std::mem::replace(&mut self.slot_mut(index)?.info.area, area);
        let result = self.rebuild_viewport(index);
        if result.is_err() {
            self.slot_mut(index)?.info.area = previous;
        }
        result
    }

    pub(crate) fn set_viewport_scene(&mut self, index: usize, scene: SceneRef) -> RenderResult<()> {
        let old_scene = self.slot(index)?.scene.clone();
        if SceneKey::of(&old_scene) == SceneKey::of(&scene) {
            return Ok(());
        }

        self.acquire_scene(&scene)?;
        self.slot_mut(index)?.scene = scene.clone();
        match self.rebuild_viewport(index) {
            Ok(()) => {
                self.release_scene(&old_scene);
                Ok(())
            }
            Err(err) => {
                self.slot_mut(index)?.scene = old_scene;
                self.release_scene(&scene);
                Err(err)
            }
        }
    }

    /// 在每个 frame in flight 中重建 viewport 资源，全部成功后才替换旧资源
    fn rebuild_viewport(&mut self, index: usize) -> RenderResult<()> {
        let (info, scene) = {
            let slot = self.slot(index)?;
            (slot.info, slot.scene.clone())
        };

        let mut staged = Vec::with_capacity(self.instances.len());
        for (frame_index, instance) in self.instances.iter().enumerate() {
            let parent = scene_storage(&instance.scenes, &scene)?;
            let old = instance.viewports.get(index).and_then(Option::as_ref).map(|old| &old.resources);
            staged.push(self.build_viewport(frame_index, parent, &info, &scene, old)?);
        }

        for (instance, viewport) in self.instances.iter_mut().zip(staged) {
            instance.viewports[index] = Some(viewport);
        }
        Ok(())
    }
}

// render target
impl PipelineState {
    /// 更换 render target，并在所有 scope 上重建资源
    ///
    /// 先为每个 frame in flight 构建完整的一套新实例，全部成功后才替换；
    /// 任何一步失败时 render target 和所有旧实例保持不变。
    pub(crate) fn change_render_target(&mut self, render_target: Arc<RenderTarget>) -> RenderResult<()> {
        let requested = render_target.num_frames();
        if requested == 0 {
            return Err(RenderError::InvalidConfig("render target has no frames".to_string()));
        }
        if requested > self.num_frames {
            return Err(RenderError::FrameCountExceeded {
                requested,
                max: self.num_frames,
            });
        }

        let previous = std::mem::replace(&mut self.render_target, render_target);
        let staged = match self.stage_instances() {
            Ok(staged) => staged,
            Err(err) => {
                self.render_target = previous;
                log::error!("Change render target failed, keep the previous one: {}", err);
                return Err(err);
            }
        };

        // 旧实例在这里释放
        self.instances = staged;
        log::info!(
            "Render target changed: {}x{}, {} frames",
            self.render_target.extent.width,
            self.render_target.extent.height,
            requested
        );
        Ok(())
    }

    /// 基于当前的 render target 重建所有 frame 的 global、scene 和 viewport 实例
    fn stage_instances(&self) -> RenderResult<Vec<PipelineInstance>> {
        let mut staged = Vec::with_capacity(self.instances.len());
        for (frame_index, old) in self.instances.iter().enumerate() {
            let global = self.build_global(frame_index, Some(&old.global.resources))?;

            let mut scenes = HashMap::with_capacity(self.scenes.len());
            for (key, usage) in &self.scenes {
                let previous = old.scenes.get(key).map(|instance| &instance.resources);
                scenes.insert(*key, self.build_scene(frame_index, &global.storage, &usage.scene, previous)?);
            }

            let mut viewports: Vec<Option<ViewportInstance>> = (0..self.max_viewports).map(|_| None).collect();
            for (index, slot) in self.viewports.iter().enumerate() {
                let Some(slot) = slot else { continue };
                let parent = scene_storage(&scenes, &slot.scene)?;
                let previous = old.viewports.get(index).and_then(Option::as_ref).map(|instance| &instance.resources);
                viewports[index] = Some(self.build_viewport(frame_index, parent, &slot.info, &slot.scene, previous)?);
            }

            staged.push(PipelineInstance {
                viewports,
                scenes,
                global,
            });
        }
        Ok(staged)
    }
}

// draw
impl PipelineState {
    /// 为 `indices` 中的 viewport 生成本帧的任务，然后推进帧计数
    ///
    /// 执行顺序：global → 各个 scene（按首次出现的顺序）→ 各个 viewport
    pub(crate) fn draw(&mut self, indices: &[usize]) -> RenderResult<Frame> {
        let frame_index = self.frame_counter.frame_index();
        let frame_id = self.frame_counter.frame_id();
        let frame_name = self.frame_counter.frame_name();
        let render_target = self.render_target.clone();
        let target_frame = *render_target
            .frame(frame_index)
            .ok_or_else(|| RenderError::InvalidConfig("render target has no frames".to_string()))?;

        let plugins = &self.plugins;
        let instance = &mut self.instances[frame_index];

        let mut draw_groups = Vec::with_capacity(indices.len());
        for &index in indices {
            let slot = self.viewports.get(index).and_then(Option::as_ref).ok_or(RenderError::ViewportNotFound(index))?;
            let viewport = instance
                .viewports
                .get(index)
                .and_then(Option::as_ref)
                .ok_or(RenderError::ViewportNotFound(index))?;
            draw_groups.push(DrawGroup {
                viewport_index: index,
                frame_state: FrameRenderState {
                    frame_index,
                    viewport_index: index,
                    area: slot.info.area,
                    target_image: target_frame.image,
                    target_view: target_frame.view,
                    target_extent: render_target.extent,
                },
                layout: self.layout.clone(),
                resources: viewport.storage.clone(),
                scene: slot.scene.clone(),
                task_queue: TaskQueue::new(),
            });
        }

        // global
        let global_ctx = GlobalUpdateContext {
            frame_index,
            frame_id,
            resources: instance.global.storage.clone(),
            render_target: render_target.clone(),
        };
        let mut global_queue = TaskQueue::new();
        for (plugin, resources) in plugins.iter().zip(instance.global.resources.iter_mut()) {
            if let Some(resources) = resources {
                resources.host_update(&global_ctx).map_err(plugin_error(plugin.name()))?;
            }
        }
        for resources in instance.global.resources.iter_mut().flatten() {
            resources.create_tasks(&mut global_queue);
        }
        match draw_groups.first_mut() {
            Some(group) => {
                let ctx = global_ctx.clone();
                global_queue.move_tasks(move |_: &()| ctx.clone(), &mut group.task_queue);
            }
            None if !global_queue.is_empty() => log::debug!("{} has no viewport, global tasks dropped", frame_name),
            None => {}
        }

        // scene，任务放到第一个显示该场景的 group
        let mut scene_groups: Vec<(SceneKey, usize)> = Vec::new();
        for (group_index, group) in draw_groups.iter().enumerate() {
            let key = SceneKey::of(&group.scene);
            if !scene_groups.iter().any(|(k, _)| *k == key) {
                scene_groups.push((key, group_index));
            }
        }
        for (key, group_index) in scene_groups {
            let group = &mut draw_groups[group_index];
            let scene_instance = instance
                .scenes
                .get_mut(&key)
                .ok_or_else(|| RenderError::InvalidConfig(format!("scene \"{}\" has no resources", group.scene.name())))?;

            let ctx = SceneUpdateContext {
                base: GlobalUpdateContext {
                    resources: scene_instance.storage.clone(),
                    ..global_ctx.clone()
                },
                scene: group.scene.clone(),
            };
            let mut queue = TaskQueue::new();
            for (plugin, resources) in plugins.iter().zip(scene_instance.resources.iter_mut()) {
                if let Some(resources) = resources {
                    resources.host_update(&ctx).map_err(plugin_error(plugin.name()))?;
                }
            }
            for resources in scene_instance.resources.iter_mut().flatten() {
                resources.create_tasks(&mut queue);
            }
            queue.move_tasks(move |_: &()| ctx.clone(), &mut group.task_queue);
        }

        // viewport
        for group in &mut draw_groups {
            let index = group.viewport_index;
            let info = self.viewports.get(index).and_then(Option::as_ref).ok_or(RenderError::ViewportNotFound(index))?.info;
            let viewport_instance = instance
                .viewports
                .get_mut(index)
                .and_then(Option::as_mut)
                .ok_or(RenderError::ViewportNotFound(index))?;

            let ctx = ViewportDrawContext {
                base: SceneUpdateContext {
                    base: GlobalUpdateContext {
                        resources: viewport_instance.storage.clone(),
                        ..global_ctx.clone()
                    },
                    scene: group.scene.clone(),
                },
                viewport: info,
            };
            let mut queue = TaskQueue::new();
            for (plugin, resources) in plugins.iter().zip(viewport_instance.resources.iter_mut()) {
                if let Some(resources) = resources {
                    resources.host_update(&ctx).map_err(plugin_error(plugin.name()))?;
                }
            }
            for resources in viewport_instance.resources.iter_mut().flatten() {
                resources.create_tasks(&mut queue, &ctx);
            }
            queue.move_tasks(move |_: &()| ctx.clone(), &mut group.task_queue);
        }

        self.frame_counter.next_frame();
        Ok(Frame {
            frame_index,
            frame_id,
            frame_name,
            draw_groups,
        })
    }
}
