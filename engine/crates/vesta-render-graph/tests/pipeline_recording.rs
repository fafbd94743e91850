//! pipeline → frame → recorder 的端到端测试，全部运行在 MockDevice 上

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ash::vk;
use vesta_crate_tools::init_log::init_test_log;
use vesta_gfx::basic::color::LabelColor;
use vesta_gfx::mock_device::{MockCommand, MockDevice};
use vesta_render_graph::dependency::{ImageAccess, ImageState};
use vesta_render_graph::pipeline::{RenderPipeline, RenderPipelineDesc};
use vesta_render_graph::plugin::{
    Camera, GlobalResources, GlobalUpdateContext, PluginBuildContext, RenderPlugin, RenderTarget, RenderTargetFrame,
    Scene, SceneBuildContext, SceneRef, SceneResources, SceneUpdateContext, ViewportBuildContext, ViewportDrawContext,
    ViewportResources,
};
use vesta_render_graph::plugins::{ClearImagePlugin, PresentPlugin};
use vesta_render_graph::recorder::{CommandRecorder, CommandRecorderDesc};
use vesta_render_graph::render_graph::RenderGraph;
use vesta_render_graph::resource::ResourceConfig;
use vesta_render_graph::task::TaskQueue;
use vesta_render_graph::{RenderError, RenderResult, RenderStageId};

// ============================================================================
// 公共工具
// ============================================================================

struct TestScene(&'static str);

impl Scene for TestScene {
    fn name(&self) -> &str {
        self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn scene(name: &'static str) -> SceneRef {
    Arc::new(TestScene(name))
}

fn render_target(device: &MockDevice, frames: usize) -> Arc<RenderTarget> {
    Arc::new(RenderTarget {
        extent: vk::Extent2D { width: 640, height: 480 },
        color_format: vk::Format::R8G8B8A8_UNORM,
        frames: (0..frames)
            .map(|_| RenderTargetFrame {
                image: device.fake_handle(),
                view: device.fake_handle(),
            })
            .collect(),
    })
}

fn area(x: i32) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x, y: 0 },
        extent: vk::Extent2D { width: 320, height: 480 },
    }
}

fn build(
    device: &Arc<MockDevice>,
    frames: usize,
    max_viewports: usize,
    plugins: Vec<Arc<dyn RenderPlugin>>,
) -> RenderResult<RenderPipeline> {
    let desc = RenderPipelineDesc {
        device: device.clone(),
        render_target: render_target(device, frames),
        max_viewports,
        asset_manager: None,
    };
    plugins.into_iter().fold(RenderPipeline::builder(desc), |builder, plugin| builder.add_shared_plugin(plugin)).build()
}

fn recorder(device: &Arc<MockDevice>, pipeline: &RenderPipeline) -> CommandRecorder {
    CommandRecorder::new(
        device.clone(),
        &CommandRecorderDesc {
            num_frames: pipeline.num_frames(),
            worker_threads: 2,
        },
    )
    .unwrap()
}

/// 只定义 stage 的 plugin
struct StagesPlugin(Vec<RenderStageId>);

impl RenderPlugin for StagesPlugin {
    fn name(&self) -> &str {
        "stages"
    }

    fn define_render_stages(&self, graph: &mut RenderGraph) -> RenderResult<()> {
        for stage in &self.0 {
            graph.last(*stage)?;
        }
        Ok(())
    }
}

// ============================================================================
// [A, B, C]：global 资源在 A 写入，viewport 资源在 C 读取
// ============================================================================

/// 定义 [A, B, C]，global 资源在 A 中写入图像
struct ChainHeadPlugin {
    stages: [RenderStageId; 3],
    image: vk::Image,
    dependent: bool,
}

struct ChainHeadResources {
    stage: RenderStageId,
    image: vk::Image,
    dependent: bool,
}

/// viewport 资源在 C 中读取图像
struct ChainTailPlugin {
    stage: RenderStageId,
    image: vk::Image,
}

struct ChainTailResources {
    stage: RenderStageId,
    image: vk::Image,
}

impl RenderPlugin for ChainHeadPlugin {
    fn name(&self) -> &str {
        "chain-head"
    }

    fn define_render_stages(&self, graph: &mut RenderGraph) -> RenderResult<()> {
        let [a, b, c] = self.stages;
        graph.first(a)?;
        graph.after(a, b)?;
        graph.after(b, c)?;
        Ok(())
    }

    fn create_global_resources(&self, _ctx: &PluginBuildContext<'_>) -> anyhow::Result<Option<Box<dyn GlobalResources>>> {
        Ok(Some(Box::new(ChainHeadResources {
            stage: self.stages[0],
            image: self.image,
            dependent: self.dependent,
        })))
    }
}

impl GlobalResources for ChainHeadResources {
    fn create_tasks(&mut self, queue: &mut TaskQueue<GlobalUpdateContext>) {
        let (image, dependent) = (self.image, self.dependent);
        queue.spawn(self.stage, move |exec, _ctx| {
            exec.cmd().insert_label("A", LabelColor::COLOR_PASS);
            if dependent {
                exec.produce(ImageAccess::new(image, ImageState::COLOR_ATTACHMENT_WRITE));
            }
        });
    }
}

impl RenderPlugin for ChainTailPlugin {
    fn name(&self) -> &str {
        "chain-tail"
    }

    fn define_render_stages(&self, _graph: &mut RenderGraph) -> RenderResult<()> {
        Ok(())
    }

    fn create_viewport_resources(
        &self,
        _ctx: &ViewportBuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn ViewportResources>>> {
        Ok(Some(Box::new(ChainTailResources {
            stage: self.stage,
            image: self.image,
        })))
    }
}

impl ViewportResources for ChainTailResources {
    fn create_tasks(&mut self, queue: &mut TaskQueue<ViewportDrawContext>, _ctx: &ViewportDrawContext) {
        let image = self.image;
        queue.spawn(self.stage, move |exec, _ctx| {
            exec.cmd().insert_label("C", LabelColor::COLOR_PASS);
            exec.consume(ImageAccess::new(image, ImageState::SHADER_READ_FRAGMENT));
        });
    }
}

fn run_chain(dependent: bool) {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let stages = [RenderStageId::new("A"), RenderStageId::new("B"), RenderStageId::new("C")];
    let image = device.fake_handle();
    let head = ChainHeadPlugin {
        stages,
        image,
        dependent,
    };
    let tail = ChainTailPlugin { stage: stages[2], image };
    let pipeline = build(&device, 2, 1, vec![Arc::new(head), Arc::new(tail)]).unwrap();
    let layout: Vec<_> = pipeline.layout().stages().iter().map(|info| info.stage).collect();
    assert_eq!(layout, stages);

    let _viewport = pipeline.make_viewport(area(0), Camera::default(), scene("chain")).unwrap();
    let mut recorder = recorder(&device, &pipeline);
    let recorded = recorder.record(pipeline.draw_all_viewports().unwrap()).unwrap();

    let submissions = recorded.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].stage, stages[0]);
    assert_eq!(submissions[1].stage, stages[2]);

    let first = submissions[0].command_buffer.vk_handle();
    let second = submissions[1].command_buffer.vk_handle();
    assert_eq!(device.inserted_labels(first), vec!["A"]);
    assert_eq!(device.inserted_labels(second), vec!["C"]);
    assert_eq!(recorded.command_buffers(), vec![first, second]);

    for cmd in [first, second] {
        assert!(!device.is_recording(cmd));
        assert_eq!(device.commands(cmd).last(), Some(&MockCommand::End));
    }
    assert!(device.barriers(second).is_empty());

    let barriers = device.barriers(first);
    if dependent {
        assert_eq!(submissions[0].image_barrier_count, 1);
        assert_eq!(barriers.len(), 1);
        let MockCommand::Barrier { images, buffers } = &barriers[0] else {
            unreachable!()
        };
        assert!(buffers.is_empty());
        assert_eq!(images[0].old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(images[0].new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(images[0].src_access, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
    } else {
        assert_eq!(submissions[0].image_barrier_count, 0);
        assert!(barriers.is_empty());
    }
}

#[test]
fn test_chain_with_dependency_gets_barrier() {
    run_chain(true);
}

#[test]
fn test_chain_without_dependency_has_no_barrier() {
    run_chain(false);
}

// ============================================================================
// viewport 生命周期
// ============================================================================

#[test]
fn test_viewport_limit_and_reuse() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let pipeline = build(&device, 2, 2, vec![Arc::new(StagesPlugin(vec![RenderStageId::new("main")]))]).unwrap();

    let first = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();
    let second = pipeline.make_viewport(area(320), Camera::default(), scene("s")).unwrap();
    assert_ne!(first.index(), second.index());

    let err = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap_err();
    assert!(matches!(err, RenderError::ViewportLimitExceeded { max: 2 }));

    let freed = first.index();
    drop(first);
    assert_eq!(pipeline.num_viewports().unwrap(), 1);
    assert_eq!(second.area().unwrap(), area(320));

    let third = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();
    assert_eq!(third.index(), freed);
    assert_eq!(pipeline.num_viewports().unwrap(), 2);
}

#[test]
fn test_viewport_outlives_pipeline() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let pipeline = build(&device, 1, 1, vec![Arc::new(StagesPlugin(vec![RenderStageId::new("main")]))]).unwrap();
    let viewport = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();
    assert!(viewport.is_alive());

    drop(pipeline);
    assert!(!viewport.is_alive());
    assert!(matches!(viewport.area(), Err(RenderError::PipelineDestroyed)));
    assert!(matches!(viewport.set_camera(Camera::default()), Err(RenderError::PipelineDestroyed)));
    drop(viewport);
}

#[test]
fn test_foreign_viewport_rejected() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let stage = RenderStageId::new("main");
    let a = build(&device, 1, 1, vec![Arc::new(StagesPlugin(vec![stage]))]).unwrap();
    let b = build(&device, 1, 1, vec![Arc::new(StagesPlugin(vec![stage]))]).unwrap();

    let viewport = b.make_viewport(area(0), Camera::default(), scene("s")).unwrap();
    assert!(matches!(a.draw(&[&viewport]), Err(RenderError::ForeignViewport)));
    assert!(b.draw(&[&viewport]).is_ok());
}

// ============================================================================
// scope 资源的创建、更新与释放
// ============================================================================

#[derive(Default)]
struct Counters {
    global_created: AtomicUsize,
    scene_created: AtomicUsize,
    viewport_created: AtomicUsize,
    fail_viewport: AtomicBool,
    /// 只让 frame 1 的 global 资源创建失败
    fail_second_global: AtomicBool,
    log: Mutex<Vec<String>>,
}

/// 记录各个 scope 的创建次数和 `host_update` 顺序
struct TracePlugin {
    stage: RenderStageId,
    counters: Arc<Counters>,
}

struct TraceGlobal {
    stage: RenderStageId,
    counters: Arc<Counters>,
}

struct TraceScene {
    stage: RenderStageId,
    counters: Arc<Counters>,
}

struct TraceViewport {
    stage: RenderStageId,
    counters: Arc<Counters>,
}

impl RenderPlugin for TracePlugin {
    fn name(&self) -> &str {
        "trace"
    }

    fn define_render_stages(&self, graph: &mut RenderGraph) -> RenderResult<()> {
        graph.first(self.stage)
    }

    fn create_global_resources(&self, ctx: &PluginBuildContext<'_>) -> anyhow::Result<Option<Box<dyn GlobalResources>>> {
        if ctx.frame_index() == 1 && self.counters.fail_second_global.load(Ordering::SeqCst) {
            anyhow::bail!("global resources for frame 1 rejected");
        }
        self.counters.global_created.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(TraceGlobal {
            stage: self.stage,
            counters: self.counters.clone(),
        })))
    }

    fn create_scene_resources(&self, ctx: &SceneBuildContext<'_>) -> anyhow::Result<Option<Box<dyn SceneResources>>> {
        assert!(ctx.frame_index() < ctx.num_frames());
        self.counters.scene_created.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(TraceScene {
            stage: self.stage,
            counters: self.counters.clone(),
        })))
    }

    fn create_viewport_resources(
        &self,
        ctx: &ViewportBuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn ViewportResources>>> {
        if self.counters.fail_viewport.load(Ordering::SeqCst) {
            anyhow::bail!("viewport {} rejected", ctx.viewport().index);
        }
        self.counters.viewport_created.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(TraceViewport {
            stage: self.stage,
            counters: self.counters.clone(),
        })))
    }
}

impl GlobalResources for TraceGlobal {
    fn host_update(&mut self, _ctx: &GlobalUpdateContext) -> anyhow::Result<()> {
        self.counters.log.lock().unwrap().push("global".to_string());
        Ok(())
    }

    fn create_tasks(&mut self, queue: &mut TaskQueue<GlobalUpdateContext>) {
        queue.spawn(self.stage, |_exec, _ctx| {});
    }
}

impl SceneResources for TraceScene {
    fn host_update(&mut self, ctx: &SceneUpdateContext) -> anyhow::Result<()> {
        self.counters.log.lock().unwrap().push(format!("scene:{}", ctx.scene().name()));
        Ok(())
    }

    fn create_tasks(&mut self, queue: &mut TaskQueue<SceneUpdateContext>) {
        queue.spawn(self.stage, |_exec, _ctx| {});
    }
}

impl ViewportResources for TraceViewport {
    fn host_update(&mut self, ctx: &ViewportDrawContext) -> anyhow::Result<()> {
        self.counters.log.lock().unwrap().push(format!("viewport:{}", ctx.viewport_index()));
        Ok(())
    }

    fn create_tasks(&mut self, queue: &mut TaskQueue<ViewportDrawContext>, _ctx: &ViewportDrawContext) {
        queue.spawn(self.stage, |_exec, _ctx| {});
    }
}

fn trace_pipeline(device: &Arc<MockDevice>, frames: usize, max_viewports: usize) -> (RenderPipeline, Arc<Counters>, RenderStageId) {
    let counters = Arc::new(Counters::default());
    let stage = RenderStageId::new("trace");
    let plugin = TracePlugin {
        stage,
        counters: counters.clone(),
    };
    let pipeline = build(device, frames, max_viewports, vec![Arc::new(plugin)]).unwrap();
    (pipeline, counters, stage)
}

#[test]
fn test_scene_resources_are_reference_counted() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, counters, _) = trace_pipeline(&device, 2, 4);
    assert_eq!(counters.global_created.load(Ordering::SeqCst), 2);

    let forest = scene("forest");
    let desert = scene("desert");
    let a = pipeline.make_viewport(area(0), Camera::default(), forest.clone()).unwrap();
    let b = pipeline.make_viewport(area(0), Camera::default(), forest.clone()).unwrap();
    let c = pipeline.make_viewport(area(0), Camera::default(), desert.clone()).unwrap();

    assert_eq!(pipeline.num_scenes().unwrap(), 2);
    assert_eq!(counters.scene_created.load(Ordering::SeqCst), 4);
    assert_eq!(counters.viewport_created.load(Ordering::SeqCst), 6);

    drop(c);
    assert_eq!(pipeline.num_scenes().unwrap(), 1);
    drop(a);
    assert_eq!(pipeline.num_scenes().unwrap(), 1);
    assert!(Arc::ptr_eq(&b.scene().unwrap(), &forest));
    drop(b);
    assert_eq!(pipeline.num_scenes().unwrap(), 0);
}

#[test]
fn test_failed_viewport_is_rolled_back() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, counters, _) = trace_pipeline(&device, 2, 1);

    counters.fail_viewport.store(true, Ordering::SeqCst);
    let err = pipeline.make_viewport(area(0), Camera::default(), scene("broken")).unwrap_err();
    assert!(matches!(err, RenderError::Plugin { ref plugin, .. } if plugin == "trace"));
    assert_eq!(pipeline.num_viewports().unwrap(), 0);
    assert_eq!(pipeline.num_scenes().unwrap(), 0);

    counters.fail_viewport.store(false, Ordering::SeqCst);
    let viewport = pipeline.make_viewport(area(0), Camera::default(), scene("fixed")).unwrap();
    assert_eq!(viewport.index(), 0);
}

#[test]
fn test_draw_order_and_task_placement() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, counters, stage) = trace_pipeline(&device, 2, 4);

    let forest = scene("forest");
    let desert = scene("desert");
    let v0 = pipeline.make_viewport(area(0), Camera::default(), forest.clone()).unwrap();
    let v1 = pipeline.make_viewport(area(0), Camera::default(), desert).unwrap();
    let v2 = pipeline.make_viewport(area(0), Camera::default(), forest).unwrap();

    let frame = pipeline.draw(&[&v0, &v1, &v2]).unwrap();
    assert_eq!(
        *counters.log.lock().unwrap(),
        vec!["global", "scene:forest", "scene:desert", "viewport:0", "viewport:1", "viewport:2"]
    );

    let counts: Vec<_> = frame.draw_groups().iter().map(|group| group.task_queue().task_count(stage)).collect();
    assert_eq!(counts, vec![3, 2, 1]);
    assert_eq!(frame.frame_index(), 0);

    let next = pipeline.draw(&[&v1]).unwrap();
    assert_eq!(next.frame_index(), 1);
    assert_eq!(next.draw_groups()[0].task_queue().task_count(stage), 3);
}

#[test]
fn test_change_render_target_recreates_all_scopes() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, counters, _) = trace_pipeline(&device, 2, 2);
    let _viewport = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();

    let err = pipeline.change_render_target(render_target(&device, 3)).unwrap_err();
    assert!(matches!(err, RenderError::FrameCountExceeded { requested: 3, max: 2 }));
    assert_eq!(counters.global_created.load(Ordering::SeqCst), 2);

    let target = render_target(&device, 2);
    pipeline.change_render_target(target.clone()).unwrap();
    assert_eq!(counters.global_created.load(Ordering::SeqCst), 4);
    assert_eq!(counters.scene_created.load(Ordering::SeqCst), 4);
    assert_eq!(counters.viewport_created.load(Ordering::SeqCst), 4);
    assert!(Arc::ptr_eq(&pipeline.render_target().unwrap(), &target));

    let frame = pipeline.draw_all_viewports().unwrap();
    assert_eq!(frame.draw_groups()[0].frame_state().target_image, target.frames[0].image);
}

#[test]
fn test_failed_render_target_change_keeps_pipeline() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, counters, stage) = trace_pipeline(&device, 2, 2);
    let _viewport = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();
    let previous = pipeline.render_target().unwrap();

    counters.fail_second_global.store(true, Ordering::SeqCst);
    let err = pipeline.change_render_target(render_target(&device, 2)).unwrap_err();
    assert!(matches!(err, RenderError::Plugin { ref plugin, .. } if plugin == "trace"));
    assert!(Arc::ptr_eq(&pipeline.render_target().unwrap(), &previous));
    counters.fail_second_global.store(false, Ordering::SeqCst);

    // 两个 frame in flight 都还保留 global、scene、viewport 三份任务
    for frame_index in 0..2 {
        let frame = pipeline.draw_all_viewports().unwrap();
        assert_eq!(frame.frame_index(), frame_index);
        let group = &frame.draw_groups()[0];
        assert_eq!(group.task_queue().task_count(stage), 3);
        assert_eq!(group.frame_state().target_image, previous.frames[frame_index].image);
    }
    assert_eq!(*counters.log.lock().unwrap(), vec!["global", "scene:s", "viewport:0", "global", "scene:s", "viewport:0"]);
}

#[test]
fn test_failed_resize_keeps_viewport() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, counters, stage) = trace_pipeline(&device, 2, 1);
    let viewport = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();

    counters.fail_viewport.store(true, Ordering::SeqCst);
    assert!(viewport.resize(area(100)).is_err());
    assert!(viewport.set_scene(scene("other")).is_err());
    counters.fail_viewport.store(false, Ordering::SeqCst);

    assert_eq!(viewport.area().unwrap(), area(0));
    assert_eq!(viewport.scene().unwrap().name(), "s");
    assert_eq!(pipeline.num_scenes().unwrap(), 1);
    let frame = pipeline.draw_all_viewports().unwrap();
    assert_eq!(frame.draw_groups()[0].task_queue().task_count(stage), 3);
}

#[test]
fn test_viewport_setters() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, counters, _) = trace_pipeline(&device, 2, 2);
    let viewport = pipeline.make_viewport(area(0), Camera::default(), scene("old")).unwrap();

    let camera = Camera::look_at(glam::Vec3::new(0.0, 1.0, 5.0), glam::Vec3::ZERO, 1.0, 1.5, 0.1, 100.0);
    viewport.set_camera(camera).unwrap();
    assert_eq!(viewport.camera().unwrap(), camera);
    assert_eq!(counters.viewport_created.load(Ordering::SeqCst), 2);

    viewport.resize(area(100)).unwrap();
    assert_eq!(viewport.area().unwrap(), area(100));
    assert_eq!(counters.viewport_created.load(Ordering::SeqCst), 4);

    let new_scene = scene("new");
    viewport.set_scene(new_scene.clone()).unwrap();
    assert!(Arc::ptr_eq(&viewport.scene().unwrap(), &new_scene));
    assert_eq!(pipeline.num_scenes().unwrap(), 1);
    assert_eq!(counters.viewport_created.load(Ordering::SeqCst), 6);
}

// ============================================================================
// 构建期错误
// ============================================================================

struct DescriptorPlugin(&'static str);

impl RenderPlugin for DescriptorPlugin {
    fn name(&self) -> &str {
        "descriptor"
    }

    fn define_render_stages(&self, _graph: &mut RenderGraph) -> RenderResult<()> {
        Ok(())
    }

    fn define_resources(&self, config: &mut ResourceConfig) -> RenderResult<()> {
        config.define_descriptor(self.0)
    }
}

struct CyclePlugin([RenderStageId; 2]);

impl RenderPlugin for CyclePlugin {
    fn name(&self) -> &str {
        "cycle"
    }

    fn define_render_stages(&self, graph: &mut RenderGraph) -> RenderResult<()> {
        let [a, b] = self.0;
        graph.first(a)?;
        graph.after(a, b)?;
        graph.require(a, b)
    }
}

#[test]
fn test_build_errors() {
    init_test_log();
    let device = Arc::new(MockDevice::new());

    let duplicate = build(
        &device,
        1,
        1,
        vec![Arc::new(DescriptorPlugin("camera")), Arc::new(DescriptorPlugin("camera"))],
    );
    assert!(matches!(duplicate, Err(RenderError::DuplicateDescriptor(_))));

    let stages = [RenderStageId::new("x"), RenderStageId::new("y")];
    assert!(matches!(build(&device, 1, 1, vec![Arc::new(CyclePlugin(stages))]), Err(RenderError::StageCycle(_))));

    assert!(matches!(build(&device, 1, 0, vec![]), Err(RenderError::InvalidConfig(_))));
    assert!(matches!(build(&device, 0, 1, vec![]), Err(RenderError::InvalidConfig(_))));
}

// ============================================================================
// recorder
// ============================================================================

#[test]
fn test_command_slots_are_reused() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let (pipeline, _, _) = trace_pipeline(&device, 1, 2);
    let _a = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();
    let _b = pipeline.make_viewport(area(320), Camera::default(), scene("s")).unwrap();
    let mut recorder = recorder(&device, &pipeline);

    let first = recorder.record(pipeline.draw_all_viewports().unwrap()).unwrap();
    assert_eq!(first.submissions().len(), 2);
    let pools = device.stats().pools_created;
    assert_eq!(pools, 2);
    assert_eq!(recorder.slot_count(0), 2);

    let second = recorder.record(pipeline.draw_all_viewports().unwrap()).unwrap();
    assert_eq!(second.command_buffers(), first.command_buffers());
    assert_eq!(device.stats().pools_created, pools);
    assert_eq!(device.stats().pool_resets, 4);
}

#[test]
fn test_clear_then_present_across_viewports() {
    init_test_log();
    let device = Arc::new(MockDevice::new());
    let clear = RenderStageId::new("clear");
    let present = RenderStageId::new("present");
    let pipeline = build(
        &device,
        2,
        2,
        vec![
            Arc::new(ClearImagePlugin::new(clear, [0.0, 0.0, 0.0, 1.0])),
            Arc::new(PresentPlugin::new(present)),
        ],
    )
    .unwrap();
    let _left = pipeline.make_viewport(area(0), Camera::default(), scene("s")).unwrap();
    let _right = pipeline.make_viewport(area(320), Camera::default(), scene("s")).unwrap();

    let mut recorder = recorder(&device, &pipeline);
    let recorded = recorder.record(pipeline.draw_all_viewports().unwrap()).unwrap();
    let stages: Vec<_> = recorded.submissions().iter().map(|s| (s.viewport_index, s.stage)).collect();
    assert_eq!(stages, vec![(0, clear), (0, present), (1, present)]);

    let clear_cmd = recorded.submissions()[0].command_buffer.vk_handle();
    let commands = device.commands(clear_cmd);
    assert!(commands.iter().any(|c| matches!(c, MockCommand::ClearColorImage { .. })));

    let barriers = device.barriers(clear_cmd);
    let MockCommand::Barrier { images, .. } = barriers.last().unwrap() else {
        unreachable!()
    };
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(images[0].new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
}
