use std::marker::PhantomData;
use std::sync::Arc;

use slotmap::SecondaryMap;

use crate::render_stage::RenderStageId;
use crate::task::execution_context::DeviceExecutionContext;

/// 一个可以录制的工作单元
///
/// `C` 是任务所在 scope 的上下文，比如 `GlobalUpdateContext`、`ViewportDrawContext`；
/// 设备级的任务使用 `()`
pub trait Task<C>: Send {
    fn record(&mut self, exec: &mut DeviceExecutionContext<'_>, ctx: &C);
}

/// 把闭包包装为 [`Task`]
pub struct FnTask<F>(pub F);

impl<C, F> Task<C> for FnTask<F>
where
    F: for<'a> FnMut(&mut DeviceExecutionContext<'a>, &C) + Send,
{
    fn record(&mut self, exec: &mut DeviceExecutionContext<'_>, ctx: &C) {
        (self.0)(exec, ctx)
    }
}

/// 按 render stage 分组的任务
pub struct TaskQueue<C> {
    tasks: SecondaryMap<RenderStageId, Vec<Box<dyn Task<C>>>>,
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self {
            tasks: SecondaryMap::new(),
        }
    }
}

impl<C: 'static> TaskQueue<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到 stage 的末尾
    pub fn spawn_task(&mut self, stage: RenderStageId, task: impl Task<C> + 'static) {
        self.push(stage, Box::new(task));
    }

    pub fn spawn<F>(&mut self, stage: RenderStageId, f: F)
    where
        F: for<'a> FnMut(&mut DeviceExecutionContext<'a>, &C) + Send + 'static,
    {
        self.push(stage, Box::new(FnTask(f)));
    }

    fn push(&mut self, stage: RenderStageId, task: Box<dyn Task<C>>) {
        match self.tasks.entry(stage) {
            Some(entry) => entry.or_default().push(task),
            None => log::error!("Drop task for invalid render stage {:?}", stage),
        }
    }

    /// 按插入顺序遍历某个 stage 的任务
    pub fn iter_tasks(&mut self, stage: RenderStageId) -> impl Iterator<Item = &mut Box<dyn Task<C>>> {
        self.tasks.get_mut(stage).into_iter().flatten()
    }

    /// 取走某个 stage 的全部任务，stage 本身保留
    pub fn take_tasks(&mut self, stage: RenderStageId) -> Vec<Box<dyn Task<C>>> {
        self.tasks.get_mut(stage).map(std::mem::take).unwrap_or_default()
    }

    pub fn task_count(&self, stage: RenderStageId) -> usize {
        self.tasks.get(stage).map_or(0, Vec::len)
    }

    /// 出现过的所有 stage，包括任务已经被取走的
    pub fn stages(&self) -> impl Iterator<Item = RenderStageId> + '_ {
        self.tasks.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.values().all(Vec::is_empty)
    }

    /// 把所有任务转移到另一个 context 的 queue 中
    ///
    /// 每个非空的 stage 被打包为 `dst` 中同一 stage 的一个任务，执行时用 `builder`
    /// 从 `dst` 的 context 构造出本 queue 的 context，再依次执行原来的任务。
    /// 转移之后本 queue 的各个 stage 都是空的。
    pub fn move_tasks<O, B>(&mut self, builder: B, dst: &mut TaskQueue<O>)
    where
        O: 'static,
        B: Fn(&O) -> C + Send + Sync + 'static,
    {
        let builder = Arc::new(builder);
        for (stage, tasks) in self.tasks.iter_mut() {
            if tasks.is_empty() {
                continue;
            }
            dst.spawn_task(
                stage,
                ContextAdapter {
                    tasks: std::mem::take(tasks),
                    builder: builder.clone(),
                    _marker: PhantomData,
                },
            );
        }
    }
}

/// [`TaskQueue::move_tasks`] 产生的任务
struct ContextAdapter<C, O, B> {
    tasks: Vec<Box<dyn Task<C>>>,
    builder: Arc<B>,
    _marker: PhantomData<fn(&O)>,
}

impl<C, O, B> Task<O> for ContextAdapter<C, O, B>
where
    B: Fn(&O) -> C + Send + Sync,
{
    fn record(&mut self, exec: &mut DeviceExecutionContext<'_>, ctx: &O) {
        let inner = (self.builder)(ctx);
        for task in &mut self.tasks {
            task.record(exec, &inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ash::vk;
    use vesta_gfx::commands::command_buffer::GfxCommandBuffer;
    use vesta_gfx::commands::command_pool::GfxCommandPool;
    use vesta_gfx::mock_device::MockDevice;

    use super::*;
    use crate::dependency::DependencyRegion;
    use crate::resource::render_pass::FrameRenderState;

    struct Recorder {
        _device: Arc<MockDevice>,
        _pool: GfxCommandPool,
        cmd: GfxCommandBuffer,
        frame_state: FrameRenderState,
    }

    impl Recorder {
        fn new() -> Self {
            let device = Arc::new(MockDevice::new());
            let pool = GfxCommandPool::new(device.clone(), 0, vk::CommandPoolCreateFlags::TRANSIENT, "pool").unwrap();
            let cmd = GfxCommandBuffer::new(&pool, "cmd").unwrap();
            Self {
                _device: device,
                _pool: pool,
                cmd,
                frame_state: FrameRenderState {
                    frame_index: 0,
                    viewport_index: 0,
                    area: vk::Rect2D::default(),
                    target_image: vk::Image::null(),
                    target_view: vk::ImageView::null(),
                    target_extent: vk::Extent2D::default(),
                },
            }
        }

        fn run<C: 'static>(&self, queue: &mut TaskQueue<C>, stage: RenderStageId, ctx: &C) {
            let mut region = DependencyRegion::new();
            let mut exec = DeviceExecutionContext::new(&self.cmd, &mut region, stage, &[], &self.frame_state);
            for task in queue.iter_tasks(stage) {
                task.record(&mut exec, ctx);
            }
        }
    }

    fn logging_task(log: &Arc<Mutex<Vec<String>>>, label: String) -> impl for<'a> FnMut(&mut DeviceExecutionContext<'a>, &u32) + Send + 'static {
        let log = log.clone();
        move |_exec, ctx| log.lock().unwrap().push(format!("{label}:{ctx}"))
    }

    #[test]
    fn test_tasks_run_in_insertion_order() {
        let recorder = Recorder::new();
        let stage = RenderStageId::new("order");

        for n in [0usize, 1, 7] {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut queue = TaskQueue::<u32>::new();
            for i in 0..n {
                queue.spawn(stage, logging_task(&log, i.to_string()));
            }
            assert_eq!(queue.task_count(stage), n);

            recorder.run(&mut queue, stage, &3);
            let expected: Vec<_> = (0..n).map(|i| format!("{i}:3")).collect();
            assert_eq!(*log.lock().unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_stage_is_empty() {
        let mut queue = TaskQueue::<()>::new();
        assert_eq!(queue.iter_tasks(RenderStageId::new("empty")).count(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_move_tasks_preserves_order_and_empties_source() {
        let recorder = Recorder::new();
        let shadow = RenderStageId::new("shadow");
        let lighting = RenderStageId::new("lighting");
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut src = TaskQueue::<u32>::new();
        src.spawn(shadow, logging_task(&log, "s0".to_string()));
        src.spawn(shadow, logging_task(&log, "s1".to_string()));
        src.spawn(lighting, logging_task(&log, "l0".to_string()));

        let mut dst = TaskQueue::<()>::new();
        dst.spawn(shadow, |_exec: &mut DeviceExecutionContext<'_>, _ctx: &()| {});
        src.move_tasks(|_: &()| 42u32, &mut dst);

        assert!(src.is_empty());
        assert_eq!(src.stages().count(), 2);
        assert_eq!(dst.task_count(shadow), 2);
        assert_eq!(dst.task_count(lighting), 1);

        recorder.run(&mut dst, shadow, &());
        recorder.run(&mut dst, lighting, &());
        assert_eq!(*log.lock().unwrap(), vec!["s0:42", "s1:42", "l0:42"]);
    }

    #[test]
    fn test_take_tasks_keeps_stage() {
        let stage = RenderStageId::new("take");
        let mut queue = TaskQueue::<()>::new();
        queue.spawn(stage, |_exec: &mut DeviceExecutionContext<'_>, _ctx: &()| {});

        assert_eq!(queue.take_tasks(stage).len(), 1);
        assert_eq!(queue.task_count(stage), 0);
        assert_eq!(queue.stages().collect::<Vec<_>>(), vec![stage]);
    }
}
