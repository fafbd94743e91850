use std::sync::Arc;

use ash::vk;
use rayon::prelude::*;
use vesta_gfx::commands::command_buffer::GfxCommandBuffer;
use vesta_gfx::commands::command_pool::GfxCommandPool;
use vesta_gfx::device::GfxDevice;

use crate::dependency::DependencyRegion;
use crate::errors::{RenderError, RenderResult};
use crate::frame::Frame;
use crate::render_stage::RenderStageId;
use crate::resource::render_pass::{FrameRenderState, RenderPass};
use crate::task::{DeviceExecutionContext, Task};

pub struct CommandRecorderDesc {
    /// frames in flight 的数量，每一帧各用一组 command pool
    pub num_frames: usize,
    /// 录制线程数，0 表示使用 rayon 的默认值
    pub worker_threads: usize,
}

/// 一个 command pool 加上从中分配的一个 primary command buffer
struct CommandSlot {
    cmd: GfxCommandBuffer,
    pool: GfxCommandPool,
}

/// 一个 (viewport, stage) 的录制任务
struct RecordJob {
    viewport_index: usize,
    stage: RenderStageId,
    tasks: Vec<Box<dyn Task<()>>>,
    render_passes: Vec<Arc<dyn RenderPass>>,
    frame_state: FrameRenderState,
    cmd: GfxCommandBuffer,
}

/// 录制完成但尚未 end 的 command buffer
struct RecordedStage {
    viewport_index: usize,
    stage: RenderStageId,
    cmd: GfxCommandBuffer,
    region: DependencyRegion,
}

/// 按提交顺序排列的一个 command buffer
#[derive(Debug)]
pub struct RecordedSubmission {
    pub viewport_index: usize,
    pub stage: RenderStageId,
    pub command_buffer: GfxCommandBuffer,
    /// 录制在该 command buffer 末尾的 barrier 数量
    pub image_barrier_count: usize,
    pub buffer_barrier_count: usize,
}

#[derive(Debug)]
pub struct RecordedFrame {
    frame_index: usize,
    frame_name: String,
    submissions: Vec<RecordedSubmission>,
}

impl RecordedFrame {
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    #[inline]
    pub fn frame_name(&self) -> &str {
        &self.frame_name
    }

    /// 先按 viewport，再按 stage 排列
    #[inline]
    pub fn submissions(&self) -> &[RecordedSubmission] {
        &self.submissions
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// 可以一次性提交的 command buffer 列表
    pub fn command_buffers(&self) -> Vec<vk::CommandBuffer> {
        self.submissions.iter().map(|s| s.command_buffer.vk_handle()).collect()
    }
}

/// 把 [`Frame`] 录制为一组 command buffer
///
/// 每个 (viewport, stage) 在线程池上独立录制到自己的 command buffer 中；
/// 全部完成后按提交顺序依次比较相邻两个单元的 [`DependencyRegion`]，
/// 把需要的 barrier 录制到前一个 command buffer 的末尾。
pub struct CommandRecorder {
    device: Arc<dyn GfxDevice>,
    thread_pool: rayon::ThreadPool,
    /// 每个 frame in flight 一组，只增不减
    frames: Vec<Vec<CommandSlot>>,
}

// new & init
impl CommandRecorder {
    pub fn new(device: Arc<dyn GfxDevice>, desc: &CommandRecorderDesc) -> RenderResult<Self> {
        if desc.num_frames == 0 {
            return Err(RenderError::InvalidConfig("command recorder needs at least one frame".to_string()));
        }
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(desc.worker_threads)
            .thread_name(|index| format!("Command-Recorder-{}", index))
            .build()
            .map_err(|e| RenderError::InvalidConfig(format!("failed to create recording thread pool: {e}")))?;

        Ok(Self {
            device,
            thread_pool,
            frames: (0..desc.num_frames).map(|_| Vec::new()).collect(),
        })
    }

    /// 保证至少有 `count` 个 slot，并把它们全部 reset
    fn prepare_slots(&mut self, frame_index: usize, count: usize) -> RenderResult<&[CommandSlot]> {
        let queue_family = self.device.graphics_queue_family();
        let slots = &mut self.frames[frame_index];
        let existing = slots.len();

        while slots.len() < count {
            let name = format!("recorder-{}-{}", frame_index, slots.len());
            let pool = GfxCommandPool::new(self.device.clone(), queue_family, vk::CommandPoolCreateFlags::TRANSIENT, &name)?;
            let cmd = GfxCommandBuffer::new(&pool, &name)?;
            slots.push(CommandSlot { cmd, pool });
        }
        if slots.len() > existing {
            log::debug!("Command slots of frame {} grown from {} to {}", frame_index, existing, slots.len());
        }

        for slot in slots.iter() {
            slot.pool.reset_all_buffers()?;
        }
        Ok(slots.as_slice())
    }

    /// 已经创建的 command slot 数量
    pub fn slot_count(&self, frame_index: usize) -> usize {
        self.frames.get(frame_index).map_or(0, Vec::len)
    }
}

// 录制
impl CommandRecorder {
    pub fn record(&mut self, mut frame: Frame) -> RenderResult<RecordedFrame> {
        let frame_index = frame.frame_index % self.frames.len();

        // 1. 按 viewport、stage 的顺序收集录制任务
        let mut pending = Vec::new();
        for group in &mut frame.draw_groups {
            for info in group.layout.stages() {
                let tasks = group.task_queue.take_tasks(info.stage);
                if tasks.is_empty() {
                    continue;
                }
                let mut render_passes = info.render_passes.clone();
                render_passes.extend(group.resources.dynamic_passes(info.stage));
                pending.push((group.viewport_index, info.stage, tasks, render_passes, group.frame_state));
            }

            for stage in group.task_queue.stages() {
                let count = group.task_queue.task_count(stage);
                if count > 0 {
                    log::warn!("Drop {} tasks on stage {} which is not in the render layout", count, stage);
                }
            }
        }

        // 2. 分配 command buffer
        let slots = self.prepare_slots(frame_index, pending.len())?;
        let jobs: Vec<RecordJob> = pending
            .into_iter()
            .zip(slots)
            .map(|((viewport_index, stage, tasks, render_passes, frame_state), slot)| RecordJob {
                viewport_index,
                stage,
                tasks,
                render_passes,
                frame_state,
                cmd: slot.cmd.clone(),
            })
            .collect();

        // 3. 并行录制
        let mut recorded: Vec<RecordedStage> =
            self.thread_pool.install(|| jobs.into_par_iter().map(Self::record_job).collect::<RenderResult<Vec<_>>>())?;

        // 4. 相邻两个单元之间插入 barrier
        let mut barrier_counts = vec![(0, 0); recorded.len()];
        for i in 1..recorded.len() {
            let (head, tail) = recorded.split_at_mut(i);
            let (from, to) = (&head[i - 1], &mut tail[0]);

            let barriers = DependencyRegion::gen_barriers(&from.region, &mut to.region);
            if barriers.has_barriers() {
                if log::log_enabled!(log::Level::Debug) {
                    barriers.log(&format!(
                        "{} viewport {} {} -> viewport {} {}",
                        frame.frame_name, from.viewport_index, from.stage, to.viewport_index, to.stage
                    ));
                }
                barriers.record(&from.cmd);
                barrier_counts[i - 1] = (barriers.image_barrier_count(), barriers.buffer_barrier_count());
            }
        }

        // 5. 结束录制
        for stage in &recorded {
            stage.cmd.end()?;
        }

        let submissions = recorded
            .into_iter()
            .zip(barrier_counts)
            .map(|(stage, (image_barrier_count, buffer_barrier_count))| RecordedSubmission {
                viewport_index: stage.viewport_index,
                stage: stage.stage,
                command_buffer: stage.cmd,
                image_barrier_count,
                buffer_barrier_count,
            })
            .collect();

        Ok(RecordedFrame {
            frame_index: frame.frame_index,
            frame_name: frame.frame_name,
            submissions,
        })
    }

    fn record_job(job: RecordJob) -> RenderResult<RecordedStage> {
        let RecordJob {
            viewport_index,
            stage,
            mut tasks,
            render_passes,
            frame_state,
            cmd,
        } = job;

        cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, &format!("{}#{}", stage.name(), viewport_index))?;

        let mut region = DependencyRegion::new();
        let mut exec = DeviceExecutionContext::new(&cmd, &mut region, stage, &render_passes, &frame_state);
        for task in &mut tasks {
            task.record(&mut exec, &());
        }
        drop(exec);

        Ok(RecordedStage {
            viewport_index,
            stage,
            cmd,
            region,
        })
    }
}
