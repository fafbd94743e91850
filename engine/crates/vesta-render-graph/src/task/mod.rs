//! 录制任务
//!
//! 任务按 render stage 分组存放在 [`TaskQueue`] 中，同一 stage 内按插入顺序执行。
//! 不同 scope 的 queue 通过 [`TaskQueue::move_tasks`] 合并到 frame 的设备级 queue 中。

pub mod execution_context;
pub mod task_queue;

pub use execution_context::DeviceExecutionContext;
pub use task_queue::{FnTask, Task, TaskQueue};
