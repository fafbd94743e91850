//! Vesta 渲染管线核心
//!
//! 把"渲染什么"（scene、plugin）和"如何调度 GPU 命令"解耦：
//!
//! - [`render_graph`]：render stage 的声明与排序，编译为线性的 [`RenderLayout`](render_graph::RenderLayout)
//! - [`resource`]：global / scene / viewport 分层的资源存储，子层可以覆盖父层
//! - [`dependency`]：根据声明的读写访问自动生成 barrier
//! - [`task`]：按 render stage 分组的录制任务
//! - [`plugin`]：扩展点，plugin 在各个 scope 创建资源并产生任务
//! - [`pipeline`]：维护 frames in flight 的各份实例以及 viewport 的生命周期
//! - [`recorder`]：按 (viewport, stage) 并行录制，再按顺序拼接 barrier

pub mod dependency;
pub mod errors;
pub mod frame;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod recorder;
pub mod render_graph;
pub mod render_stage;
pub mod resource;
pub mod task;

pub use errors::{RenderError, RenderResult};
pub use render_stage::RenderStageId;
