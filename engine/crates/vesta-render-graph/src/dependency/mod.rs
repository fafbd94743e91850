//! 资源依赖推导
//!
//! 每个录制单元（一个 viewport 的一个 stage）都有自己的 [`DependencyRegion`]，
//! 记录它读取（consume）和写入（produce）了哪些资源。录制结束后，相邻的两个
//! region 通过 [`DependencyRegion::gen_barriers`] 生成它们之间需要的 barrier。

pub mod barrier;
pub mod range;
pub mod region;
pub mod resource_state;

pub use barrier::{BufferBarrierDesc, ImageBarrierDesc, StageBarriers};
pub use region::{BufferAccess, DependencyRegion, ImageAccess, ResourceAccess};
pub use resource_state::{BufferState, ImageState};
