//! Vulkan 命令录制层
//!
//! 在 [`GfxDevice`](device::GfxDevice) 之上封装 command pool、command buffer、
//! barrier 和 pipeline。所有命令都经过 `GfxDevice` 发出，因此既可以接到真实的
//! `ash::Device`（[`AshDevice`](device::AshDevice)），也可以接到测试用的
//! `MockDevice`（需要开启 `mock` feature）。

pub mod basic;
pub mod commands;
pub mod device;
#[cfg(any(test, feature = "mock"))]
pub mod mock_device;
pub mod pipelines;
