//! Render stage 的声明与排序
//!
//! plugin 在构建阶段向 [`RenderGraph`] 插入 stage 并声明顺序约束，
//! [`RenderGraph::compile`] 将其编译为线性的 [`RenderLayout`]。

pub mod graph;
pub mod layout;

pub use graph::{RenderGraph, StageInfo};
pub use layout::RenderLayout;
