use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use itertools::Itertools;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{RenderError, RenderResult};
use crate::render_graph::layout::RenderLayout;
use crate::render_stage::RenderStageId;
use crate::resource::render_pass::RenderPass;

/// 一个 stage 及挂在它上面的静态 render pass
#[derive(Clone)]
pub struct StageInfo {
    pub stage: RenderStageId,
    pub render_passes: Vec<Arc<dyn RenderPass>>,
    /// 执行前必须完成的 stage
    pub wait_dependencies: Vec<RenderStageId>,
}

impl StageInfo {
    fn new(stage: RenderStageId) -> Self {
        Self {
            stage,
            render_passes: Vec::new(),
            wait_dependencies: Vec::new(),
        }
    }
}

impl std::fmt::Debug for StageInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageInfo")
            .field("stage", &self.stage.name())
            .field("render_passes", &self.render_passes.iter().map(|p| p.name().as_str()).collect_vec())
            .field("wait_dependencies", &self.wait_dependencies.iter().map(|s| s.name()).collect_vec())
            .finish()
    }
}

/// 构建阶段的 stage 列表
///
/// 列表顺序就是插入时的相对位置；`before` / `after` / `require` 额外记录顺序约束。
/// 编译时在满足所有约束的前提下尽量保持列表顺序。
#[derive(Clone, Debug, Default)]
pub struct RenderGraph {
    stages: Vec<StageInfo>,
    /// (先执行, 后执行)
    constraints: Vec<(RenderStageId, RenderStageId)>,
}

// 插入 stage
impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_absent(&self, stage: RenderStageId) -> RenderResult<()> {
        if self.contains(stage) {
            return Err(RenderError::StageAlreadyDefined(stage));
        }
        Ok(())
    }

    fn anchor_position(&self, anchor: RenderStageId) -> RenderResult<usize> {
        self.position(anchor).ok_or(RenderError::AnchorStageMissing(anchor))
    }

    /// 插入到最前面
    pub fn first(&mut self, stage: RenderStageId) -> RenderResult<()> {
        self.ensure_absent(stage)?;
        self.stages.insert(0, StageInfo::new(stage));
        Ok(())
    }

    /// 追加到最后面
    pub fn last(&mut self, stage: RenderStageId) -> RenderResult<()> {
        self.ensure_absent(stage)?;
        self.stages.push(StageInfo::new(stage));
        Ok(())
    }

    /// 紧挨着插入到 `next` 之前，并要求 `new_stage` 先于 `next` 执行
    pub fn before(&mut self, next: RenderStageId, new_stage: RenderStageId) -> RenderResult<()> {
        let pos = self.anchor_position(next)?;
        self.ensure_absent(new_stage)?;
        self.stages.insert(pos, StageInfo::new(new_stage));
        self.constraints.push((new_stage, next));
        Ok(())
    }

    /// 紧挨着插入到 `prev` 之后，并要求 `prev` 先于 `new_stage` 执行
    pub fn after(&mut self, prev: RenderStageId, new_stage: RenderStageId) -> RenderResult<()> {
        let pos = self.anchor_position(prev)?;
        self.ensure_absent(new_stage)?;
        self.stages.insert(pos + 1, StageInfo::new(new_stage));
        self.constraints.push((prev, new_stage));
        Ok(())
    }

    /// `stage` 必须等 `required` 执行完
    ///
    /// `required` 可以稍后再插入，编译时还不存在则报错
    pub fn require(&mut self, stage: RenderStageId, required: RenderStageId) -> RenderResult<()> {
        let info = self.stage_info_mut(stage)?;
        if !info.wait_dependencies.contains(&required) {
            info.wait_dependencies.push(required);
        }
        self.constraints.push((required, stage));
        Ok(())
    }
}

// render pass
impl RenderGraph {
    pub fn add_pass(&mut self, stage: RenderStageId, render_pass: Arc<dyn RenderPass>) -> RenderResult<()> {
        self.stage_info_mut(stage)?.render_passes.push(render_pass);
        Ok(())
    }

    /// 不存在时什么都不做
    pub fn remove_pass(&mut self, stage: RenderStageId, render_pass: &Arc<dyn RenderPass>) {
        if let Ok(info) = self.stage_info_mut(stage) {
            info.render_passes.retain(|p| !std::ptr::addr_eq(Arc::as_ptr(p), Arc::as_ptr(render_pass)));
        }
    }
}

// getters
impl RenderGraph {
    fn position(&self, stage: RenderStageId) -> Option<usize> {
        self.stages.iter().position(|info| info.stage == stage)
    }

    fn stage_info_mut(&mut self, stage: RenderStageId) -> RenderResult<&mut StageInfo> {
        self.stages.iter_mut().find(|info| info.stage == stage).ok_or(RenderError::StageNotFound(stage))
    }

    #[inline]
    pub fn contains(&self, stage: RenderStageId) -> bool {
        self.position(stage).is_some()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.stages.len()
    }

    /// 按插入位置遍历
    pub fn stages(&self) -> impl Iterator<Item = &StageInfo> {
        self.stages.iter()
    }
}

// 编译
impl RenderGraph {
    /// 编译为线性的执行顺序
    ///
    /// 满足所有顺序约束；没有约束的 stage 之间保持列表中的相对顺序。
    /// 约束存在环时返回 [`RenderError::StageCycle`]
    pub fn compile(&self) -> RenderResult<RenderLayout> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.stages.len(), self.constraints.len());
        let nodes: Vec<NodeIndex> = (0..self.stages.len()).map(|i| graph.add_node(i)).collect();

        for &(before, after) in &self.constraints {
            let from = self.position(before).ok_or(RenderError::StageNotFound(before))?;
            let to = self.position(after).ok_or(RenderError::StageNotFound(after))?;
            graph.update_edge(nodes[from], nodes[to], ());
        }

        if let Err(cycle) = toposort(&graph, None) {
            let stage = self.stages[graph[cycle.node_id()]].stage;
            return Err(RenderError::StageCycle(stage));
        }

        // Kahn 算法，入度为 0 的节点中总是先取列表位置最小的
        let mut in_degree: Vec<usize> =
            nodes.iter().map(|&n| graph.neighbors_directed(n, Direction::Incoming).count()).collect();
        let mut ready: BinaryHeap<Reverse<usize>> =
            in_degree.iter().enumerate().filter(|(_, d)| **d == 0).map(|(i, _)| Reverse(i)).collect();

        let mut order = Vec::with_capacity(self.stages.len());
        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);
            for next in graph.neighbors_directed(nodes[index], Direction::Outgoing) {
                let next = graph[next];
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        Ok(RenderLayout::new(order.into_iter().map(|i| self.stages[i].clone()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;
    use vesta_gfx::commands::command_buffer::GfxCommandBuffer;

    use super::*;
    use crate::resource::names::RenderPassName;
    use crate::resource::render_pass::FrameRenderState;

    struct DummyPass(RenderPassName);

    impl RenderPass for DummyPass {
        fn name(&self) -> &RenderPassName {
            &self.0
        }

        fn begin(&self, _cmd: &GfxCommandBuffer, _contents: vk::SubpassContents, _frame: &FrameRenderState) {}

        fn end(&self, _cmd: &GfxCommandBuffer) {}
    }

    fn stages<const N: usize>(names: [&str; N]) -> [RenderStageId; N] {
        names.map(RenderStageId::new)
    }

    fn order(layout: &RenderLayout) -> Vec<RenderStageId> {
        layout.stages().iter().map(|info| info.stage).collect()
    }

    #[test]
    fn test_adjacent_insertion() {
        let [shadow, gbuffer, lighting, post] = stages(["shadow", "gbuffer", "lighting", "post"]);
        let mut graph = RenderGraph::new();
        graph.first(gbuffer).unwrap();
        graph.last(post).unwrap();
        graph.after(gbuffer, lighting).unwrap();
        graph.before(gbuffer, shadow).unwrap();

        assert_eq!(graph.size(), 4);
        assert_eq!(order(&graph.compile().unwrap()), vec![shadow, gbuffer, lighting, post]);
    }

    #[test]
    fn test_insertion_errors() {
        let [a, b, missing] = stages(["a", "b", "missing"]);
        let mut graph = RenderGraph::new();
        graph.first(a).unwrap();

        assert!(matches!(graph.first(a), Err(RenderError::StageAlreadyDefined(s)) if s == a));
        assert!(matches!(graph.after(missing, b), Err(RenderError::AnchorStageMissing(s)) if s == missing));
        assert!(matches!(graph.before(a, a), Err(RenderError::StageAlreadyDefined(_))));
        assert!(matches!(graph.require(missing, a), Err(RenderError::StageNotFound(_))));
        assert!(!graph.contains(b));
    }

    #[test]
    fn test_require_reorders() {
        let [ui, scene] = stages(["ui", "scene"]);
        let mut graph = RenderGraph::new();
        graph.first(ui).unwrap();
        graph.last(scene).unwrap();
        graph.require(ui, scene).unwrap();

        let layout = graph.compile().unwrap();
        assert_eq!(order(&layout), vec![scene, ui]);
        assert_eq!(layout.stage_info(ui).unwrap().wait_dependencies, vec![scene]);
    }

    #[test]
    fn test_cycle_detected() {
        let [a, b] = stages(["cycle-a", "cycle-b"]);
        let mut graph = RenderGraph::new();
        graph.first(a).unwrap();
        graph.after(a, b).unwrap();
        graph.require(a, b).unwrap();

        assert!(matches!(graph.compile(), Err(RenderError::StageCycle(_))));
    }

    #[test]
    fn test_missing_requirement_fails_compile() {
        let [a, later] = stages(["a", "never-added"]);
        let mut graph = RenderGraph::new();
        graph.first(a).unwrap();
        graph.require(a, later).unwrap();

        assert!(matches!(graph.compile(), Err(RenderError::StageNotFound(s)) if s == later));
    }

    #[test]
    fn test_passes_attach_and_detach() {
        let [a, missing] = stages(["passes", "missing"]);
        let mut graph = RenderGraph::new();
        graph.first(a).unwrap();

        let pass: Arc<dyn RenderPass> = Arc::new(DummyPass("forward".into()));
        assert!(matches!(graph.add_pass(missing, pass.clone()), Err(RenderError::StageNotFound(_))));
        graph.add_pass(a, pass.clone()).unwrap();

        let compiled = graph.clone().compile().unwrap();
        assert_eq!(compiled.stage_info(a).unwrap().render_passes.len(), 1);

        graph.remove_pass(a, &pass);
        graph.remove_pass(a, &pass);
        assert!(graph.stages().all(|info| info.render_passes.is_empty()));
    }
}
