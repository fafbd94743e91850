use itertools::Itertools;
use slotmap::SecondaryMap;

use crate::render_graph::graph::StageInfo;
use crate::render_stage::RenderStageId;

/// 编译后的 stage 执行顺序，构建完成后不再变化
#[derive(Clone, Debug, Default)]
pub struct RenderLayout {
    stages: Vec<StageInfo>,
    positions: SecondaryMap<RenderStageId, usize>,
}

impl RenderLayout {
    pub(crate) fn new(stages: Vec<StageInfo>) -> Self {
        let mut positions = SecondaryMap::new();
        for (index, info) in stages.iter().enumerate() {
            positions.insert(info.stage, index);
        }
        Self { stages, positions }
    }

    #[inline]
    pub fn stages(&self) -> &[StageInfo] {
        &self.stages
    }

    #[inline]
    pub fn position(&self, stage: RenderStageId) -> Option<usize> {
        self.positions.get(stage).copied()
    }

    pub fn stage_info(&self, stage: RenderStageId) -> Option<&StageInfo> {
        self.position(stage).map(|index| &self.stages[index])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 打印执行计划（调试用）
    pub fn print_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderLayout Execution Plan                         ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Total Stages: {}  |  Execution Order: [{}]",
            self.stages.len(),
            self.stages.iter().map(|info| info.stage.name()).join(" → ")
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (order, info) in self.stages.iter().enumerate() {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] Stage: {}", order + 1, self.stages.len(), info.stage);
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            if !info.render_passes.is_empty() {
                log::info!("│ Render Passes:");
                for pass in &info.render_passes {
                    log::info!("│   🎨 {} ({} subpasses)", pass.name(), pass.num_subpasses());
                }
            }

            if !info.wait_dependencies.is_empty() {
                log::info!("│ Waits For:");
                for dep in &info.wait_dependencies {
                    log::info!("│   ⏳ {}", dep);
                }
            }

            if info.render_passes.is_empty() && info.wait_dependencies.is_empty() {
                log::info!("│ (no static passes)");
            }
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }
    }
}
