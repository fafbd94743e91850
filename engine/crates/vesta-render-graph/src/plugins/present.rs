use crate::dependency::{ImageAccess, ImageState};
use crate::errors::RenderResult;
use crate::plugin::context::{ViewportBuildContext, ViewportDrawContext};
use crate::plugin::render_plugin::{RenderPlugin, ViewportResources};
use crate::render_graph::RenderGraph;
use crate::render_stage::RenderStageId;
use crate::task::TaskQueue;

/// 把 render target 转换为可以呈现的 layout
///
/// stage 不存在时放到最后。任务本身不录制命令，只声明需要 `PRESENT` 状态，
/// 之前最后一次写入到这里的 barrier 会自动生成。
pub struct PresentPlugin {
    stage: RenderStageId,
}

impl PresentPlugin {
    pub fn new(stage: RenderStageId) -> Self {
        Self { stage }
    }

    #[inline]
    pub fn stage(&self) -> RenderStageId {
        self.stage
    }
}

impl RenderPlugin for PresentPlugin {
    fn name(&self) -> &str {
        "present"
    }

    fn define_render_stages(&self, graph: &mut RenderGraph) -> RenderResult<()> {
        if !graph.contains(self.stage) {
            graph.last(self.stage)?;
        }
        Ok(())
    }

    fn create_viewport_resources(
        &self,
        _ctx: &ViewportBuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn ViewportResources>>> {
        Ok(Some(Box::new(PresentResources { stage: self.stage })))
    }
}

struct PresentResources {
    stage: RenderStageId,
}

impl ViewportResources for PresentResources {
    fn create_tasks(&mut self, queue: &mut TaskQueue<ViewportDrawContext>, _ctx: &ViewportDrawContext) {
        queue.spawn(self.stage, |exec, ctx| {
            if let Some(target) = ctx.target_frame() {
                exec.consume(ImageAccess::new(target.image, ImageState::PRESENT));
            }
        });
    }
}
