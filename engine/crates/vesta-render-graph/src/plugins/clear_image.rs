use ash::vk;
use vesta_gfx::basic::color::LabelColor;
use vesta_gfx::commands::barrier::{COLOR_ALL_SUBRESOURCES, GfxImageBarrier};

use crate::dependency::{ImageAccess, ImageState};
use crate::errors::RenderResult;
use crate::plugin::context::{GlobalUpdateContext, PluginBuildContext};
use crate::plugin::render_plugin::{GlobalResources, RenderPlugin};
use crate::render_graph::RenderGraph;
use crate::render_stage::RenderStageId;
use crate::task::TaskQueue;

/// 每帧开始时把整个 render target 清为指定颜色
///
/// stage 不存在时放到最前面。清除一次作用于整张图像，因此属于 global scope，
/// 任务会放在本帧第一个 viewport 中。清除之后 render target 处于 `TRANSFER_DST`，
/// 后续的 stage 声明自己需要的状态即可得到对应的 barrier。
pub struct ClearImagePlugin {
    stage: RenderStageId,
    color: vk::ClearColorValue,
}

impl ClearImagePlugin {
    pub fn new(stage: RenderStageId, color: [f32; 4]) -> Self {
        Self {
            stage,
            color: vk::ClearColorValue { float32: color },
        }
    }

    #[inline]
    pub fn stage(&self) -> RenderStageId {
        self.stage
    }
}

impl RenderPlugin for ClearImagePlugin {
    fn name(&self) -> &str {
        "clear-image"
    }

    fn define_render_stages(&self, graph: &mut RenderGraph) -> RenderResult<()> {
        if !graph.contains(self.stage) {
            graph.first(self.stage)?;
        }
        Ok(())
    }

    fn create_global_resources(&self, _ctx: &PluginBuildContext<'_>) -> anyhow::Result<Option<Box<dyn GlobalResources>>> {
        Ok(Some(Box::new(ClearImageResources {
            stage: self.stage,
            color: self.color,
        })))
    }
}

struct ClearImageResources {
    stage: RenderStageId,
    color: vk::ClearColorValue,
}

impl GlobalResources for ClearImageResources {
    fn create_tasks(&mut self, queue: &mut TaskQueue<GlobalUpdateContext>) {
        let color = self.color;
        queue.spawn(self.stage, move |exec, ctx| {
            let Some(target) = ctx.target_frame() else {
                return;
            };
            let range = COLOR_ALL_SUBRESOURCES;

            let cmd = exec.cmd();
            cmd.begin_label("clear-image", LabelColor::COLOR_PASS);
            // 清除前的内容不需要保留
            cmd.image_memory_barrier(&[GfxImageBarrier::new(target.image)
                .layouts(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE)
                .dst(ImageState::TRANSFER_DST.stage, ImageState::TRANSFER_DST.access)]);
            cmd.cmd_clear_color_image(target.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &color, &[range]);
            cmd.end_label();

            exec.produce(ImageAccess::new(target.image, ImageState::TRANSFER_DST).with_range(range));
        });
    }
}
