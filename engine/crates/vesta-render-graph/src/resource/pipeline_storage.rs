use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use vesta_gfx::device::GfxDevice;
use vesta_gfx::pipelines::pipeline::GfxPipeline;

use crate::errors::{RenderError, RenderResult};
use crate::resource::names::PipelineName;
use crate::resource::storage::ResourceStorage;

/// 创建 pipeline 时可用的信息
pub struct PipelineFactoryContext<'a> {
    pub name: &'a PipelineName,
    pub device: &'a Arc<dyn GfxDevice>,
    /// 定义该 pipeline 的那一层 storage，可以从中查找 descriptor layout
    pub storage: &'a ResourceStorage,
}

/// 延迟创建 pipeline 的工厂，第一次被查找时才会调用
pub trait PipelineFactory: Send + Sync {
    fn create_pipeline(&self, ctx: &PipelineFactoryContext<'_>) -> anyhow::Result<GfxPipeline>;
}

impl<F> PipelineFactory for F
where
    F: Fn(&PipelineFactoryContext<'_>) -> anyhow::Result<GfxPipeline> + Send + Sync,
{
    fn create_pipeline(&self, ctx: &PipelineFactoryContext<'_>) -> anyhow::Result<GfxPipeline> {
        self(ctx)
    }
}

type PipelineSlot = Arc<Mutex<Option<Arc<GfxPipeline>>>>;

/// 某一层 storage 中已经实例化的 pipeline
///
/// 每个名字一个 slot，创建时只锁住该 slot，不同 pipeline 可以并发创建
#[derive(Default)]
pub struct PipelineStorage {
    slots: RwLock<HashMap<PipelineName, PipelineSlot>>,
}

impl PipelineStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &PipelineName) -> PipelineSlot {
        if let Some(slot) = self.slots.read().unwrap_or_else(PoisonError::into_inner).get(name) {
            return slot.clone();
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.entry(name.clone()).or_default().clone()
    }

    /// 已创建则直接返回，否则调用 `create`；同一个名字最多成功创建一次
    pub fn get_or_create(
        &self,
        name: &PipelineName,
        create: impl FnOnce() -> RenderResult<GfxPipeline>,
    ) -> RenderResult<Arc<GfxPipeline>> {
        let slot = self.slot(name);
        let mut pipeline = slot.lock().map_err(|_| RenderError::LockPoisoned)?;
        if let Some(pipeline) = pipeline.as_ref() {
            return Ok(pipeline.clone());
        }

        let created = Arc::new(create()?);
        log::info!("Create pipeline: {}", name);
        *pipeline = Some(created.clone());
        Ok(created)
    }

    pub fn get(&self, name: &PipelineName) -> Option<Arc<GfxPipeline>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get(name)?.clone();
        drop(slots);
        slot.lock().ok()?.clone()
    }

    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.lock().map(|p| p.is_some()).unwrap_or(false)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
