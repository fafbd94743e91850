use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use vesta_gfx::device::GfxDevice;
use vesta_gfx::pipelines::pipeline::GfxPipeline;

use crate::errors::{RenderError, RenderResult};
use crate::render_stage::RenderStageId;
use crate::resource::config::ResourceConfig;
use crate::resource::descriptor::DescriptorProvider;
use crate::resource::names::{DescriptorName, PipelineName, RenderPassName};
use crate::resource::pipeline_storage::{PipelineFactory, PipelineFactoryContext, PipelineStorage};
use crate::resource::render_pass::RenderPass;

/// 一层资源存储
///
/// 层级关系：root → global → scene → viewport。子层只通过 `Weak` 引用父层，
/// 父层的生命周期由 pipeline 管理。
///
/// 注册（`set_descriptor`、`define_pipeline`）发生在 `register_resources` 期间，
/// 需要 `&mut`；之后 storage 放进 `Arc` 里，只剩下 pipeline 缓存和动态 pass 可以变化。
pub struct ResourceStorage {
    label: String,
    device: Arc<dyn GfxDevice>,
    config: Arc<ResourceConfig>,
    parent: Option<Weak<ResourceStorage>>,

    descriptors: HashMap<DescriptorName, Arc<dyn DescriptorProvider>>,
    pipeline_factories: HashMap<PipelineName, Arc<dyn PipelineFactory>>,
    pipelines: PipelineStorage,
    dynamic_passes: RwLock<HashMap<RenderStageId, Vec<Arc<dyn RenderPass>>>>,
}

// new & init
impl ResourceStorage {
    /// root storage，本层的 pipeline 定义来自 config
    pub fn new_root(device: Arc<dyn GfxDevice>, config: Arc<ResourceConfig>) -> Self {
        Self {
            label: "root".to_string(),
            device,
            config,
            parent: None,
            descriptors: HashMap::new(),
            pipeline_factories: HashMap::new(),
            pipelines: PipelineStorage::new(),
            dynamic_passes: RwLock::new(HashMap::new()),
        }
    }

    /// 以 `parent` 为父层创建子层
    pub fn derive(parent: &Arc<ResourceStorage>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            device: parent.device.clone(),
            config: parent.config.clone(),
            parent: Some(Arc::downgrade(parent)),
            descriptors: HashMap::new(),
            pipeline_factories: HashMap::new(),
            pipelines: PipelineStorage::new(),
            dynamic_passes: RwLock::new(HashMap::new()),
        }
    }
}

// 注册
impl ResourceStorage {
    /// 提供一个 descriptor，名字必须已经在 config 中声明
    pub fn set_descriptor(
        &mut self,
        name: impl Into<DescriptorName>,
        provider: Arc<dyn DescriptorProvider>,
    ) -> RenderResult<()> {
        let name = name.into();
        if !self.config.has_descriptor(&name) {
            return Err(RenderError::UndeclaredDescriptor(name));
        }
        self.descriptors.insert(name, provider);
        Ok(())
    }

    /// 在本层定义 pipeline，覆盖父层的同名定义
    pub fn define_pipeline(&mut self, name: impl Into<PipelineName>, factory: impl PipelineFactory + 'static) {
        let name = name.into();
        if self.pipeline_factories.insert(name.clone(), Arc::new(factory)).is_some() {
            log::warn!("Pipeline {} is defined more than once in storage {}", name, self.label);
        }
    }
}

// 查找
impl ResourceStorage {
    fn local_pipeline_factory(&self, name: &PipelineName) -> Option<Arc<dyn PipelineFactory>> {
        self.pipeline_factories.get(name).cloned().or_else(|| {
            if self.parent.is_none() { self.config.pipeline_factory(name) } else { None }
        })
    }

    fn parent(&self) -> Option<RenderResult<Arc<ResourceStorage>>> {
        self.parent.as_ref().map(|parent| parent.upgrade().ok_or(RenderError::DetachedStorage))
    }

    /// 查找 pipeline
    ///
    /// 本层有定义时在本层实例化（只实例化一次），否则交给父层；
    /// 所有层都没有定义时返回 [`RenderError::PipelineNotFound`]
    pub fn get_pipeline(&self, name: &PipelineName) -> RenderResult<Arc<GfxPipeline>> {
        if let Some(factory) = self.local_pipeline_factory(name) {
            return self.pipelines.get_or_create(name, || {
                let ctx = PipelineFactoryContext {
                    name,
                    device: &self.device,
                    storage: self,
                };
                factory.create_pipeline(&ctx).map_err(|source| RenderError::PipelineCreation {
                    name: name.clone(),
                    source,
                })
            });
        }

        match self.parent() {
            Some(parent) => parent?.get_pipeline(name),
            None => Err(RenderError::PipelineNotFound(name.clone())),
        }
    }

    /// 查找 descriptor，找不到时返回 `None`
    pub fn get_descriptor(&self, name: &DescriptorName) -> Option<Arc<dyn DescriptorProvider>> {
        if let Some(descriptor) = self.descriptors.get(name) {
            return Some(descriptor.clone());
        }
        match self.parent()? {
            Ok(parent) => parent.get_descriptor(name),
            Err(_) => {
                log::warn!("Storage {} lost its parent while looking up descriptor {}", self.label, name);
                None
            }
        }
    }

    /// 构建阶段定义的 render pass
    pub fn get_render_pass(&self, name: &RenderPassName) -> Option<Arc<dyn RenderPass>> {
        self.config.render_pass(name)
    }
}

// 动态 render pass
impl ResourceStorage {
    /// 运行时给某个 stage 追加一个 render pass，只对本层及其子层可见
    pub fn add_dynamic_pass(&self, stage: RenderStageId, render_pass: Arc<dyn RenderPass>) {
        let mut passes = self.dynamic_passes.write().unwrap_or_else(PoisonError::into_inner);
        passes.entry(stage).or_default().push(render_pass);
    }

    /// 移除一个动态 pass，不存在时什么都不做
    pub fn remove_dynamic_pass(&self, stage: RenderStageId, render_pass: &Arc<dyn RenderPass>) {
        let mut passes = self.dynamic_passes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = passes.get_mut(&stage) {
            list.retain(|p| !std::ptr::addr_eq(Arc::as_ptr(p), Arc::as_ptr(render_pass)));
            if list.is_empty() {
                passes.remove(&stage);
            }
        }
    }

    pub fn clear_dynamic_passes(&self, stage: RenderStageId) {
        self.dynamic_passes.write().unwrap_or_else(PoisonError::into_inner).remove(&stage);
    }

    /// 某个 stage 上所有可见的动态 pass，父层的在前
    pub fn dynamic_passes(&self, stage: RenderStageId) -> Vec<Arc<dyn RenderPass>> {
        let mut result = match self.parent() {
            Some(Ok(parent)) => parent.dynamic_passes(stage),
            _ => Vec::new(),
        };
        let passes = self.dynamic_passes.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = passes.get(&stage) {
            result.extend(list.iter().cloned());
        }
        result
    }
}

// getters
impl ResourceStorage {
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn device(&self) -> &Arc<dyn GfxDevice> {
        &self.device
    }

    #[inline]
    pub fn config(&self) -> &Arc<ResourceConfig> {
        &self.config
    }

    /// 本层已经实例化的 pipeline 数量
    #[inline]
    pub fn instantiated_pipelines(&self) -> usize {
        self.pipelines.len()
    }
}
