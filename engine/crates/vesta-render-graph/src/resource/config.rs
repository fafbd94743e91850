use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::{RenderError, RenderResult};
use crate::resource::names::{DescriptorName, PipelineName, RenderPassName};
use crate::resource::pipeline_storage::PipelineFactory;
use crate::resource::render_pass::RenderPass;

/// 构建阶段由各个 plugin 填写的静态资源声明
///
/// - descriptor：只声明名字，具体的对象在运行时由某一层 storage 提供；重复声明是错误
/// - render pass / pipeline：后定义的覆盖先定义的
#[derive(Default)]
pub struct ResourceConfig {
    descriptors: HashSet<DescriptorName>,
    render_passes: HashMap<RenderPassName, Arc<dyn RenderPass>>,
    pipelines: HashMap<PipelineName, Arc<dyn PipelineFactory>>,
}

// 声明
impl ResourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_descriptor(&mut self, name: impl Into<DescriptorName>) -> RenderResult<()> {
        let name = name.into();
        if self.descriptors.contains(&name) {
            return Err(RenderError::DuplicateDescriptor(name));
        }
        self.descriptors.insert(name);
        Ok(())
    }

    pub fn define_render_pass(&mut self, render_pass: Arc<dyn RenderPass>) {
        let name = render_pass.name().clone();
        if self.render_passes.insert(name.clone(), render_pass).is_some() {
            log::warn!("Render pass {} is defined more than once, the last definition wins", name);
        }
    }

    /// 由 root storage 负责实例化的 pipeline
    pub fn define_pipeline(&mut self, name: impl Into<PipelineName>, factory: impl PipelineFactory + 'static) {
        let name = name.into();
        if self.pipelines.insert(name.clone(), Arc::new(factory)).is_some() {
            log::warn!("Pipeline {} is defined more than once, the last definition wins", name);
        }
    }
}

// getters
impl ResourceConfig {
    #[inline]
    pub fn has_descriptor(&self, name: &DescriptorName) -> bool {
        self.descriptors.contains(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &DescriptorName> {
        self.descriptors.iter()
    }

    pub fn render_pass(&self, name: &RenderPassName) -> Option<Arc<dyn RenderPass>> {
        self.render_passes.get(name).cloned()
    }

    pub fn pipeline_factory(&self, name: &PipelineName) -> Option<Arc<dyn PipelineFactory>> {
        self.pipelines.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_descriptor_fails() {
        let mut config = ResourceConfig::new();
        config.define_descriptor("camera").unwrap();
        config.define_descriptor("lights").unwrap();

        let err = config.define_descriptor("camera").unwrap_err();
        assert!(matches!(err, RenderError::DuplicateDescriptor(name) if name.as_str() == "camera"));
        assert!(config.has_descriptor(&DescriptorName::from("lights")));
    }
}
