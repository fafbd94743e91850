//! Render stage 标识
//!
//! stage 是一个具名的阶段（shadow、gbuffer、lighting ...），整个进程共用一张注册表，
//! 因此不同 plugin 拿到的同一个 [`RenderStageId`] 可以直接比较。stage 创建后不会被销毁。

use std::sync::{OnceLock, PoisonError, RwLock};

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// 全局唯一的 render stage 句柄
    pub struct RenderStageId;
}

impl RenderStageId {
    /// 在全局注册表中创建一个新的 stage
    ///
    /// 同名的 stage 也会得到不同的 id，名字只用于调试输出
    pub fn new(name: &str) -> Self {
        RenderStageRegistry::global().register(name)
    }

    pub fn name(&self) -> String {
        RenderStageRegistry::global().name(*self).unwrap_or_else(|| "<unknown>".to_string())
    }
}

impl std::fmt::Display for RenderStageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.name())
    }
}

/// 进程内唯一的 stage 注册表
pub struct RenderStageRegistry {
    stages: RwLock<SlotMap<RenderStageId, String>>,
}

impl RenderStageRegistry {
    /// 首次访问时初始化，之后一直存在
    pub fn global() -> &'static Self {
        static REGISTRY: OnceLock<RenderStageRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| RenderStageRegistry {
            stages: RwLock::new(SlotMap::with_key()),
        })
    }

    pub fn register(&self, name: &str) -> RenderStageId {
        // 写入只有 insert，中途 panic 不会破坏 slotmap
        let mut stages = self.stages.write().unwrap_or_else(PoisonError::into_inner);
        let id = stages.insert(name.to_string());
        log::debug!("Register render stage: {} ({:?})", name, id);
        id
    }

    pub fn name(&self, id: RenderStageId) -> Option<String> {
        self.stages.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.stages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
