use std::any::Any;
use std::sync::Arc;

/// 被渲染的场景
///
/// pipeline 只关心场景的身份：多个 viewport 显示同一个 `Arc` 时共享一份 scene 资源。
/// plugin 通过 `as_any` 取得具体类型
pub trait Scene: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

pub type SceneRef = Arc<dyn Scene>;

/// 以 `Arc` 指向的对象地址作为场景的身份
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneKey(usize);

impl SceneKey {
    #[inline]
    pub fn of(scene: &SceneRef) -> Self {
        Self(Arc::as_ptr(scene) as *const () as usize)
    }
}

/// 资源加载器，由使用者提供，plugin 通过 `as_any` 取得具体类型
pub trait AssetManager: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
