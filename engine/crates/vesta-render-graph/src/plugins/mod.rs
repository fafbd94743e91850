//! 内置 plugin

pub mod clear_image;
pub mod present;

pub use clear_image::ClearImagePlugin;
pub use present::PresentPlugin;
