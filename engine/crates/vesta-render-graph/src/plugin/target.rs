use ash::vk;

/// 渲染目标，每个 frame in flight 一张图像
#[derive(Clone, Debug)]
pub struct RenderTarget {
    pub extent: vk::Extent2D,
    pub color_format: vk::Format,
    pub frames: Vec<RenderTargetFrame>,
}

#[derive(Clone, Copy, Debug)]
pub struct RenderTargetFrame {
    pub image: vk::Image,
    pub view: vk::ImageView,
}

impl RenderTarget {
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// frame in flight 对应的图像
    ///
    /// render target 的帧数可以少于 pipeline 的帧数，此时循环使用
    #[inline]
    pub fn frame(&self, frame_index: usize) -> Option<&RenderTargetFrame> {
        if self.frames.is_empty() {
            return None;
        }
        self.frames.get(frame_index % self.frames.len())
    }

    /// 覆盖整个 render target 的区域
    #[inline]
    pub fn full_area(&self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub view: glam::Mat4,
    pub projection: glam::Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: glam::Mat4::IDENTITY,
            projection: glam::Mat4::IDENTITY,
        }
    }
}

impl Camera {
    /// 右手坐标系，depth 范围 [0, 1]
    pub fn look_at(eye: glam::Vec3, target: glam::Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: glam::Mat4::look_at_rh(eye, target, glam::Vec3::Y),
            projection: glam::Mat4::perspective_rh(fov_y, aspect, near, far),
        }
    }

    #[inline]
    pub fn view_projection(&self) -> glam::Mat4 {
        self.projection * self.view
    }
}

/// viewport 在 render target 中的位置以及使用的相机
#[derive(Clone, Copy, Debug)]
pub struct ViewportInfo {
    pub index: usize,
    pub area: vk::Rect2D,
    pub camera: Camera,
}
