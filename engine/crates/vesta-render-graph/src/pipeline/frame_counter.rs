use std::fmt::Display;

/// frame in flight 的标签：A、B、C ...
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLabel(pub usize);

impl Display for FrameLabel {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match u8::try_from(self.0) {
            Ok(idx) if idx < 26 => write!(f, "{}", (b'A' + idx) as char),
            _ => write!(f, "#{}", self.0),
        }
    }
}

pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
    num_frames: usize,
}
// new & init
impl FrameCounter {
    /// `num_frames` 至少为 1
    pub fn new(init_frame_id: u64, num_frames: usize) -> Self {
        debug_assert!(num_frames > 0, "frame counter needs at least one frame in flight");
        Self {
            frame_id: init_frame_id,
            num_frames: num_frames.max(1),
        }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }
    /// 当前帧使用的 frame in flight 序号
    #[inline]
    pub fn frame_index(&self) -> usize {
        (self.frame_id % self.num_frames as u64) as usize
    }
    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        FrameLabel(self.frame_index())
    }
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_cycles() {
        let mut counter = FrameCounter::new(0, 3);
        let mut names = Vec::new();
        for _ in 0..4 {
            names.push(counter.frame_name());
            counter.next_frame();
        }
        assert_eq!(names, vec!["[F0A]", "[F1B]", "[F2C]", "[F3A]"]);
        assert_eq!(counter.frame_index(), 1);
    }
}
