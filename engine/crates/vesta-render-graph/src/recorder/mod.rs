//! 并行录制 command buffer，并在相邻的录制单元之间插入 barrier

pub mod command_recorder;

pub use command_recorder::{CommandRecorder, CommandRecorderDesc, RecordedFrame, RecordedSubmission};
