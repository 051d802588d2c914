pub mod error;
pub mod timelapse;

pub use error::{ConfigError, EncoderError, MuxerError, SourceError, TimelapseError};
pub use timelapse::{
    CancelToken, DetectionConfig, Frame, FrameEncoder, FrameSource, JobState, JobStats,
    RegionDetector, RoiRect, StepOutcome, TimelapseJob,
};

pub fn init_logging() {
    // 重复初始化（多任务场景）忽略错误
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}
