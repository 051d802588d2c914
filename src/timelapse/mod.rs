//! 检测延时提取器 - 从打印延时源视频中筛出出现圆形色标的帧
//!
//! 核心流程：
//! 1. 时间轴采样 - 固定 15 ticks/s 顺序 seek + 解码
//! 2. 区域检测 - ROI 裁剪 → HSV 颜色带掩码 → 连通域圆度判定
//! 3. 选择性编码 - 命中帧按固定 30fps 输出节奏重排时间戳
//! 4. 容器封装 - 结束时排空编码器，产出单条视频轨的内存缓冲

pub mod color_band;
pub mod config;
pub mod detector;
pub mod encoder;
pub mod frame;
pub mod pipeline;
pub mod sampler;
pub mod shapes;

pub use color_band::{rgb_to_hsv, ColorBand};
pub use config::{DetectionConfig, RoiRect};
pub use detector::{CircleDetector, MockRegionDetector, PixelCountDetector, RegionDetector};
pub use encoder::{
    output_timestamp_us, ContainerMuxer, EncodedChunk, EncoderConfig, EmittedFrame, FrameEncoder,
    MockContainerMuxer, MockFrameEncoder, SelectiveEncoder, FRAME_DURATION_US, KEYFRAME_INTERVAL,
    OUTPUT_BITRATE, OUTPUT_CODEC, OUTPUT_FPS,
};
pub use frame::Frame;
pub use pipeline::{CancelToken, JobState, JobStats, StepOutcome, TimelapseJob};
pub use sampler::{
    progress_at, AnalysisTick, FrameSampler, FrameSource, SyntheticSource, ANALYSIS_FPS,
};
pub use shapes::{extract_shapes, min_enclosing_circle, Circle, Mask, Shape};
