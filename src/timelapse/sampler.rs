use std::time::Duration;

use crate::error::SourceError;
use crate::timelapse::frame::Frame;

/// 固定分析采样率（每秒 tick 数）
pub const ANALYSIS_FPS: f64 = 15.0;

/// 解码器能力接口：随机 seek + 解码 + 光栅化一步完成。
/// 核心只通过该接口访问源视频，具体解码库由调用方注入。
pub trait FrameSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// 源时长（秒）
    fn duration(&self) -> f64;
    /// 阻塞返回 `time` 秒处的原生分辨率 RGB 帧
    fn frame_at(&mut self, time: f64) -> Result<Frame, SourceError>;
}

/// 单个分析 tick：时间戳 + 解码好的光栅，仅当前迭代持有
#[derive(Debug)]
pub struct AnalysisTick {
    pub index: u64,
    pub time: f64,
    pub frame: Frame,
}

/// 时间轴步进器 - 以固定分析率顺序走完源时间轴
///
/// tick 时间由序号推导（`index / ANALYSIS_FPS`）而不是累加步长，
/// 避免浮点误差把终止条件挤出一个多余 tick。
pub struct FrameSampler<S> {
    source: S,
    tick_index: u64,
}

impl<S: FrameSource> FrameSampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tick_index: 0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.source.duration()
    }

    /// 下一个 tick；时间轴走完返回 Ok(None)。严格顺序，无并发解码。
    pub fn next_tick(&mut self) -> Result<Option<AnalysisTick>, SourceError> {
        let time = self.tick_index as f64 / ANALYSIS_FPS;
        if time >= self.source.duration() {
            return Ok(None);
        }

        let mut frame = self.source.frame_at(time)?;
        frame.timestamp = Duration::from_secs_f64(time);
        frame.frame_number = self.tick_index;

        let tick = AnalysisTick {
            index: self.tick_index,
            time,
            frame,
        };
        self.tick_index += 1;
        Ok(Some(tick))
    }
}

/// 进度百分比：`clamp(round(time/duration*100), 0, 100)`
pub fn progress_at(time: f64, duration: f64) -> u8 {
    if duration <= 0.0 {
        return 100;
    }
    (time / duration * 100.0).round().clamp(0.0, 100.0) as u8
}

/// 合成帧源（测试与演示用）
pub struct SyntheticSource {
    width: u32,
    height: u32,
    duration: f64,
    fill: [u8; 3],
    painter: Option<Box<dyn Fn(f64, &mut Frame) + Send + Sync>>,
    fail_at: Option<f64>,
}

impl SyntheticSource {
    pub fn uniform(width: u32, height: u32, duration: f64, fill: [u8; 3]) -> Self {
        Self {
            width,
            height,
            duration,
            fill,
            painter: None,
            fail_at: None,
        }
    }

    /// 每个 tick 先铺底色，再交给 painter 按时间绘制内容
    pub fn with_painter<F>(mut self, painter: F) -> Self
    where
        F: Fn(f64, &mut Frame) + Send + Sync + 'static,
    {
        self.painter = Some(Box::new(painter));
        self
    }

    /// 从 `time` 起所有解码请求都失败（错误路径测试用）
    pub fn failing_at(mut self, time: f64) -> Self {
        self.fail_at = Some(time);
        self
    }
}

impl FrameSource for SyntheticSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn frame_at(&mut self, time: f64) -> Result<Frame, SourceError> {
        if let Some(fail_at) = self.fail_at {
            if time >= fail_at {
                return Err(SourceError::Decode(time, "synthetic decode failure".into()));
            }
        }
        let mut frame = Frame::filled(self.width, self.height, self.fill);
        if let Some(painter) = &self.painter {
            painter(time, &mut frame);
        }
        Ok(frame)
    }
}
