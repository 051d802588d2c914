use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

use crate::error::TimelapseError;
use crate::timelapse::config::DetectionConfig;
use crate::timelapse::detector::{CircleDetector, RegionDetector};
use crate::timelapse::encoder::{ContainerMuxer, EncoderConfig, FrameEncoder, SelectiveEncoder};
use crate::timelapse::sampler::{progress_at, FrameSampler, FrameSource, ANALYSIS_FPS};

/// 任务状态机：Idle → Running → Finalizing → Done，或任意失败点 → Aborted。
/// 没有暂停/重试：编码器致命错误直接中止，不产出部分结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Finalizing,
    Done,
    Aborted,
}

/// 任务统计（web 端轮询进度用）
#[derive(Debug, Clone, Copy, Default)]
pub struct JobStats {
    pub processed_ticks: u64,
    pub emitted_frames: u64,
    pub progress: u8,
}

/// 单次 step 的结果
#[derive(Debug)]
pub enum StepOutcome {
    /// 处理了一个分析 tick
    Tick { matched: bool, progress: u8 },
    /// 时间轴走完，容器已封装
    Finished(Vec<u8>),
}

/// 取消令牌 - 每个 tick 在 seek 之前轮询一次
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// 检测延时任务 - 单工作者，步进式驱动
///
/// 原实现用零延迟回调递归调度下一个 tick；这里改为显式 step 函数，
/// 由调用方自有的循环驱动（`run` 是便捷封装），行为等价且可插入
/// 取消检查。每个 tick 内 seek/解码/检测/提交严格顺序执行，
/// 任意时刻最多一个 tick 在处理。
pub struct TimelapseJob<S, E, M> {
    sampler: FrameSampler<S>,
    detector: Box<dyn RegionDetector>,
    encoder: SelectiveEncoder<E, M>,
    state: JobState,
    cancel: CancelToken,
    stats: JobStats,
}

impl<S, E, M> TimelapseJob<S, E, M>
where
    S: FrameSource,
    E: FrameEncoder,
    M: ContainerMuxer,
{
    /// 标准构造：按配置生成圆形标记检测器
    pub fn new(
        config: &DetectionConfig,
        source: S,
        encoder: E,
        muxer: M,
    ) -> Result<Self, TimelapseError> {
        config.validate()?;
        let detector = Box::new(CircleDetector::new(config));
        Self::with_detector(source, detector, encoder, muxer)
    }

    pub fn with_detector(
        source: S,
        detector: Box<dyn RegionDetector>,
        encoder: E,
        muxer: M,
    ) -> Result<Self, TimelapseError> {
        let mut encoder = SelectiveEncoder::new(encoder, muxer);
        encoder.configure(&EncoderConfig::for_source(source.width(), source.height()))?;

        info!(
            "🎬 TimelapseJob: {}x{} source, {:.2}s, {} ticks/s analysis",
            source.width(),
            source.height(),
            source.duration(),
            ANALYSIS_FPS
        );

        Ok(Self {
            sampler: FrameSampler::new(source),
            detector,
            encoder,
            state: JobState::Idle,
            cancel: CancelToken::new(),
            stats: JobStats::default(),
        })
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn stats(&self) -> JobStats {
        self.stats
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 推进一个 tick。到达时间轴末尾时排空编码器、封装容器并返回
    /// 最终缓冲。任何错误都是终态，之后再调用返回 InvalidState。
    pub fn step(&mut self) -> Result<StepOutcome, TimelapseError> {
        match self.state {
            JobState::Idle => self.state = JobState::Running,
            JobState::Running => {}
            _ => return Err(TimelapseError::InvalidState),
        }

        if self.cancel.is_cancelled() {
            self.state = JobState::Aborted;
            return Err(TimelapseError::Cancelled);
        }

        let tick = match self.sampler.next_tick() {
            Ok(tick) => tick,
            Err(e) => {
                self.state = JobState::Aborted;
                return Err(e.into());
            }
        };

        let Some(tick) = tick else {
            self.state = JobState::Finalizing;
            let buffer = match self.encoder.finish() {
                Ok(buffer) => buffer,
                Err(e) => {
                    self.state = JobState::Aborted;
                    return Err(e);
                }
            };
            self.stats.progress = 100;
            self.state = JobState::Done;
            return Ok(StepOutcome::Finished(buffer));
        };

        let matched = self.detector.detect(&tick.frame);
        if matched {
            info!("tick {} ({:.3}s) passed the filter", tick.index, tick.time);
            if let Err(e) = self.encoder.submit(&tick.frame) {
                self.state = JobState::Aborted;
                return Err(e);
            }
        }

        let progress = progress_at(tick.time, self.sampler.duration());
        self.stats.processed_ticks += 1;
        self.stats.emitted_frames = self.encoder.emitted_count();
        self.stats.progress = progress;

        Ok(StepOutcome::Tick { matched, progress })
    }

    /// 跑完整个任务。进度回调每个 tick 调用一次，成功结束时以 100 收尾。
    pub fn run(mut self, mut on_progress: impl FnMut(u8)) -> Result<Vec<u8>, TimelapseError> {
        loop {
            match self.step()? {
                StepOutcome::Tick { progress, .. } => on_progress(progress),
                StepOutcome::Finished(buffer) => {
                    on_progress(100);
                    return Ok(buffer);
                }
            }
        }
    }
}
