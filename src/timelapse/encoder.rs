use std::sync::{Arc, Mutex};

use log::info;

use crate::error::{EncoderError, MuxerError, TimelapseError};
use crate::timelapse::frame::Frame;

/// 输出视频固定参数：30fps / H.264 / 2Mbps，与源采样率无关
pub const OUTPUT_FPS: u64 = 30;
pub const OUTPUT_BITRATE: u64 = 2_000_000;
pub const OUTPUT_CODEC: &str = "avc1.4d002a";
/// 每 30 帧输出一个关键帧
pub const KEYFRAME_INTERVAL: u64 = 30;

const MICROS_PER_SECOND: u64 = 1_000_000;

/// 第 k 个输出帧的显示时间戳（微秒，四舍五入）：0, 33333, 66667, ...
pub fn output_timestamp_us(index: u64) -> u64 {
    (index * MICROS_PER_SECOND + OUTPUT_FPS / 2) / OUTPUT_FPS
}

/// 单个输出帧的时长（微秒）
pub const FRAME_DURATION_US: u64 = MICROS_PER_SECOND / OUTPUT_FPS;

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
    pub framerate: u64,
}

impl EncoderConfig {
    /// 输出尺寸与源一致，其余参数固定
    pub fn for_source(width: u32, height: u32) -> Self {
        Self {
            codec: OUTPUT_CODEC.to_string(),
            width,
            height,
            bitrate: OUTPUT_BITRATE,
            framerate: OUTPUT_FPS,
        }
    }
}

/// 命中 tick 的输出帧：光栅快照 + 输出时间戳 + 关键帧标记。
/// 提交编码器后立即释放，不缓存多个待编码帧。
#[derive(Debug)]
pub struct EmittedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub timestamp_us: u64,
    pub duration_us: u64,
    pub keyframe: bool,
}

#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub data: Vec<u8>,
    pub timestamp_us: u64,
    pub duration_us: u64,
    pub keyframe: bool,
}

/// 编码器能力接口。encode/flush 返回已就绪的码流块，
/// 致命错误直接返回 Err，任务随即中止。
pub trait FrameEncoder {
    fn configure(&mut self, config: &EncoderConfig) -> Result<(), EncoderError>;
    fn encode(&mut self, frame: &EmittedFrame) -> Result<Vec<EncodedChunk>, EncoderError>;
    /// 排空编码器内部缓冲
    fn flush(&mut self) -> Result<Vec<EncodedChunk>, EncoderError>;
}

/// 容器封装能力接口。块按显示时间戳非降序到达；
/// finalize 只调用一次，产出完整的内存缓冲。
pub trait ContainerMuxer {
    fn add_chunk(&mut self, chunk: EncodedChunk) -> Result<(), MuxerError>;
    fn finalize(&mut self) -> Result<Vec<u8>, MuxerError>;
}

/// 选择性编码 - 只有命中 tick 才产生输出帧
///
/// `emitted` 是跨 tick 的唯一可变状态，单调递增，
/// 由它派生输出时间戳和关键帧标记。
pub struct SelectiveEncoder<E, M> {
    encoder: E,
    muxer: M,
    emitted: u64,
}

impl<E: FrameEncoder, M: ContainerMuxer> SelectiveEncoder<E, M> {
    pub fn new(encoder: E, muxer: M) -> Self {
        Self {
            encoder,
            muxer,
            emitted: 0,
        }
    }

    pub fn configure(&mut self, config: &EncoderConfig) -> Result<(), EncoderError> {
        self.encoder.configure(config)
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted
    }

    /// 提交一个命中帧。快照在本次调用结束即释放。
    pub fn submit(&mut self, frame: &Frame) -> Result<(), TimelapseError> {
        let emitted = EmittedFrame {
            width: frame.width,
            height: frame.height,
            data: frame.data.clone(),
            timestamp_us: output_timestamp_us(self.emitted),
            duration_us: FRAME_DURATION_US,
            keyframe: self.emitted % KEYFRAME_INTERVAL == 0,
        };

        for chunk in self.encoder.encode(&emitted)? {
            self.muxer.add_chunk(chunk)?;
        }
        self.emitted += 1;
        Ok(())
    }

    /// 排空编码器并封装容器，返回最终输出缓冲
    pub fn finish(&mut self) -> Result<Vec<u8>, TimelapseError> {
        for chunk in self.encoder.flush()? {
            self.muxer.add_chunk(chunk)?;
        }
        let buffer = self.muxer.finalize()?;
        info!(
            "container finalized: {} frames, {} bytes",
            self.emitted,
            buffer.len()
        );
        Ok(buffer)
    }
}

/// 透传式假编码器：每帧产出一个块，块数据为时间戳字节（测试用）
pub struct MockFrameEncoder {
    config: Arc<Mutex<Option<EncoderConfig>>>,
    buffered: Vec<EncodedChunk>,
    buffer_until_flush: bool,
    fail_after: Option<u64>,
    encoded: u64,
}

impl MockFrameEncoder {
    pub fn new() -> Self {
        Self {
            config: Arc::new(Mutex::new(None)),
            buffered: Vec::new(),
            buffer_until_flush: false,
            fail_after: None,
            encoded: 0,
        }
    }

    /// encode 不吐块，全部积压到 flush 时排出
    pub fn buffering() -> Self {
        Self {
            buffer_until_flush: true,
            ..Self::new()
        }
    }

    /// 编码 n 帧后进入致命关闭状态
    pub fn failing_after(n: u64) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::new()
        }
    }

    /// configure 收到的配置的共享句柄
    pub fn config_handle(&self) -> Arc<Mutex<Option<EncoderConfig>>> {
        Arc::clone(&self.config)
    }

    fn chunk_for(frame: &EmittedFrame) -> EncodedChunk {
        EncodedChunk {
            data: frame.timestamp_us.to_le_bytes().to_vec(),
            timestamp_us: frame.timestamp_us,
            duration_us: frame.duration_us,
            keyframe: frame.keyframe,
        }
    }
}

impl Default for MockFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for MockFrameEncoder {
    fn configure(&mut self, config: &EncoderConfig) -> Result<(), EncoderError> {
        *self.config.lock().unwrap() = Some(config.clone());
        Ok(())
    }

    fn encode(&mut self, frame: &EmittedFrame) -> Result<Vec<EncodedChunk>, EncoderError> {
        if let Some(limit) = self.fail_after {
            if self.encoded >= limit {
                return Err(EncoderError::Closed);
            }
        }
        self.encoded += 1;

        let chunk = Self::chunk_for(frame);
        if self.buffer_until_flush {
            self.buffered.push(chunk);
            Ok(Vec::new())
        } else {
            Ok(vec![chunk])
        }
    }

    fn flush(&mut self) -> Result<Vec<EncodedChunk>, EncoderError> {
        if let Some(limit) = self.fail_after {
            if self.encoded >= limit {
                return Err(EncoderError::Closed);
            }
        }
        Ok(std::mem::take(&mut self.buffered))
    }
}

/// 内存假容器：记录全部块供断言，finalize 拼接成单一缓冲。
/// 同时强制校验块时间戳非降序。
pub struct MockContainerMuxer {
    chunks: Arc<Mutex<Vec<EncodedChunk>>>,
    last_timestamp: Option<u64>,
    finalized: bool,
}

const MOCK_CONTAINER_HEADER: &[u8; 8] = b"mocklaps";

impl MockContainerMuxer {
    pub fn new() -> Self {
        Self {
            chunks: Arc::new(Mutex::new(Vec::new())),
            last_timestamp: None,
            finalized: false,
        }
    }

    /// 块日志的共享句柄，任务结束后仍可检查
    pub fn journal(&self) -> Arc<Mutex<Vec<EncodedChunk>>> {
        Arc::clone(&self.chunks)
    }
}

impl Default for MockContainerMuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerMuxer for MockContainerMuxer {
    fn add_chunk(&mut self, chunk: EncodedChunk) -> Result<(), MuxerError> {
        if self.finalized {
            return Err(MuxerError::Chunk("chunk after finalize".into()));
        }
        if let Some(last) = self.last_timestamp {
            if chunk.timestamp_us < last {
                return Err(MuxerError::Chunk(format!(
                    "timestamp {} before {}",
                    chunk.timestamp_us, last
                )));
            }
        }
        self.last_timestamp = Some(chunk.timestamp_us);
        self.chunks.lock().unwrap().push(chunk);
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>, MuxerError> {
        if self.finalized {
            return Err(MuxerError::Finalize("finalize called twice".into()));
        }
        self.finalized = true;

        let mut buffer = MOCK_CONTAINER_HEADER.to_vec();
        for chunk in self.chunks.lock().unwrap().iter() {
            buffer.extend_from_slice(&chunk.data);
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> Frame {
        Frame::filled(4, 4, [128, 128, 128])
    }

    #[test]
    fn test_output_timestamps() {
        assert_eq!(output_timestamp_us(0), 0);
        assert_eq!(output_timestamp_us(1), 33333);
        assert_eq!(output_timestamp_us(2), 66667);
        assert_eq!(output_timestamp_us(30), 1_000_000);
    }

    #[test]
    fn test_keyframe_every_thirtieth_frame() {
        let muxer = MockContainerMuxer::new();
        let journal = muxer.journal();
        let mut selective = SelectiveEncoder::new(MockFrameEncoder::new(), muxer);
        let frame = test_frame();
        for _ in 0..65 {
            selective.submit(&frame).unwrap();
        }

        let chunks = journal.lock().unwrap();
        assert_eq!(chunks.len(), 65);
        for (k, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.keyframe, k % 30 == 0, "frame {}", k);
        }
    }

    #[test]
    fn test_timestamps_monotonic_and_dense() {
        let muxer = MockContainerMuxer::new();
        let journal = muxer.journal();
        let mut selective = SelectiveEncoder::new(MockFrameEncoder::new(), muxer);
        let frame = test_frame();
        for _ in 0..5 {
            selective.submit(&frame).unwrap();
        }

        let chunks = journal.lock().unwrap();
        let expected: Vec<u64> = (0..5).map(output_timestamp_us).collect();
        let actual: Vec<u64> = chunks.iter().map(|c| c.timestamp_us).collect();
        assert_eq!(actual, expected);
        assert!(chunks.iter().all(|c| c.duration_us == FRAME_DURATION_US));
    }

    #[test]
    fn test_finish_drains_buffered_encoder() {
        let muxer = MockContainerMuxer::new();
        let journal = muxer.journal();
        let mut selective = SelectiveEncoder::new(MockFrameEncoder::buffering(), muxer);
        let frame = test_frame();
        for _ in 0..3 {
            selective.submit(&frame).unwrap();
        }
        assert_eq!(journal.lock().unwrap().len(), 0);

        let buffer = selective.finish().unwrap();
        assert_eq!(journal.lock().unwrap().len(), 3);
        assert_eq!(
            buffer.len(),
            MOCK_CONTAINER_HEADER.len() + 3 * std::mem::size_of::<u64>()
        );
    }

    #[test]
    fn test_encoder_failure_propagates() {
        let mut selective =
            SelectiveEncoder::new(MockFrameEncoder::failing_after(2), MockContainerMuxer::new());
        let frame = test_frame();
        assert!(selective.submit(&frame).is_ok());
        assert!(selective.submit(&frame).is_ok());
        assert!(matches!(
            selective.submit(&frame),
            Err(TimelapseError::Encoder(EncoderError::Closed))
        ));
    }

    #[test]
    fn test_empty_track_finalizes() {
        let mut selective = SelectiveEncoder::new(MockFrameEncoder::new(), MockContainerMuxer::new());
        let buffer = selective.finish().unwrap();
        assert_eq!(buffer, MOCK_CONTAINER_HEADER.to_vec());
        assert_eq!(selective.emitted_count(), 0);
    }

    #[test]
    fn test_muxer_rejects_out_of_order_chunks() {
        let mut muxer = MockContainerMuxer::new();
        let chunk = |ts| EncodedChunk {
            data: vec![],
            timestamp_us: ts,
            duration_us: FRAME_DURATION_US,
            keyframe: false,
        };
        muxer.add_chunk(chunk(100)).unwrap();
        assert!(muxer.add_chunk(chunk(50)).is_err());
    }

    #[test]
    fn test_encoder_config_for_source() {
        let config = EncoderConfig::for_source(1920, 1080);
        assert_eq!(config.codec, OUTPUT_CODEC);
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.bitrate, 2_000_000);
        assert_eq!(config.framerate, 30);
    }
}
