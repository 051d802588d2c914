use std::time::Duration;

use image::{ImageBuffer, Rgb};

use crate::timelapse::config::RoiRect;

/// 帧数据结构（RGB 光栅）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Self::new(width, height, data, 0, 0)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// 裁剪 ROI 区域。ROI 先按帧尺寸收紧；面积为零时返回 None。
    pub fn crop(&self, roi: &RoiRect) -> Option<Frame> {
        let roi = roi.clamped(self.width, self.height);
        if roi.is_empty() {
            return None;
        }

        // crop_imm 的 to_image 要求 'static 容器，这里用拥有所有权的缓冲
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.width, self.height, self.data.clone())?;
        let cropped =
            image::imageops::crop_imm(&img, roi.left, roi.top, roi.width(), roi.height())
                .to_image();

        Some(Frame {
            width: roi.width(),
            height: roi.height(),
            data: cropped.into_raw(),
            timestamp: self.timestamp,
            frame_number: self.frame_number,
        })
    }
}
