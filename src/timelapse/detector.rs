use std::f64::consts::PI;

use log::{debug, warn};

use crate::timelapse::color_band::{rgb_to_hsv, ColorBand};
use crate::timelapse::config::{DetectionConfig, RoiRect};
use crate::timelapse::frame::Frame;
use crate::timelapse::shapes::{extract_shapes, Mask};

pub trait RegionDetector: Send + Sync {
    /// 对整帧分类：ROI 内是否出现目标特征
    fn detect(&self, frame: &Frame) -> bool;
}

/// 对帧做颜色带阈值，返回 ROI 尺寸的二值掩码
fn band_mask(roi_frame: &Frame, band: &ColorBand) -> Mask {
    let mut mask = Mask::new(roi_frame.width, roi_frame.height);
    for (i, rgb) in roi_frame.data.chunks_exact(3).enumerate() {
        if band.contains(rgb_to_hsv([rgb[0], rgb[1], rgb[2]])) {
            mask.data[i] = 1;
        }
    }
    mask
}

/// 圆形标记检测器
///
/// ROI 裁剪 → HSV 颜色带掩码 → 4-连通域 → 最小外接圆 + 圆度过滤。
/// 存在性判定：任一连通域同时满足半径容差和圆度阈值即命中，
/// 与枚举顺序无关。
pub struct CircleDetector {
    band: ColorBand,
    config: DetectionConfig,
}

const MIN_CIRCULARITY: f64 = 0.2;

impl CircleDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        if config.roi.is_empty() {
            // 零面积 ROI 是合法配置：整个任务检测恒为否，输出空视频轨
            warn!(
                "ROI {:?} has zero area; detection disabled for this job",
                config.roi
            );
        }
        Self {
            band: ColorBand::from_color(config.color, config.color_tolerance),
            config: config.clone(),
        }
    }

    fn qualifies(&self, radius: f32, area: f64) -> bool {
        if radius < 1.0 {
            return false;
        }
        let circle_area = PI * (radius as f64) * (radius as f64);
        let circularity = if circle_area > 0.0 {
            area / circle_area
        } else {
            0.0
        };

        (radius - self.config.target_radius).abs()
            <= self.config.target_radius * self.config.radius_tolerance
            && circularity > MIN_CIRCULARITY
    }
}

impl RegionDetector for CircleDetector {
    fn detect(&self, frame: &Frame) -> bool {
        let Some(roi_frame) = frame.crop(&self.config.roi) else {
            return false;
        };

        let mask = band_mask(&roi_frame, &self.band);
        let shapes = extract_shapes(&mask);
        debug!(
            "tick {}: {} in-band pixels, {} shapes",
            frame.frame_number,
            mask.count_nonzero(),
            shapes.len()
        );

        shapes
            .iter()
            .any(|shape| self.qualifies(shape.radius, shape.area))
    }
}

/// 像素计数检测器 - 不做形状分析，ROI 内命中颜色的像素数达到阈值即通过
pub struct PixelCountDetector {
    band: ColorBand,
    roi: RoiRect,
    min_pixels: usize,
}

impl PixelCountDetector {
    pub fn new(config: &DetectionConfig, min_pixels: usize) -> Self {
        Self {
            band: ColorBand::from_color(config.color, config.color_tolerance),
            roi: config.roi,
            min_pixels,
        }
    }
}

impl RegionDetector for PixelCountDetector {
    fn detect(&self, frame: &Frame) -> bool {
        let Some(roi_frame) = frame.crop(&self.roi) else {
            return false;
        };
        band_mask(&roi_frame, &self.band).count_nonzero() >= self.min_pixels
    }
}

pub struct MockRegionDetector {
    match_pattern: Option<Box<dyn Fn(u64) -> bool + Send + Sync>>,
}

impl MockRegionDetector {
    pub fn new() -> Self {
        Self {
            match_pattern: None,
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        Self {
            match_pattern: Some(Box::new(pattern)),
        }
    }

    pub fn with_fixed_frames(frames: Vec<u64>) -> Self {
        Self {
            match_pattern: Some(Box::new(move |frame_num| frames.contains(&frame_num))),
        }
    }
}

impl Default for MockRegionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionDetector for MockRegionDetector {
    fn detect(&self, frame: &Frame) -> bool {
        self.match_pattern
            .as_ref()
            .map(|p| p(frame.frame_number))
            .unwrap_or(false)
    }
}
