use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// ROI 矩形（源像素坐标，上下左右）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiRect {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl RoiRect {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// 收紧到帧尺寸内。收紧后可能退化为零面积。
    pub fn clamped(&self, width: u32, height: u32) -> RoiRect {
        RoiRect {
            top: self.top.min(height),
            bottom: self.bottom.min(height),
            left: self.left.min(width),
            right: self.right.min(width),
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// 检测任务配置 - 每个任务创建一次，运行期间不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub roi: RoiRect,
    /// 目标颜色，RGB 各通道 0-255
    pub color: [u8; 3],
    #[serde(default = "default_color_tolerance")]
    pub color_tolerance: f32,
    /// 目标圆半径（像素）
    #[serde(default = "default_target_radius")]
    pub target_radius: f32,
    #[serde(default = "default_radius_tolerance")]
    pub radius_tolerance: f32,
}

fn default_color_tolerance() -> f32 {
    0.1
}

fn default_target_radius() -> f32 {
    20.0
}

fn default_radius_tolerance() -> f32 {
    0.2
}

impl DetectionConfig {
    /// 校验参数范围。零面积 ROI 是合法输入（检测恒为否），不在此拒绝。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.color_tolerance > 0.0 && self.color_tolerance <= 1.0) {
            return Err(ConfigError::ColorTolerance(self.color_tolerance));
        }
        if !(self.radius_tolerance > 0.0 && self.radius_tolerance <= 1.0) {
            return Err(ConfigError::RadiusTolerance(self.radius_tolerance));
        }
        if !(self.target_radius > 0.0 && self.target_radius.is_finite()) {
            return Err(ConfigError::TargetRadius(self.target_radius));
        }
        Ok(())
    }

    /// 从 JSON 解析并校验（web 端以 JSON 下发任务配置）
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DetectionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
