/// RGB → HSV 转换（8-bit 范围：H ∈ [0,180]，S/V ∈ [0,255]）
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [f32; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v == 0.0 { 0.0 } else { delta * 255.0 / v };

    let h = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [h / 2.0, s, v]
}

/// HSV 颜色接受区间 - 由目标颜色和容差一次性推导，之后只读
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBand {
    pub lower: [f32; 3],
    pub upper: [f32; 3],
}

impl ColorBand {
    /// 由目标 RGB 颜色和容差推导接受区间。
    ///
    /// 色相是环形量，这里沿用钳位而不是回绕：接近 0/180 的目标色
    /// 在边界一侧会损失覆盖。行为保持与现有产品一致。
    pub fn from_color(rgb: [u8; 3], tolerance: f32) -> Self {
        let hsv = rgb_to_hsv(rgb);
        let delta_h = 180.0 * tolerance;
        let delta_sv = 255.0 * tolerance;

        let lower = [
            (hsv[0] - delta_h).clamp(0.0, 180.0),
            (hsv[1] - delta_sv).clamp(0.0, 255.0),
            (hsv[2] - delta_sv).clamp(0.0, 255.0),
        ];
        let upper = [
            (hsv[0] + delta_h).clamp(0.0, 180.0),
            (hsv[1] + delta_sv).clamp(0.0, 255.0),
            (hsv[2] + delta_sv).clamp(0.0, 255.0),
        ];

        Self { lower, upper }
    }

    /// 区间两端均为闭区间
    pub fn contains(&self, hsv: [f32; 3]) -> bool {
        hsv.iter()
            .zip(self.lower.iter())
            .zip(self.upper.iter())
            .all(|((&v, &lo), &hi)| v >= lo && v <= hi)
    }
}
