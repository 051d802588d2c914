//! 二值掩码的连通域提取与最小外接圆

/// 二值掩码（ROI 尺寸，非零即命中）
#[derive(Debug, Clone)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height) as usize],
        }
    }

    pub fn set(&mut self, x: u32, y: u32) {
        self.data[(y * self.width + x) as usize] = 1;
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// 已测量的连通域：最小外接圆 + 面积
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    pub center: (f32, f32),
    pub radius: f32,
    /// 外边界围成的填充面积（内部孔洞计入）
    pub area: f64,
}

/// 提取掩码的全部 4-连通外部区域并测量。
///
/// 面积按外边界围成的填充区域计，空心标记（环）与实心盘给出
/// 相同的面积量级，圆度判定因此对孔洞不敏感。
/// 枚举顺序按扫描行序，调用方不得依赖该顺序做语义判断。
pub fn extract_shapes(mask: &Mask) -> Vec<Shape> {
    let w = mask.width as usize;
    let h = mask.height as usize;
    if w == 0 || h == 0 {
        return Vec::new();
    }

    // labels: 0 为背景，连通域从 1 起编号
    let mut labels = vec![0u32; w * h];
    let mut next_label = 0u32;
    let mut shapes = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for start in 0..w * h {
        if mask.data[start] == 0 || labels[start] != 0 {
            continue;
        }

        next_label += 1;
        labels[start] = next_label;
        stack.push(start);
        let mut boundary: Vec<(f64, f64)> = Vec::new();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0usize, 0usize);

        while let Some(idx) = stack.pop() {
            let x = idx % w;
            let y = idx / w;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            let mut on_boundary = false;

            let neighbors = [
                (x > 0).then(|| idx - 1),
                (x + 1 < w).then(|| idx + 1),
                (y > 0).then(|| idx - w),
                (y + 1 < h).then(|| idx + w),
            ];

            for neighbor in neighbors {
                match neighbor {
                    Some(n) if mask.data[n] != 0 => {
                        if labels[n] == 0 {
                            labels[n] = next_label;
                            stack.push(n);
                        }
                    }
                    // neighbor off-mask or out of bounds
                    _ => on_boundary = true,
                }
            }

            if on_boundary {
                boundary.push((x as f64, y as f64));
            }
        }

        let area = enclosed_area(&labels, w, h, next_label, (min_x, min_y, max_x, max_y));
        let circle = min_enclosing_circle(&boundary);
        shapes.push(Shape {
            center: (circle.center.0 as f32, circle.center.1 as f32),
            radius: circle.radius as f32,
            area: area as f64,
        });
    }

    shapes
}

// 外边界围成的填充面积：对组件包围盒加 1px 边距做外部泛洪，
// 洪水到不了的格子就是组件本身加上其包住的孔洞。
fn enclosed_area(
    labels: &[u32],
    w: usize,
    h: usize,
    label: u32,
    bbox: (usize, usize, usize, usize),
) -> u64 {
    let (min_x, min_y, max_x, max_y) = bbox;
    let bw = max_x - min_x + 3;
    let bh = max_y - min_y + 3;

    let is_component = |bx: usize, by: usize| -> bool {
        let gx = min_x as isize + bx as isize - 1;
        let gy = min_y as isize + by as isize - 1;
        gx >= 0
            && gy >= 0
            && (gx as usize) < w
            && (gy as usize) < h
            && labels[gy as usize * w + gx as usize] == label
    };

    // 边距保证 (0,0) 一定在组件外
    let mut outside = vec![false; bw * bh];
    outside[0] = true;
    let mut stack = vec![0usize];

    while let Some(idx) = stack.pop() {
        let bx = idx % bw;
        let by = idx / bw;

        let neighbors = [
            (bx > 0).then(|| idx - 1),
            (bx + 1 < bw).then(|| idx + 1),
            (by > 0).then(|| idx - bw),
            (by + 1 < bh).then(|| idx + bw),
        ];

        for neighbor in neighbors.into_iter().flatten() {
            if outside[neighbor] || is_component(neighbor % bw, neighbor / bw) {
                continue;
            }
            outside[neighbor] = true;
            stack.push(neighbor);
        }
    }

    (bw * bh - outside.iter().filter(|&&o| o).count()) as u64
}

#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub center: (f64, f64),
    pub radius: f64,
}

const CONTAINS_EPSILON: f64 = 1.0 + 1e-10;

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        let dx = p.0 - self.center.0;
        let dy = p.1 - self.center.1;
        (dx * dx + dy * dy).sqrt() <= self.radius * CONTAINS_EPSILON
    }
}

/// 点集的最小外接圆（增量法，确定性枚举顺序）。
/// 空集返回半径为 0 的原点圆。
pub fn min_enclosing_circle(points: &[(f64, f64)]) -> Circle {
    let Some(&first) = points.first() else {
        return Circle {
            center: (0.0, 0.0),
            radius: 0.0,
        };
    };

    let mut circle = Circle {
        center: first,
        radius: 0.0,
    };
    for (i, &p) in points.iter().enumerate().skip(1) {
        if !circle.contains(p) {
            circle = circle_with_one_boundary(&points[..=i], p);
        }
    }
    circle
}

// 包含 points 且 p 在圆周上的最小圆
fn circle_with_one_boundary(points: &[(f64, f64)], p: (f64, f64)) -> Circle {
    let mut circle = Circle {
        center: p,
        radius: 0.0,
    };
    for (i, &q) in points.iter().enumerate() {
        if !circle.contains(q) {
            if circle.radius == 0.0 {
                circle = diameter_circle(p, q);
            } else {
                circle = circle_with_two_boundary(&points[..=i], p, q);
            }
        }
    }
    circle
}

// 包含 points 且 p、q 在圆周上的最小圆
fn circle_with_two_boundary(points: &[(f64, f64)], p: (f64, f64), q: (f64, f64)) -> Circle {
    let base = diameter_circle(p, q);
    let mut left: Option<Circle> = None;
    let mut right: Option<Circle> = None;

    for &r in points {
        if base.contains(r) {
            continue;
        }
        let side = cross(p, q, r);
        let Some(candidate) = circumcircle(p, q, r) else {
            continue;
        };
        let candidate_side = cross(p, q, candidate.center);

        if side > 0.0 {
            if left.is_none() || candidate_side > cross(p, q, left.unwrap().center) {
                left = Some(candidate);
            }
        } else if side < 0.0 {
            if right.is_none() || candidate_side < cross(p, q, right.unwrap().center) {
                right = Some(candidate);
            }
        }
    }

    match (left, right) {
        (None, None) => base,
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (Some(l), Some(r)) => {
            if l.radius <= r.radius {
                l
            } else {
                r
            }
        }
    }
}

fn cross(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn diameter_circle(a: (f64, f64), b: (f64, f64)) -> Circle {
    let center = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    let radius = dist(a, center).max(dist(b, center));
    Circle { center, radius }
}

fn circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Circle> {
    // shift to the bounding-box midpoint for numeric stability
    let ox = (a.0.min(b.0).min(c.0) + a.0.max(b.0).max(c.0)) / 2.0;
    let oy = (a.1.min(b.1).min(c.1) + a.1.max(b.1).max(c.1)) / 2.0;
    let (ax, ay) = (a.0 - ox, a.1 - oy);
    let (bx, by) = (b.0 - ox, b.1 - oy);
    let (cx, cy) = (c.0 - ox, c.1 - oy);

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d == 0.0 {
        return None;
    }

    let x = ox
        + ((ax * ax + ay * ay) * (by - cy)
            + (bx * bx + by * by) * (cy - ay)
            + (cx * cx + cy * cy) * (ay - by))
            / d;
    let y = oy
        + ((ax * ax + ay * ay) * (cx - bx)
            + (bx * bx + by * by) * (ax - cx)
            + (cx * cx + cy * cy) * (bx - ax))
            / d;

    let center = (x, y);
    let radius = dist(center, a).max(dist(center, b)).max(dist(center, c));
    Some(Circle { center, radius })
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_disc(size: u32, cx: f64, cy: f64, r: f64) -> Mask {
        let mut mask = Mask::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                if dx * dx + dy * dy <= r * r {
                    mask.set(x, y);
                }
            }
        }
        mask
    }

    #[test]
    fn test_mec_two_points() {
        let circle = min_enclosing_circle(&[(0.0, 0.0), (4.0, 0.0)]);
        assert!((circle.radius - 2.0).abs() < 1e-9);
        assert!((circle.center.0 - 2.0).abs() < 1e-9);
        assert!((circle.center.1).abs() < 1e-9);
    }

    #[test]
    fn test_mec_square_corners() {
        let circle =
            min_enclosing_circle(&[(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (2.0, 2.0)]);
        assert!((circle.center.0 - 1.0).abs() < 1e-9);
        assert!((circle.center.1 - 1.0).abs() < 1e-9);
        assert!((circle.radius - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_mec_collinear_points() {
        let circle = min_enclosing_circle(&[(0.0, 0.0), (1.0, 0.0), (5.0, 0.0), (3.0, 0.0)]);
        assert!((circle.radius - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_mec_covers_all_points() {
        let points: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let a = i as f64 * 0.37;
                (a.sin() * (i as f64), a.cos() * (i as f64 % 7.0))
            })
            .collect();
        let circle = min_enclosing_circle(&points);
        for &p in &points {
            assert!(circle.contains(p), "point {:?} escaped {:?}", p, circle);
        }
    }

    #[test]
    fn test_disc_shape_measurement() {
        let r = 12.0;
        let mask = mask_with_disc(40, 20.0, 20.0, r);
        let shapes = extract_shapes(&mask);

        assert_eq!(shapes.len(), 1);
        let shape = shapes[0];
        assert!(
            (shape.radius as f64 - r).abs() <= 1.0,
            "radius {} vs expected {}",
            shape.radius,
            r
        );
        let expected_area = std::f64::consts::PI * r * r;
        assert!((shape.area - expected_area).abs() / expected_area < 0.1);
        assert!((shape.center.0 as f64 - 20.0).abs() <= 1.0);
        assert!((shape.center.1 as f64 - 20.0).abs() <= 1.0);
    }

    #[test]
    fn test_hollow_ring_measures_like_a_disc() {
        // 2px 厚的环：面积按外边界围成的填充区域计，孔洞不拉低圆度
        let (inner, outer) = (8.5, 10.5);
        let mut mask = Mask::new(30, 30);
        for y in 0..30u32 {
            for x in 0..30u32 {
                let dx = x as f64 - 15.0;
                let dy = y as f64 - 15.0;
                let d2 = dx * dx + dy * dy;
                if d2 >= inner * inner && d2 <= outer * outer {
                    mask.set(x, y);
                }
            }
        }

        let shapes = extract_shapes(&mask);
        assert_eq!(shapes.len(), 1);
        let shape = shapes[0];
        assert!((shape.radius as f64 - outer).abs() <= 1.0);

        let disc_area = std::f64::consts::PI * outer * outer;
        assert!(
            (shape.area - disc_area).abs() / disc_area < 0.1,
            "area {} vs disc {}",
            shape.area,
            disc_area
        );
        // 环本身的像素远少于填充面积
        assert!((mask.count_nonzero() as f64) < shape.area * 0.6);
    }

    #[test]
    fn test_two_separate_discs() {
        let mut mask = Mask::new(60, 30);
        for (cx, r) in [(12.0, 6.0), (44.0, 8.0)] {
            for y in 0..30u32 {
                for x in 0..60u32 {
                    let dx = x as f64 - cx;
                    let dy = y as f64 - 15.0;
                    if dx * dx + dy * dy <= r * r {
                        mask.set(x, y);
                    }
                }
            }
        }

        let mut shapes = extract_shapes(&mask);
        assert_eq!(shapes.len(), 2);
        shapes.sort_by(|a, b| a.radius.partial_cmp(&b.radius).unwrap());
        assert!((shapes[0].radius as f64 - 6.0).abs() <= 1.0);
        assert!((shapes[1].radius as f64 - 8.0).abs() <= 1.0);
    }

    #[test]
    fn test_single_pixel_has_zero_radius() {
        let mut mask = Mask::new(5, 5);
        mask.set(2, 2);
        let shapes = extract_shapes(&mask);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].radius, 0.0);
        assert_eq!(shapes[0].area, 1.0);
    }

    #[test]
    fn test_diagonal_pixels_are_separate_components() {
        // 4-connectivity: diagonal neighbors do not merge
        let mut mask = Mask::new(4, 4);
        mask.set(0, 0);
        mask.set(1, 1);
        let shapes = extract_shapes(&mask);
        assert_eq!(shapes.len(), 2);
    }

    #[test]
    fn test_thin_line_has_low_circularity() {
        let mut mask = Mask::new(30, 5);
        for x in 0..20u32 {
            mask.set(x, 2);
        }
        let shapes = extract_shapes(&mask);
        assert_eq!(shapes.len(), 1);
        let shape = shapes[0];
        let circularity = shape.area / (std::f64::consts::PI * (shape.radius as f64).powi(2));
        assert!(circularity < 0.2, "circularity {}", circularity);
    }

    #[test]
    fn test_empty_mask() {
        let mask = Mask::new(10, 10);
        assert!(extract_shapes(&mask).is_empty());
        assert_eq!(mask.count_nonzero(), 0);
    }
}
