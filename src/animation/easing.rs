//! 过渡曲线
//!
//! 所有曲线满足：单调不减，`value(0) == 0`，`value(1) == 1`。

use std::sync::Arc;
use glam::Vec2;

/// 曲线 trait
pub trait Curve {
    fn value(&self, v: f32) -> f32;
}

/// 三次贝塞尔缓动曲线（端点固定为 (0,0) 与 (1,1)）
#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve {
    /// 预计算的曲线采样点（按 X 升序）
    points: Vec<Vec2>,
    /// 控制点1
    c0: Vec2,
    /// 控制点2
    c1: Vec2,
}

impl BezierCurve {
    const P0: Vec2 = Vec2::ZERO;
    const P1: Vec2 = Vec2::ONE;

    /// 创建新的贝塞尔曲线
    ///
    /// 控制点分量被钳制到 [0,1]，且 `c0 <= c1`（逐分量），
    /// 此时 Bernstein 系数单调，X(t)、Y(t) 均单调不减。
    ///
    /// # 参数
    /// - `c0`: 控制点1
    /// - `c1`: 控制点2
    /// - `interval`: 采样间隔数
    pub fn new(c0: Vec2, c1: Vec2, interval: u32) -> Self {
        let c0 = c0.clamp(Vec2::ZERO, Vec2::ONE);
        let c1 = c1.clamp(Vec2::ZERO, Vec2::ONE).max(c0);

        let interval = interval.max(1);
        let mut points = Vec::with_capacity((interval + 1) as usize);
        let interval_f = interval as f32;

        for i in 0..=interval {
            let t = i as f32 / interval_f;
            let it = 1.0 - t;
            // B(t) = (1-t)³P₀ + 3(1-t)²tP₁ + 3(1-t)t²P₂ + t³P₃
            let point = Self::P0 * it.powi(3)
                + c0 * 3.0 * it.powi(2) * t
                + c1 * 3.0 * it * t.powi(2)
                + Self::P1 * t.powi(3);
            points.push(point);
        }

        points.sort_unstable_by(|a, b| a.x.total_cmp(&b.x));

        Self { points, c0, c1 }
    }

    /// CSS 风格 ease-in-out
    pub fn ease_in_out() -> Self {
        Self::new(Vec2::new(0.42, 0.0), Vec2::new(0.58, 1.0), 64)
    }

    pub fn control_points(&self) -> (Vec2, Vec2) {
        (self.c0, self.c1)
    }
}

impl Curve for BezierCurve {
    /// 使用预计算的采样点进行线性插值查找
    fn value(&self, v: f32) -> f32 {
        if v <= 0.0 {
            return 0.0;
        }
        if v >= 1.0 {
            return 1.0;
        }
        let mut n = (self.points[0], self.points[1]);
        for point in &self.points[2..] {
            if n.1.x > v {
                break;
            }
            n = (n.1, *point);
        }
        let y = if n.0.x == n.1.x {
            n.0.y
        } else {
            n.0.y + (v - n.0.x) * (n.1.y - n.0.y) / (n.1.x - n.0.x)
        };
        y.clamp(0.0, 1.0)
    }
}

/// 标量过渡使用的插值曲线
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransitionCurve {
    #[default]
    Linear,
    /// 3t² - 2t³
    SmoothStep,
    Bezier(Arc<BezierCurve>),
}

impl Curve for TransitionCurve {
    fn value(&self, v: f32) -> f32 {
        let t = v.clamp(0.0, 1.0);
        match self {
            TransitionCurve::Linear => t,
            TransitionCurve::SmoothStep => t * t * (3.0 - 2.0 * t),
            TransitionCurve::Bezier(curve) => curve.value(t),
        }
    }
}
