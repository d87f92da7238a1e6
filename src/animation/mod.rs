//! 动画侧：过渡曲线、标量过渡调度、姿态混合

mod blend;
mod easing;
mod transition;

pub use blend::BlendEvaluator;
pub use easing::{BezierCurve, Curve, TransitionCurve};
pub use transition::{ScalarKey, ScalarStore, Transition, TransitionScheduler, TransitionStatus};
