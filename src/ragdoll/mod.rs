//! Ragdoll 混合核心
//!
//! - RagdollProcessor: 拥有 dummy 的全部肢体/过渡/冲击状态，实现两阶段帧更新
//! - RagdollAnimator: 面向宿主的命令层（容错、日志、生命周期）
//! - MuscleController / ImpactApplicator / 根节点重定位: 被处理器组合使用的原语

mod animator;
mod get_up;
mod impact;
mod muscle;
mod processor;

pub use animator::{Lifecycle, RagdollAnimator};
pub use get_up::{look_rotation, reposition_root, sample_get_up_state, GetUpState, GetUpType};
pub use impact::{Impact, ImpactApplicator, ImpactFalloff, ImpactTarget};
pub use muscle::MuscleController;
pub use processor::RagdollProcessor;

use crate::animation::{ScalarKey, ScalarStore};
use crate::physics::{GroundQuery, PhysicsSolver};
use crate::skeleton::{Animator, Limb, SkeletonProvider};

/// 全局混合状态
///
/// 不变量：所有标量在 [0,1]。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendState {
    /// 0 = 纯动画，1 = 纯物理
    pub blend: f32,
    pub muscle_power: f32,
    /// 强制物理贴合动画的覆盖权重（ForceRagdollToAnimatorFor）
    pub force_to_animator: f32,
    /// 骨盆锚定权重
    pub pelvis_anchor: f32,
    /// 自由落体：物理完全接管，不追随动画
    pub free_fall: bool,
}

impl BlendState {
    pub fn new(blend: f32, muscle_power: f32) -> Self {
        Self {
            blend: blend.clamp(0.0, 1.0),
            muscle_power: muscle_power.clamp(0.0, 1.0),
            force_to_animator: 0.0,
            pelvis_anchor: 0.0,
            free_fall: false,
        }
    }
}

impl ScalarStore for BlendState {
    fn scalar(&self, key: ScalarKey) -> f32 {
        match key {
            ScalarKey::Blend => self.blend,
            ScalarKey::MusclePower => self.muscle_power,
            ScalarKey::ForceToAnimator => self.force_to_animator,
            ScalarKey::PelvisAnchor => self.pelvis_anchor,
        }
    }

    fn set_scalar(&mut self, key: ScalarKey, value: f32) {
        let value = crate::skeleton::clamp01(value);
        match key {
            ScalarKey::Blend => self.blend = value,
            ScalarKey::MusclePower => self.muscle_power = value,
            ScalarKey::ForceToAnimator => self.force_to_animator = value,
            ScalarKey::PelvisAnchor => self.pelvis_anchor = value,
        }
    }
}

/// 宿主对象存活查询（由宿主生命周期系统实现）
pub trait LivenessQuery {
    fn is_alive(&self) -> bool;
}

impl LivenessQuery for bool {
    fn is_alive(&self) -> bool {
        *self
    }
}

/// 一帧内核心所需的外部协作者（全部为非拥有引用）
pub struct RagdollHost<'a> {
    pub skeleton: &'a mut dyn SkeletonProvider,
    pub animator: &'a mut dyn Animator,
    pub solver: &'a mut dyn PhysicsSolver,
    pub ground: &'a dyn GroundQuery,
    pub owner: &'a dyn LivenessQuery,
}

/// 只读诊断快照
#[derive(Clone, Copy, Debug)]
pub struct Parameters<'a> {
    pub state: BlendState,
    pub get_up_state: GetUpState,
    pub running_transitions: usize,
    pub active_impacts: usize,
    pub pending_animator_switches: usize,
    pub limbs: &'a [Limb],
}
