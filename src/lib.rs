//! Ragdoll 混合运行时
//!
//! 驱动一套与动画骨骼并行的物理骨骼（ragdoll dummy），在"纯动画"与"纯物理"
//! 之间平滑过渡，并提供外力冲击与"倒地起身"序列。
//!
//! 每帧调用顺序（由宿主驱动）：
//! 1. `physics_step(dt)`：推进过渡/冲击，写入肌肉驱动与外力
//! 2. 宿主物理求解器积分
//! 3. 宿主动画系统求值
//! 4. `pose_step()`：动画姿态与物理姿态混合并写回骨骼

pub mod animation;
pub mod physics;
pub mod ragdoll;
pub mod skeleton;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

pub use animation::{BlendEvaluator, ScalarKey, TransitionCurve, TransitionScheduler};
pub use physics::{
    get_config, reset_config, set_config, BodyHandle, ForceMode, GroundHit, GroundMask,
    GroundQuery, JointHandle, PhysicsSolver, RagdollConfig,
};
pub use ragdoll::{
    BlendState, GetUpState, GetUpType, LivenessQuery, Parameters, RagdollAnimator, RagdollHost,
    RagdollProcessor,
};
pub use skeleton::{Animator, BoneId, BoneTransform, Limb, LimbBinding, LimbFlags, SkeletonProvider};

/// Ragdoll 错误类型
#[derive(Debug, Error)]
pub enum RagdollError {
    #[error("animated skeleton has no root bone")]
    MissingSkeletonRoot,

    #[error("ragdoll dummy has no limbs")]
    EmptyDummy,

    #[error("ragdoll dummy has no pelvis limb")]
    MissingPelvis,

    #[error("limb '{limb}' references unknown bone {bone}")]
    UnknownBone { limb: String, bone: BoneId },

    #[error("limb '{limb}' references rigid body {body:?} missing from the solver")]
    UnknownBody { limb: String, body: BodyHandle },

    #[error("limb '{limb}' has invalid parent index {parent}")]
    InvalidHierarchy { limb: String, parent: usize },

    #[error("limb {0} is not part of this ragdoll dummy")]
    UnknownLimb(usize),

    #[error("ragdoll is not simulated")]
    NotSimulated,

    #[error("ragdoll dummy was destroyed")]
    Destroyed,
}

pub type Result<T> = std::result::Result<T, RagdollError>;
