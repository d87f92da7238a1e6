//! 肢体绑定
//!
//! Limb 把一根动画骨骼与 ragdoll dummy 中的一个刚体/关节配对，
//! 并缓存当帧的动画变换与物理变换。

use bitflags::bitflags;

use super::{BoneId, BoneTransform};
use crate::physics::{BodyHandle, JointHandle};

// ============================================================================
// 肢体标志
// ============================================================================

bitflags! {
    /// 肢体标志位
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LimbFlags: u32 {
        /// 骨盆（层级根肢体，可被锚定）
        const PELVIS = 1 << 0;
        /// 用户请求的运动学状态（SetAllKinematic）
        const KINEMATIC = 1 << 1;
        /// 已锚定（骨盆完全锁定在锚点）
        const ANCHORED = 1 << 2;
        /// 已提交给求解器的运动学状态
        const APPLIED_KINEMATIC = 1 << 3;
    }
}

// ============================================================================
// 绑定描述（由外部 dummy 构建方提供）
// ============================================================================

/// 外部构建好的 骨骼 ↔ 刚体/关节 绑定
#[derive(Clone, Debug)]
pub struct LimbBinding {
    pub name: String,
    pub bone: BoneId,
    pub body: BodyHandle,
    /// 连接父肢体的关节，骨盆为 None
    pub joint: Option<JointHandle>,
    /// 父肢体在绑定列表中的索引（必须小于自身索引）
    pub parent: Option<usize>,
    pub pelvis: bool,
}

impl LimbBinding {
    pub fn new(name: impl Into<String>, bone: BoneId, body: BodyHandle) -> Self {
        Self {
            name: name.into(),
            bone,
            body,
            joint: None,
            parent: None,
            pelvis: false,
        }
    }

    pub fn with_joint(mut self, joint: JointHandle, parent: usize) -> Self {
        self.joint = Some(joint);
        self.parent = Some(parent);
        self
    }

    pub fn as_pelvis(mut self) -> Self {
        self.pelvis = true;
        self
    }
}

// ============================================================================
// 肢体
// ============================================================================

/// 单个肢体
///
/// 不变量：`muscle_strength`、`muscle_multiplier`、`blend_weight` 始终在 [0,1]。
#[derive(Clone, Debug)]
pub struct Limb {
    pub name: String,
    pub bone: BoneId,
    pub body: BodyHandle,
    pub joint: Option<JointHandle>,
    pub parent: Option<usize>,
    pub flags: LimbFlags,

    /// 骨骼空间下的刚体偏移（初始化时计算一次）
    /// body_world = bone_world * body_offset
    pub body_offset: BoneTransform,

    muscle_strength: f32,
    muscle_multiplier: f32,
    blend_weight: f32,

    /// 当帧动画变换（世界空间）
    pub animated: BoneTransform,
    /// 当帧物理变换（世界空间，已换算回骨骼坐标系）
    pub physical: BoneTransform,
}

impl Limb {
    pub(crate) fn from_binding(binding: LimbBinding, body_offset: BoneTransform) -> Self {
        let mut flags = LimbFlags::empty();
        if binding.pelvis {
            flags.insert(LimbFlags::PELVIS);
        }
        Self {
            name: binding.name,
            bone: binding.bone,
            body: binding.body,
            joint: binding.joint,
            parent: binding.parent,
            flags,
            body_offset,
            muscle_strength: 0.0,
            muscle_multiplier: 1.0,
            blend_weight: 1.0,
            animated: BoneTransform::IDENTITY,
            physical: BoneTransform::IDENTITY,
        }
    }

    #[inline]
    pub fn muscle_strength(&self) -> f32 {
        self.muscle_strength
    }

    #[inline]
    pub fn set_muscle_strength(&mut self, value: f32) {
        self.muscle_strength = clamp01(value);
    }

    /// 单肢体肌肉倍率（默认 1）
    #[inline]
    pub fn muscle_multiplier(&self) -> f32 {
        self.muscle_multiplier
    }

    #[inline]
    pub fn set_muscle_multiplier(&mut self, value: f32) {
        self.muscle_multiplier = clamp01(value);
    }

    /// 单肢体混合权重（默认 1，即统一使用全局 blend）
    #[inline]
    pub fn blend_weight(&self) -> f32 {
        self.blend_weight
    }

    #[inline]
    pub fn set_blend_weight(&mut self, value: f32) {
        self.blend_weight = clamp01(value);
    }

    #[inline]
    pub fn is_pelvis(&self) -> bool {
        self.flags.contains(LimbFlags::PELVIS)
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.flags.contains(LimbFlags::KINEMATIC)
    }

    #[inline]
    pub fn is_anchored(&self) -> bool {
        self.flags.contains(LimbFlags::ANCHORED)
    }

    /// 求解器侧应处于的运动学状态
    #[inline]
    pub fn wants_kinematic(&self) -> bool {
        self.flags.intersects(LimbFlags::KINEMATIC | LimbFlags::ANCHORED)
    }

    /// 骨骼世界变换 → 刚体世界变换
    #[inline]
    pub fn body_from_bone(&self, bone_world: &BoneTransform) -> BoneTransform {
        bone_world.mul_rigid(&self.body_offset)
    }

    /// 刚体世界变换 → 骨骼世界变换
    #[inline]
    pub fn bone_from_body(&self, body_world: &BoneTransform) -> BoneTransform {
        body_world.mul_rigid(&self.body_offset.inverse_rigid())
    }
}

/// NaN 视为 0
#[inline]
pub(crate) fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
