//! 骨骼侧协作接口
//!
//! 核心设计思想：
//! - SkeletonProvider: 外部动画骨骼（只引用，不拥有）
//! - Animator: 外部动画器开关
//! - Limb: 单根骨骼与一个刚体/关节的绑定

mod limb;

pub use limb::{Limb, LimbBinding, LimbFlags};
pub(crate) use limb::clamp01;

use glam::{Quat, Vec3};

// ============================================================================
// 公共类型定义
// ============================================================================

/// 骨骼索引（由骨骼提供方分配）
pub type BoneId = usize;

/// 骨骼变换数据
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self { translation, rotation, scale: Vec3::ONE }
    }

    /// 刚体变换（忽略缩放）的逆
    #[inline]
    pub fn inverse_rigid(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: rotation * -self.translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// 刚体复合：先 `local`，再 `self`（忽略缩放）
    #[inline]
    pub fn mul_rigid(&self, local: &Self) -> Self {
        Self {
            translation: self.translation + self.rotation * local.translation,
            rotation: (self.rotation * local.rotation).normalize(),
            scale: self.scale,
        }
    }

    /// 动画 → 物理插值
    ///
    /// 平移线性插值，旋转最短弧球面插值，缩放保持 `self`。
    /// `t <= 0` 精确返回 `self`，`t >= 1` 精确返回 `other`。
    pub fn blend(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return Self { scale: self.scale, ..*other };
        }
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t).normalize(),
            scale: self.scale,
        }
    }
}

// ============================================================================
// 协作接口
// ============================================================================

/// 外部动画骨骼
///
/// 所有变换均为世界空间。根变换（root transform）是角色控制器锚点，
/// 移动它会带动整个动画骨骼。
pub trait SkeletonProvider {
    fn bone_count(&self) -> usize;

    /// 层级锚点骨骼，缺失时拒绝初始化
    fn root_bone(&self) -> Option<BoneId>;

    fn bone_world_transform(&self, bone: BoneId) -> Option<BoneTransform>;

    fn set_bone_world_transform(&mut self, bone: BoneId, transform: BoneTransform);

    fn root_transform(&self) -> BoneTransform;

    fn set_root_transform(&mut self, transform: BoneTransform);
}

/// 外部动画器
pub trait Animator {
    fn set_enabled(&mut self, enabled: bool);

    /// 当前是否在驱动骨骼
    fn is_enabled(&self) -> bool;
}
