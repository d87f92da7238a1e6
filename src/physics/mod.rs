//! 物理侧协作接口
//!
//! 核心不实现刚体求解，只驱动外部求解器的参数（驱动目标、运动学标志、外力）
//! 并读回刚体变换。`rapier` 特性提供基于 Rapier3D 的参考实现。

mod config;
#[cfg(feature = "rapier")]
mod rapier_world;

pub use config::{get_config, reset_config, set_config, RagdollConfig};
#[cfg(feature = "rapier")]
pub use rapier_world::{RapierRagdollWorld, RapierWorldConfig};

use glam::{Quat, Vec3};

use crate::skeleton::BoneTransform;

/// 刚体句柄（求解器内不透明）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

/// 关节句柄（求解器内不透明）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointHandle(pub u32);

/// 外力施加方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ForceMode {
    /// 牛顿力，响应与质量成反比
    Force,
    /// 加速度，所有肢体响应一致（与质量无关）
    #[default]
    Acceleration,
}

/// 地面射线检测层掩码
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroundMask(pub u32);

impl GroundMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    #[inline]
    pub fn intersects(self, layers: u32) -> bool {
        self.0 & layers != 0
    }
}

/// 射线命中
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// 外部刚体/关节求解器
///
/// 变换均为世界空间。对不存在的句柄，读取返回 None / 默认值，写入忽略。
pub trait PhysicsSolver {
    fn contains_body(&self, body: BodyHandle) -> bool;

    fn body_transform(&self, body: BodyHandle) -> Option<BoneTransform>;

    /// 直接设置刚体位姿（运动学刚体跟随 / 锚定）
    fn set_body_transform(&mut self, body: BodyHandle, transform: BoneTransform);

    fn linear_velocity(&self, body: BodyHandle) -> Vec3;

    fn is_kinematic(&self, body: BodyHandle) -> bool;

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool);

    /// 施加持续外力（仅作用于下一次积分）
    fn apply_force(&mut self, body: BodyHandle, force: Vec3, mode: ForceMode);

    /// 写入关节驱动
    ///
    /// `strength` ∈ [0,1]：0 = 完全由物理决定，1 = 尽可能紧地追随目标旋转。
    fn set_drive(
        &mut self,
        body: BodyHandle,
        joint: Option<JointHandle>,
        target_rotation: Quat,
        strength: f32,
    );

    /// 销毁刚体（连同其关节）
    fn remove_body(&mut self, body: BodyHandle);
}

/// 地面射线检测
pub trait GroundQuery {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: GroundMask,
    ) -> Option<GroundHit>;
}

/// 不做任何检测的地面（无地面吸附需求时使用）
impl GroundQuery for () {
    fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: GroundMask) -> Option<GroundHit> {
        None
    }
}
