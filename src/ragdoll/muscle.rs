//! 肌肉控制
//!
//! 在物理积分之前写入：运动学标志、骨盆锚定、关节驱动目标与强度。

use super::BlendState;
use crate::physics::{ForceMode, PhysicsSolver};
use crate::skeleton::{BoneTransform, Limb, LimbFlags};

/// 肌肉控制器
///
/// 持有骨盆锚定的请求状态；肌肉强度本身存放在各肢体上。
#[derive(Debug, Default)]
pub struct MuscleController {
    /// 用户是否请求锚定
    anchor_requested: bool,
    /// 锚定位姿（刚体世界变换），请求锚定时采样
    anchor_pose: Option<BoneTransform>,
}

impl MuscleController {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn anchor_requested(&self) -> bool {
        self.anchor_requested
    }

    #[inline]
    pub fn anchor_pose(&self) -> Option<BoneTransform> {
        self.anchor_pose
    }

    /// 单肢体驱动强度
    ///
    /// 自由落体时基础强度为 0；强制贴合权重 `f` 把强度向 1 推：
    /// `s = base + (1 - base) * f`
    #[inline]
    pub fn drive_strength(state: &BlendState, limb: &Limb) -> f32 {
        let base = if state.free_fall {
            0.0
        } else {
            state.muscle_power * limb.muscle_multiplier()
        };
        let f = state.force_to_animator;
        (base + (1.0 - base) * f).clamp(0.0, 1.0)
    }

    /// 写入关节驱动
    ///
    /// 目标为上一次姿态采样得到的动画姿态（不是写回后的混合姿态）。
    pub fn apply_drives(limbs: &mut [Limb], state: &BlendState, solver: &mut dyn PhysicsSolver) {
        for limb in limbs.iter_mut() {
            let strength = Self::drive_strength(state, limb);
            limb.set_muscle_strength(strength);
            if limb.wants_kinematic() {
                continue;
            }
            let target = limb.body_from_bone(&limb.animated);
            solver.set_drive(limb.body, limb.joint, target.rotation, limb.muscle_strength());
        }
    }

    /// 立即设置全部肢体运动学标志并提交给求解器
    pub fn set_all_kinematic(limbs: &mut [Limb], kinematic: bool, solver: &mut dyn PhysicsSolver) {
        for limb in limbs.iter_mut() {
            limb.flags.set(LimbFlags::KINEMATIC, kinematic);
        }
        Self::sync_kinematic(limbs, solver);
    }

    /// 把期望的运动学状态提交给求解器（仅在变化时调用）
    pub fn sync_kinematic(limbs: &mut [Limb], solver: &mut dyn PhysicsSolver) {
        for limb in limbs.iter_mut() {
            let wants = limb.wants_kinematic();
            if wants != limb.flags.contains(LimbFlags::APPLIED_KINEMATIC) {
                solver.set_kinematic(limb.body, wants);
                limb.flags.set(LimbFlags::APPLIED_KINEMATIC, wants);
            }
        }
    }

    /// 请求锚定 / 解除锚定
    ///
    /// 锚定时采样骨盆当前物理位姿作为锚点；返回 false 表示骨盆刚体不可用。
    pub fn request_anchor(&mut self, anchor: bool, pelvis: &Limb, solver: &dyn PhysicsSolver) -> bool {
        if anchor {
            if !self.anchor_requested || self.anchor_pose.is_none() {
                match solver.body_transform(pelvis.body) {
                    Some(pose) => self.anchor_pose = Some(pose),
                    None => return false,
                }
            }
            self.anchor_requested = true;
        } else {
            self.anchor_requested = false;
        }
        true
    }

    /// 每个物理步更新骨盆锚定
    ///
    /// - 请求锚定且权重达到 1：骨盆运动学锁定在锚点
    /// - 权重在 (0,1)：骨盆保持动态，由弹簧按权重拉向锚点
    /// - 解除请求且权重归零：丢弃锚点
    pub fn update_anchor(
        &mut self,
        pelvis: &mut Limb,
        state: &BlendState,
        stiffness: f32,
        damping: f32,
        solver: &mut dyn PhysicsSolver,
    ) {
        let w = state.pelvis_anchor;
        let Some(anchor) = self.anchor_pose else {
            pelvis.flags.remove(LimbFlags::ANCHORED);
            return;
        };

        let locked = self.anchor_requested && w >= 1.0;
        pelvis.flags.set(LimbFlags::ANCHORED, locked);

        if locked {
            solver.set_body_transform(pelvis.body, anchor);
            return;
        }

        if !self.anchor_requested && w <= 0.0 {
            self.anchor_pose = None;
            return;
        }

        if w > 0.0 && !pelvis.wants_kinematic() {
            let Some(current) = solver.body_transform(pelvis.body) else {
                return;
            };
            let offset = anchor.translation - current.translation;
            let velocity = solver.linear_velocity(pelvis.body);
            let accel = (offset * stiffness - velocity * damping) * w;
            if accel.length_squared() > 0.0 && accel.is_finite() {
                solver.apply_force(pelvis.body, accel, ForceMode::Acceleration);
            }
        }
    }

    /// 丢弃锚定请求（dummy 销毁时）
    pub fn clear_anchor(&mut self) {
        self.anchor_requested = false;
        self.anchor_pose = None;
    }
}
