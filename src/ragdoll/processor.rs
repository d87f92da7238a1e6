//! Ragdoll 处理器
//!
//! 独占 dummy 的全部肢体、过渡与冲击状态。
//! 流程：initialize → 每帧 [physics_step → 宿主物理积分 → 宿主动画求值 → pose_step]

use glam::Vec3;

use super::get_up::{self, GetUpState, GetUpType};
use super::impact::{Impact, ImpactApplicator, ImpactFalloff, ImpactTarget};
use super::muscle::MuscleController;
use super::{BlendState, Parameters, RagdollHost};
use crate::animation::{BlendEvaluator, ScalarKey, ScalarStore, Transition, TransitionScheduler};
use crate::physics::{BodyHandle, GroundMask, PhysicsSolver, RagdollConfig};
use crate::skeleton::{Animator, Limb, LimbBinding, LimbFlags, SkeletonProvider};
use crate::{RagdollError, Result};

/// 延迟执行的动画器开关
#[derive(Clone, Copy, Debug)]
struct PendingSwitch {
    enabled: bool,
    remaining: f32,
}

/// Ragdoll 处理器
pub struct RagdollProcessor {
    config: RagdollConfig,
    /// 按层级排序（父先于子）
    limbs: Vec<Limb>,
    pelvis: usize,
    state: BlendState,
    scheduler: TransitionScheduler,
    impacts: ImpactApplicator,
    muscles: MuscleController,
    evaluator: BlendEvaluator,
    pending_switches: Vec<PendingSwitch>,
    get_up_state: GetUpState,
}

impl RagdollProcessor {
    /// 绑定外部构建好的 dummy
    ///
    /// 任一引用缺失都拒绝初始化，不会留下半构建的状态。
    /// 刚体相对骨骼的偏移在此刻采样一次。
    pub fn initialize(
        config: RagdollConfig,
        skeleton: &dyn SkeletonProvider,
        solver: &dyn PhysicsSolver,
        bindings: Vec<LimbBinding>,
    ) -> Result<Self> {
        if skeleton.root_bone().is_none() {
            return Err(RagdollError::MissingSkeletonRoot);
        }
        if bindings.is_empty() {
            return Err(RagdollError::EmptyDummy);
        }

        let pelvis = bindings
            .iter()
            .position(|b| b.pelvis)
            .or_else(|| bindings.iter().position(|b| b.parent.is_none()))
            .ok_or(RagdollError::MissingPelvis)?;

        let mut limbs = Vec::with_capacity(bindings.len());
        for (index, mut binding) in bindings.into_iter().enumerate() {
            if let Some(parent) = binding.parent {
                if parent >= index {
                    return Err(RagdollError::InvalidHierarchy { limb: binding.name, parent });
                }
            }

            let bone_world = match skeleton.bone_world_transform(binding.bone) {
                Some(t) if binding.bone < skeleton.bone_count() => t,
                _ => {
                    return Err(RagdollError::UnknownBone { limb: binding.name, bone: binding.bone });
                }
            };
            let body_world = match solver.body_transform(binding.body) {
                Some(t) if solver.contains_body(binding.body) => t,
                _ => {
                    return Err(RagdollError::UnknownBody { limb: binding.name, body: binding.body });
                }
            };

            binding.pelvis = index == pelvis;
            let body_offset = bone_world.inverse_rigid().mul_rigid(&body_world);
            let kinematic = solver.is_kinematic(binding.body);

            let mut limb = Limb::from_binding(binding, body_offset);
            limb.flags.set(LimbFlags::KINEMATIC, kinematic);
            limb.flags.set(LimbFlags::APPLIED_KINEMATIC, kinematic);
            limb.animated = bone_world;
            limb.physical = bone_world;
            limbs.push(limb);
        }

        let state = BlendState::new(config.initial_blend, config.initial_muscle_power);

        log::info!(
            "Ragdoll 初始化完成: {} 肢体 ({} 运动学), 骨盆 '{}', blend={:.2}, muscle={:.2}",
            limbs.len(),
            limbs.iter().filter(|l| l.is_kinematic()).count(),
            limbs[pelvis].name,
            state.blend,
            state.muscle_power,
        );

        Ok(Self {
            config,
            limbs,
            pelvis,
            state,
            scheduler: TransitionScheduler::new(),
            impacts: ImpactApplicator::new(),
            muscles: MuscleController::new(),
            evaluator: BlendEvaluator::new(),
            pending_switches: Vec::new(),
            get_up_state: GetUpState::None,
        })
    }

    // ========================================
    // 帧更新
    // ========================================

    /// 物理阶段（固定步长，宿主在物理积分之前调用）
    ///
    /// 顺序：过渡/延迟开关推进 → 骨盆锚定 → 运动学同步 → 肌肉驱动 → 冲击力。
    pub fn physics_step(&mut self, dt: f32, host: &mut RagdollHost<'_>) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.scheduler.tick(dt, &mut self.state);
        self.tick_animator_switches(dt, &mut *host.animator);

        self.muscles.update_anchor(
            &mut self.limbs[self.pelvis],
            &self.state,
            self.config.anchor_stiffness,
            self.config.anchor_damping,
            &mut *host.solver,
        );
        MuscleController::sync_kinematic(&mut self.limbs, &mut *host.solver);
        MuscleController::apply_drives(&mut self.limbs, &self.state, &mut *host.solver);
        self.impacts.apply(dt, &self.limbs, &mut *host.solver, self.config.impact_force_mode);
    }

    /// 姿态阶段（宿主在物理积分与动画求值之后调用）
    pub fn pose_step(&mut self, host: &mut RagdollHost<'_>) {
        self.evaluator.apply(
            &mut self.limbs,
            self.state.blend,
            self.state.free_fall,
            &mut *host.skeleton,
            &*host.solver,
        );
    }

    fn tick_animator_switches(&mut self, dt: f32, animator: &mut dyn Animator) {
        if self.pending_switches.is_empty() {
            return;
        }
        for pending in &mut self.pending_switches {
            pending.remaining -= dt;
        }
        // 按请求顺序执行到期的开关
        let mut i = 0;
        while i < self.pending_switches.len() {
            if self.pending_switches[i].remaining <= 0.0 {
                let pending = self.pending_switches.remove(i);
                animator.set_enabled(pending.enabled);
            } else {
                i += 1;
            }
        }
    }

    // ========================================
    // 过渡命令
    // ========================================

    fn start_transition(&mut self, key: ScalarKey, target: f32, duration: f32, delay: f32) {
        let transition = Transition::new(
            key,
            crate::skeleton::clamp01(target),
            duration,
            delay,
            self.config.transition_curve.clone(),
        );
        if self.config.debug_log {
            if self.scheduler.is_running(key) {
                log::debug!("[过渡] {:?} 被新过渡覆盖", key);
            }
            log::debug!(
                "[过渡] {:?} → {:.3} (时长 {:.2}s, 延迟 {:.2}s)",
                key, transition.target, transition.duration, transition.delay
            );
        }
        self.scheduler.start(transition, &mut self.state);
    }

    /// 肌肉力量过渡
    pub fn fade_muscles(&mut self, target: f32, duration: f32, delay: f32) {
        self.start_transition(ScalarKey::MusclePower, target, duration, delay);
    }

    /// 混合值过渡
    pub fn fade_blend(&mut self, target: f32, duration: f32, delay: f32) {
        self.start_transition(ScalarKey::Blend, target, duration, delay);
    }

    /// 强制物理贴合动画
    ///
    /// 立即满强度并保持 `full_delay` 秒，随后在剩余时间内淡出到 0；
    /// 总时长为 `duration`。
    pub fn force_to_animator_for(&mut self, duration: f32, full_delay: f32) {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        let hold = if full_delay.is_finite() { full_delay.clamp(0.0, duration) } else { 0.0 };
        self.start_transition(ScalarKey::ForceToAnimator, 1.0, 0.0, 0.0);
        self.start_transition(ScalarKey::ForceToAnimator, 0.0, duration - hold, hold);
    }

    /// 动画器开关，`delay <= 0` 时立即执行
    pub fn switch_animator(&mut self, animator: &mut dyn Animator, enabled: bool, delay: f32) {
        if delay.is_nan() || delay <= 0.0 {
            animator.set_enabled(enabled);
        } else {
            self.pending_switches.push(PendingSwitch { enabled, remaining: delay });
        }
    }

    pub fn set_free_fall(&mut self, free_fall: bool) {
        self.state.free_fall = free_fall;
    }

    /// 停止所有过渡、冲击与延迟开关；标量停留在最后写入的值
    ///
    /// 例外：进行中的骨盆锚定过渡直接落到目标值（锁定或完全释放）。
    pub fn cancel_all(&mut self) {
        if self.config.debug_log {
            log::debug!(
                "[取消] {} 过渡, {} 冲击, {} 延迟开关",
                self.scheduler.len(), self.impacts.len(), self.pending_switches.len()
            );
        }
        if let Some(anchor) = self.scheduler.get(ScalarKey::PelvisAnchor) {
            let target = anchor.target;
            self.state.set_scalar(ScalarKey::PelvisAnchor, target);
        }
        self.scheduler.cancel_all();
        self.impacts.clear();
        self.pending_switches.clear();
    }

    // ========================================
    // 冲击命令
    // ========================================

    /// 单肢体冲击，`power` 方向为世界空间冲击方向、长度为力度
    pub fn set_limb_impact(&mut self, limb: usize, power: Vec3, duration: f32) -> Result<()> {
        self.set_limb_impact_with(limb, power, duration, ImpactFalloff::Constant)
    }

    pub fn set_limb_impact_with(
        &mut self,
        limb: usize,
        power: Vec3,
        duration: f32,
        falloff: ImpactFalloff,
    ) -> Result<()> {
        if limb >= self.limbs.len() {
            return Err(RagdollError::UnknownLimb(limb));
        }
        self.impacts.push(Impact::new(ImpactTarget::Limb(limb), power, duration, falloff));
        Ok(())
    }

    /// 全身冲击
    pub fn set_physical_impact_all(&mut self, power: Vec3, duration: f32) {
        self.set_physical_impact_all_with(power, duration, ImpactFalloff::Constant);
    }

    pub fn set_physical_impact_all_with(&mut self, power: Vec3, duration: f32, falloff: ImpactFalloff) {
        self.impacts.push(Impact::new(ImpactTarget::All, power, duration, falloff));
    }

    /// 某肢体当前的冲击合力
    pub fn impact_force(&self, limb: usize) -> Vec3 {
        self.impacts.accumulated_force(limb)
    }

    // ========================================
    // 肌肉 / 运动学命令
    // ========================================

    /// 立即设置全部肢体运动学（不经过过渡）
    pub fn set_all_kinematic(&mut self, solver: &mut dyn PhysicsSolver, kinematic: bool) {
        MuscleController::set_all_kinematic(&mut self.limbs, kinematic, solver);
    }

    /// 骨盆锚定 / 解除锚定，`duration` 内平滑过渡
    pub fn anchor_pelvis(&mut self, solver: &mut dyn PhysicsSolver, anchor: bool, duration: f32) -> Result<()> {
        if !self.muscles.request_anchor(anchor, &self.limbs[self.pelvis], &*solver) {
            return Err(RagdollError::UnknownBody {
                limb: self.limbs[self.pelvis].name.clone(),
                body: self.limbs[self.pelvis].body,
            });
        }
        let target = if anchor { 1.0 } else { 0.0 };
        self.start_transition(ScalarKey::PelvisAnchor, target, duration, 0.0);

        // 瞬时锚定/解除在本次调用内生效
        self.muscles.update_anchor(
            &mut self.limbs[self.pelvis],
            &self.state,
            self.config.anchor_stiffness,
            self.config.anchor_damping,
            solver,
        );
        MuscleController::sync_kinematic(&mut self.limbs, solver);
        Ok(())
    }

    // ========================================
    // 根节点重定位
    // ========================================

    /// 把控制器根节点移到物理骨盆处
    pub fn reposition_root(
        &mut self,
        host: &mut RagdollHost<'_>,
        world_up: Option<Vec3>,
        get_up_type: GetUpType,
        ground_mask: Option<GroundMask>,
    ) -> GetUpState {
        let pelvis = &self.limbs[self.pelvis];
        let pelvis_pose = match host.solver.body_transform(pelvis.body) {
            Some(body) => pelvis.bone_from_body(&body),
            None => {
                log::warn!("[重定位] 骨盆刚体 {:?} 不可用，保持根节点不动", pelvis.body);
                return self.get_up_state;
            }
        };

        let root = host.skeleton.root_transform();
        let (new_root, state) = get_up::reposition_root(
            &pelvis_pose,
            &root,
            world_up,
            get_up_type,
            ground_mask,
            host.ground,
            &self.config,
        );
        host.skeleton.set_root_transform(new_root);

        if self.config.debug_log {
            log::debug!(
                "[重定位] 根节点 ({:.2},{:.2},{:.2}) → ({:.2},{:.2},{:.2}), 起身状态 {:?}",
                root.translation.x, root.translation.y, root.translation.z,
                new_root.translation.x, new_root.translation.y, new_root.translation.z,
                state
            );
        }
        self.get_up_state = state;
        state
    }

    // ========================================
    // 生命周期
    // ========================================

    /// 从求解器中移除全部 dummy 刚体
    pub fn teardown(&mut self, solver: &mut dyn PhysicsSolver) {
        self.cancel_all();
        self.muscles.clear_anchor();
        // 子先于父销毁
        for limb in self.limbs.iter().rev() {
            solver.remove_body(limb.body);
        }
        log::info!("Ragdoll dummy 已销毁: {} 刚体", self.limbs.len());
    }

    // ========================================
    // 访问器
    // ========================================

    pub fn config(&self) -> &RagdollConfig {
        &self.config
    }

    pub fn state(&self) -> &BlendState {
        &self.state
    }

    pub fn get_up_state(&self) -> GetUpState {
        self.get_up_state
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    pub fn limb(&self, index: usize) -> Option<&Limb> {
        self.limbs.get(index)
    }

    pub fn pelvis_index(&self) -> usize {
        self.pelvis
    }

    pub fn limb_index_by_body(&self, body: BodyHandle) -> Option<usize> {
        self.limbs.iter().position(|l| l.body == body)
    }

    pub fn limb_index_by_name(&self, name: &str) -> Option<usize> {
        self.limbs.iter().position(|l| l.name == name)
    }

    /// 单肢体混合权重覆盖
    pub fn set_limb_blend_weight(&mut self, limb: usize, weight: f32) -> Result<()> {
        let limb = self.limbs.get_mut(limb).ok_or(RagdollError::UnknownLimb(limb))?;
        limb.set_blend_weight(weight);
        Ok(())
    }

    /// 单肢体肌肉倍率
    pub fn set_limb_muscle_multiplier(&mut self, limb: usize, multiplier: f32) -> Result<()> {
        let limb = self.limbs.get_mut(limb).ok_or(RagdollError::UnknownLimb(limb))?;
        limb.set_muscle_multiplier(multiplier);
        Ok(())
    }

    pub fn is_transition_running(&self, key: ScalarKey) -> bool {
        self.scheduler.is_running(key)
    }

    pub fn parameters(&self) -> Parameters<'_> {
        Parameters {
            state: self.state,
            get_up_state: self.get_up_state,
            running_transitions: self.scheduler.len(),
            active_impacts: self.impacts.len(),
            pending_animator_switches: self.pending_switches.len(),
            limbs: &self.limbs,
        }
    }
}
