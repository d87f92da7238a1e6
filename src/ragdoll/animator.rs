//! Ragdoll 动画器（宿主命令层）
//!
//! 包装 RagdollProcessor，负责生命周期与容错：
//! 初始化失败进入"未模拟"状态，无效目标只记录诊断，
//! 宿主对象消失后（低频存活检查）自动销毁 dummy。

use glam::Vec3;

use super::get_up::{GetUpState, GetUpType};
use super::impact::ImpactFalloff;
use super::processor::RagdollProcessor;
use super::{Parameters, RagdollHost};
use crate::physics::{get_config, BodyHandle, GroundMask, PhysicsSolver, RagdollConfig};
use crate::skeleton::{Animator, LimbBinding, SkeletonProvider};
use crate::{RagdollError, Result};

/// 生命周期状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// 初始化失败，所有命令为空操作
    NotSimulated,
    Active,
    /// dummy 已销毁，所有命令为空操作
    Destroyed,
}

/// Ragdoll 动画器
pub struct RagdollAnimator {
    processor: Option<RagdollProcessor>,
    lifecycle: Lifecycle,
    /// 距下一次存活检查的剩余时间
    liveness_timer: f32,
}

impl RagdollAnimator {
    /// 使用全局配置创建
    pub fn new(
        skeleton: &dyn SkeletonProvider,
        solver: &dyn PhysicsSolver,
        bindings: Vec<LimbBinding>,
    ) -> Self {
        Self::with_config(get_config(), skeleton, solver, bindings)
    }

    pub fn with_config(
        config: RagdollConfig,
        skeleton: &dyn SkeletonProvider,
        solver: &dyn PhysicsSolver,
        bindings: Vec<LimbBinding>,
    ) -> Self {
        let liveness_timer = config.liveness_first_check;
        match RagdollProcessor::initialize(config, skeleton, solver, bindings) {
            Ok(processor) => Self {
                processor: Some(processor),
                lifecycle: Lifecycle::Active,
                liveness_timer,
            },
            Err(e) => {
                log::warn!("Ragdoll 初始化失败，角色保持纯动画: {}", e);
                Self {
                    processor: None,
                    lifecycle: Lifecycle::NotSimulated,
                    liveness_timer,
                }
            }
        }
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    /// 处理器只读访问，未模拟或已销毁时返回对应错误
    pub fn processor(&self) -> Result<&RagdollProcessor> {
        match (self.lifecycle, self.processor.as_ref()) {
            (Lifecycle::Active, Some(processor)) => Ok(processor),
            (Lifecycle::Destroyed, _) => Err(RagdollError::Destroyed),
            _ => Err(RagdollError::NotSimulated),
        }
    }

    /// 诊断快照，未激活时为 None
    pub fn parameters(&self) -> Option<Parameters<'_>> {
        self.processor().ok().map(RagdollProcessor::parameters)
    }

    fn active(&mut self, command: &str) -> Option<&mut RagdollProcessor> {
        if self.lifecycle != Lifecycle::Active {
            log::debug!("[{}] 忽略: ragdoll 状态为 {:?}", command, self.lifecycle);
            return None;
        }
        self.processor.as_mut()
    }

    // ========================================
    // 帧更新
    // ========================================

    /// 物理阶段（宿主物理积分之前）
    pub fn physics_step(&mut self, dt: f32, host: &mut RagdollHost<'_>) {
        if self.lifecycle != Lifecycle::Active {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if self.owner_gone(dt, host) {
            log::info!("Ragdoll 宿主对象已不存在，自动销毁 dummy");
            self.destroy(&mut *host.solver);
            return;
        }

        if let Some(processor) = self.processor.as_mut() {
            processor.physics_step(dt, host);
        }
    }

    /// 姿态阶段（宿主物理积分与动画求值之后）
    pub fn pose_step(&mut self, host: &mut RagdollHost<'_>) {
        if self.lifecycle != Lifecycle::Active {
            return;
        }
        if let Some(processor) = self.processor.as_mut() {
            processor.pose_step(host);
        }
    }

    /// 低频存活检查：首次在 `liveness_first_check` 秒后，之后每 `liveness_check_interval` 秒
    fn owner_gone(&mut self, dt: f32, host: &RagdollHost<'_>) -> bool {
        let Some(processor) = self.processor.as_ref() else {
            return false;
        };
        let config = processor.config();
        if !config.auto_destroy {
            return false;
        }

        self.liveness_timer -= dt;
        if self.liveness_timer > 0.0 {
            return false;
        }
        let interval = config.liveness_check_interval.max(f32::EPSILON);
        self.liveness_timer += interval;
        if self.liveness_timer <= 0.0 {
            self.liveness_timer = interval;
        }
        !host.owner.is_alive()
    }

    // ========================================
    // 冲击
    // ========================================

    /// 对指定刚体所属肢体施加冲击
    pub fn set_limb_impact(&mut self, body: BodyHandle, power: Vec3, duration: f32) {
        self.set_limb_impact_with(body, power, duration, ImpactFalloff::Constant);
    }

    /// 指定衰减方式的单肢体冲击
    pub fn set_limb_impact_with(&mut self, body: BodyHandle, power: Vec3, duration: f32, falloff: ImpactFalloff) {
        let Some(processor) = self.active("SetLimbImpact") else {
            return;
        };
        let Some(limb) = processor.limb_index_by_body(body) else {
            log::warn!("[SetLimbImpact] 刚体 {:?} 不属于当前 ragdoll dummy", body);
            return;
        };
        if let Err(e) = processor.set_limb_impact_with(limb, power, duration, falloff) {
            log::warn!("[SetLimbImpact] {}", e);
        }
    }

    /// 全身冲击
    pub fn set_physical_impact_all(&mut self, power: Vec3, duration: f32) {
        self.set_physical_impact_all_with(power, duration, ImpactFalloff::Constant);
    }

    pub fn set_physical_impact_all_with(&mut self, power: Vec3, duration: f32, falloff: ImpactFalloff) {
        if let Some(processor) = self.active("SetPhysicalImpactAll") {
            processor.set_physical_impact_all_with(power, duration, falloff);
        }
    }

    // ========================================
    // 过渡
    // ========================================

    /// 自由落体并把 blend 渐变到 `blend`
    pub fn enable_free_ragdoll(&mut self, blend: f32) {
        if let Some(processor) = self.active("EnableFreeRagdoll") {
            let duration = processor.config().free_ragdoll_fade_duration;
            processor.set_free_fall(true);
            processor.fade_blend(blend, duration, 0.0);
        }
    }

    /// 启用 / 禁用动画器，`delay` 秒后生效
    pub fn switch_animator(&mut self, animator: &mut dyn Animator, enabled: bool, delay: f32) {
        if let Some(processor) = self.active("SwitchAnimator") {
            processor.switch_animator(animator, enabled, delay);
        }
    }

    /// 肌肉力量过渡，`duration` 为 None 时使用 `default_fade_duration`
    pub fn fade_muscles(&mut self, target: f32, duration: Option<f32>, delay: f32) {
        if let Some(processor) = self.active("FadeMuscles") {
            let duration = duration.unwrap_or(processor.config().default_fade_duration);
            processor.fade_muscles(target, duration, delay);
        }
    }

    /// 混合值过渡，`duration` 为 None 时使用 `default_fade_duration`
    pub fn fade_ragdolled_blend(&mut self, target: f32, duration: Option<f32>, delay: f32) {
        if let Some(processor) = self.active("FadeRagdolledBlend") {
            let duration = duration.unwrap_or(processor.config().default_fade_duration);
            processor.fade_blend(target, duration, delay);
        }
    }

    pub fn force_ragdoll_to_animator_for(&mut self, duration: f32, full_delay: f32) {
        if let Some(processor) = self.active("ForceRagdollToAnimatorFor") {
            processor.force_to_animator_for(duration, full_delay);
        }
    }

    /// 停止所有过渡、冲击与延迟开关
    pub fn stop_all(&mut self) {
        if let Some(processor) = self.active("StopAll") {
            processor.cancel_all();
        }
    }

    // ========================================
    // 肌肉 / 运动学
    // ========================================

    /// 单肢体混合权重覆盖（按刚体定位肢体）
    pub fn set_limb_blend_weight(&mut self, body: BodyHandle, weight: f32) {
        let Some(processor) = self.active("SetLimbBlendWeight") else {
            return;
        };
        let Some(limb) = processor.limb_index_by_body(body) else {
            log::warn!("[SetLimbBlendWeight] 刚体 {:?} 不属于当前 ragdoll dummy", body);
            return;
        };
        if let Err(e) = processor.set_limb_blend_weight(limb, weight) {
            log::warn!("[SetLimbBlendWeight] {}", e);
        }
    }

    /// 单肢体肌肉倍率（按刚体定位肢体）
    pub fn set_limb_muscle_multiplier(&mut self, body: BodyHandle, multiplier: f32) {
        let Some(processor) = self.active("SetLimbMuscleMultiplier") else {
            return;
        };
        let Some(limb) = processor.limb_index_by_body(body) else {
            log::warn!("[SetLimbMuscleMultiplier] 刚体 {:?} 不属于当前 ragdoll dummy", body);
            return;
        };
        if let Err(e) = processor.set_limb_muscle_multiplier(limb, multiplier) {
            log::warn!("[SetLimbMuscleMultiplier] {}", e);
        }
    }

    pub fn set_all_kinematic(&mut self, solver: &mut dyn PhysicsSolver, kinematic: bool) {
        if let Some(processor) = self.active("SetAllKinematic") {
            processor.set_all_kinematic(solver, kinematic);
        }
    }

    pub fn anchor_pelvis(&mut self, solver: &mut dyn PhysicsSolver, anchor: bool, duration: f32) {
        let Some(processor) = self.active("AnchorPelvis") else {
            return;
        };
        if let Err(e) = processor.anchor_pelvis(solver, anchor, duration) {
            log::warn!("[AnchorPelvis] {}", e);
        }
    }

    // ========================================
    // 根节点 / 起身
    // ========================================

    pub fn reposition_root(
        &mut self,
        host: &mut RagdollHost<'_>,
        world_up: Option<Vec3>,
        get_up_type: GetUpType,
        ground_mask: Option<GroundMask>,
    ) -> GetUpState {
        match self.active("RepositionRoot") {
            Some(processor) => processor.reposition_root(host, world_up, get_up_type, ground_mask),
            None => GetUpState::None,
        }
    }

    /// 起身序列
    ///
    /// 各步骤只启动不等待，彼此在时间上重叠；取消只在最开始发生一次。
    /// 目标为 None 时使用 `get_up_target_blend` / `get_up_target_muscle_power`。
    pub fn get_up_stack(
        &mut self,
        host: &mut RagdollHost<'_>,
        get_up_type: GetUpType,
        ground_mask: GroundMask,
        target_blend: Option<f32>,
        target_muscle_power: Option<f32>,
    ) -> GetUpState {
        let Some(processor) = self.active("GetUpStack") else {
            return GetUpState::None;
        };
        let config = processor.config().clone();
        let target_blend = target_blend.unwrap_or(config.get_up_target_blend);
        let target_muscle_power = target_muscle_power.unwrap_or(config.get_up_target_muscle_power);

        processor.cancel_all();
        processor.switch_animator(&mut *host.animator, true, 0.0);
        processor.force_to_animator_for(config.get_up_force_duration, config.get_up_force_full_delay);
        processor.set_free_fall(false);
        processor.fade_muscles(
            target_muscle_power,
            config.get_up_muscle_duration,
            config.get_up_muscle_delay,
        );
        processor.fade_blend(target_blend, config.get_up_blend_duration, 0.0);
        let state = processor.reposition_root(host, None, get_up_type, Some(ground_mask));

        if config.debug_log {
            log::debug!(
                "[GetUpStack] {:?} → {:?}, blend → {:.2}, muscle → {:.2}",
                get_up_type, state, target_blend, target_muscle_power
            );
        }
        state
    }

    // ========================================
    // 生命周期
    // ========================================

    /// 销毁 dummy，之后所有命令为空操作
    pub fn destroy(&mut self, solver: &mut dyn PhysicsSolver) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        if let Some(mut processor) = self.processor.take() {
            processor.teardown(solver);
        }
        self.lifecycle = Lifecycle::Destroyed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ScalarKey;
    use crate::test_support::{bindings, Scene};

    const DT: f32 = 1.0 / 60.0;

    fn setup_with(config: RagdollConfig) -> (RagdollAnimator, Scene) {
        let (skeleton, solver, limbs) = bindings();
        let ragdoll = RagdollAnimator::with_config(config, &skeleton, &solver, limbs);
        (ragdoll, Scene::new(skeleton, solver))
    }

    fn setup() -> (RagdollAnimator, Scene) {
        setup_with(RagdollConfig::default())
    }

    fn frame(ragdoll: &mut RagdollAnimator, scene: &mut Scene, dt: f32) {
        ragdoll.physics_step(dt, &mut scene.host());
        scene.solver.step(dt);
        ragdoll.pose_step(&mut scene.host());
    }

    #[test]
    fn test_failed_init_is_not_simulated() {
        let (mut skeleton, solver, limbs) = bindings();
        skeleton.root = None;
        let mut ragdoll = RagdollAnimator::with_config(RagdollConfig::default(), &skeleton, &solver, limbs);
        let mut scene = Scene::new(skeleton, solver);

        assert_eq!(ragdoll.lifecycle(), Lifecycle::NotSimulated);
        assert!(matches!(ragdoll.processor(), Err(RagdollError::NotSimulated)));
        assert!(ragdoll.parameters().is_none());

        // 所有命令均为空操作
        ragdoll.enable_free_ragdoll(1.0);
        ragdoll.set_physical_impact_all(Vec3::Y, 1.0);
        ragdoll.set_all_kinematic(&mut scene.solver, true);
        frame(&mut ragdoll, &mut scene, DT);
        assert!(scene.solver.bodies.values().all(|b| !b.kinematic && b.last_force.is_none() && b.drive.is_none()));
        assert_eq!(scene.skeleton.writes, 0);
    }

    #[test]
    fn test_enable_free_ragdoll() {
        let (mut ragdoll, mut scene) = setup();
        ragdoll.enable_free_ragdoll(1.0);
        for _ in 0..15 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        let params = ragdoll.parameters().unwrap();
        assert!(params.state.free_fall);
        assert_eq!(params.state.blend, 1.0);
        // 自由落体时肌肉不追随动画
        assert!(params.limbs.iter().all(|l| l.muscle_strength() == 0.0));
    }

    #[test]
    fn test_unknown_body_impact_is_noop() {
        let (mut ragdoll, mut scene) = setup();
        ragdoll.set_limb_impact(BodyHandle(999), Vec3::Y * 10.0, 1.0);
        assert_eq!(ragdoll.parameters().unwrap().active_impacts, 0);

        let head = ragdoll.processor().unwrap().limbs()[2].body;
        ragdoll.set_limb_impact(head, Vec3::Y * 10.0, 1.0);
        ragdoll.physics_step(DT, &mut scene.host());
        assert_eq!(scene.solver.pending_force(head), Vec3::Y * 10.0);
    }

    #[test]
    fn test_get_up_stack_cancels_prior_work() {
        let (mut ragdoll, mut scene) = setup();
        ragdoll.enable_free_ragdoll(1.0);
        ragdoll.set_physical_impact_all(Vec3::Y, 5.0);
        ragdoll.fade_muscles(0.0, Some(5.0), 0.0);
        scene.animator.enabled = false;
        for _ in 0..30 {
            frame(&mut ragdoll, &mut scene, DT);
        }

        let state = ragdoll.get_up_stack(&mut scene.host(), GetUpType::FromBack, GroundMask::ALL, Some(0.0), Some(0.85));
        assert_eq!(state, GetUpState::FaceUp);

        let params = ragdoll.parameters().unwrap();
        assert_eq!(params.active_impacts, 0);
        assert!(!params.state.free_fall);
        assert_eq!(params.state.force_to_animator, 1.0);
        assert!(scene.animator.enabled);
        // 动画器立即且只开启一次
        assert_eq!(scene.animator.history, vec![true]);

        // 根节点贴地到骨盆下方
        let processor = ragdoll.processor().unwrap();
        let pelvis = &processor.limbs()[processor.pelvis_index()];
        let body = scene.solver.body_transform(pelvis.body).unwrap();
        let pelvis_pos = pelvis.bone_from_body(&body).translation;
        let root = scene.skeleton.root_transform.translation;
        assert!((root - Vec3::new(pelvis_pos.x, 0.0, pelvis_pos.z)).length() < 1e-4);

        // 肌肉过渡有 0.05 秒延迟
        assert!(processor.is_transition_running(ScalarKey::MusclePower));

        for _ in 0..100 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        let params = ragdoll.parameters().unwrap();
        assert_eq!(params.state.blend, 0.0);
        assert_eq!(params.state.muscle_power, 0.85);
        assert_eq!(params.state.force_to_animator, 0.0);
        assert_eq!(params.running_transitions, 0);
        assert_eq!(scene.animator.history, vec![true]);
    }

    fn pelvis_body(ragdoll: &RagdollAnimator) -> BodyHandle {
        let processor = ragdoll.processor().unwrap();
        processor.limbs()[processor.pelvis_index()].body
    }

    #[test]
    fn test_get_up_stack_settles_anchor_in_flight() {
        let (mut ragdoll, mut scene) = setup();
        let pelvis = pelvis_body(&ragdoll);
        ragdoll.anchor_pelvis(&mut scene.solver, true, 1.0);
        for _ in 0..20 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        let w = ragdoll.parameters().unwrap().state.pelvis_anchor;
        assert!(w > 0.0 && w < 1.0);

        ragdoll.get_up_stack(&mut scene.host(), GetUpType::FromBack, GroundMask::ALL, None, None);
        assert_eq!(ragdoll.parameters().unwrap().state.pelvis_anchor, 1.0);

        for _ in 0..100 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        let processor = ragdoll.processor().unwrap();
        assert!(!processor.is_transition_running(ScalarKey::PelvisAnchor));
        assert!(processor.limbs()[processor.pelvis_index()].is_anchored());
        assert!(scene.solver.is_kinematic(pelvis));

        // 未指定目标时使用配置默认值
        let defaults = RagdollConfig::default();
        let params = ragdoll.parameters().unwrap();
        assert_eq!(params.state.blend, defaults.get_up_target_blend);
        assert_eq!(params.state.muscle_power, defaults.get_up_target_muscle_power);
    }

    #[test]
    fn test_stop_all_settles_anchor_release() {
        let (mut ragdoll, mut scene) = setup();
        let pelvis = pelvis_body(&ragdoll);
        ragdoll.anchor_pelvis(&mut scene.solver, true, 0.0);
        ragdoll.anchor_pelvis(&mut scene.solver, false, 1.0);
        for _ in 0..20 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        assert!(ragdoll.processor().unwrap().is_transition_running(ScalarKey::PelvisAnchor));

        ragdoll.stop_all();
        assert_eq!(ragdoll.parameters().unwrap().state.pelvis_anchor, 0.0);

        // 推开骨盆后不再有拉回旧锚点的弹簧力
        for _ in 0..30 {
            let mut t = scene.solver.body_transform(pelvis).unwrap();
            t.translation.x += 0.1;
            scene.solver.set_body_transform(pelvis, t);
            ragdoll.physics_step(DT, &mut scene.host());
            assert_eq!(scene.solver.pending_force(pelvis), Vec3::ZERO);
            scene.solver.step(DT);
            ragdoll.pose_step(&mut scene.host());
        }
        assert!(!scene.solver.is_kinematic(pelvis));
        let processor = ragdoll.processor().unwrap();
        assert!(!processor.limbs()[processor.pelvis_index()].is_anchored());
    }

    #[test]
    fn test_fade_uses_default_duration() {
        let (mut ragdoll, mut scene) = setup();
        // 默认 0.75 秒
        ragdoll.fade_ragdolled_blend(1.0, None, 0.0);
        for _ in 0..30 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        let blend = ragdoll.parameters().unwrap().state.blend;
        assert!(blend > 0.0 && blend < 1.0);
        for _ in 0..20 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        assert_eq!(ragdoll.parameters().unwrap().state.blend, 1.0);

        ragdoll.fade_muscles(0.0, Some(0.0), 0.0);
        assert_eq!(ragdoll.parameters().unwrap().state.muscle_power, 0.0);
    }

    #[test]
    fn test_limb_overrides_by_body() {
        let (mut ragdoll, mut scene) = setup();
        let head = ragdoll.processor().unwrap().limbs()[2].body;

        ragdoll.set_limb_blend_weight(head, 0.25);
        ragdoll.set_limb_muscle_multiplier(head, 0.5);
        ragdoll.physics_step(DT, &mut scene.host());

        let limb = &ragdoll.processor().unwrap().limbs()[2];
        assert_eq!(limb.blend_weight(), 0.25);
        assert_eq!(limb.muscle_multiplier(), 0.5);
        assert_eq!(scene.solver.drive(head).map(|(_, s)| s), Some(0.5));

        // 未知刚体不影响任何肢体
        ragdoll.set_limb_blend_weight(BodyHandle(999), 0.0);
        ragdoll.set_limb_muscle_multiplier(BodyHandle(999), 0.0);
        let params = ragdoll.parameters().unwrap();
        assert!(params.limbs.iter().all(|l| l.muscle_multiplier() > 0.0));
        assert_eq!(params.limbs.iter().filter(|l| l.blend_weight() < 1.0).count(), 1);

        // 销毁后为空操作
        ragdoll.destroy(&mut scene.solver);
        ragdoll.set_limb_blend_weight(head, 0.0);
        ragdoll.set_limb_muscle_multiplier(head, 0.0);
        assert!(ragdoll.parameters().is_none());
    }

    #[test]
    fn test_linear_falloff_commands() {
        let (mut ragdoll, mut scene) = setup();
        let head = ragdoll.processor().unwrap().limbs()[2].body;
        ragdoll.set_physical_impact_all_with(Vec3::Y * 10.0, 1.0, ImpactFalloff::Linear);
        ragdoll.set_limb_impact_with(head, Vec3::X * 4.0, 2.0, ImpactFalloff::Linear);
        ragdoll.set_limb_impact_with(BodyHandle(999), Vec3::X, 1.0, ImpactFalloff::Linear);
        assert_eq!(ragdoll.parameters().unwrap().active_impacts, 2);

        for _ in 0..30 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        let processor = ragdoll.processor().unwrap();
        let force = processor.impact_force(2);
        assert!((force.y - 5.0).abs() < 0.05);
        assert!((force.x - 3.0).abs() < 0.05);
        assert!((processor.impact_force(0).y - 5.0).abs() < 0.05);
        assert_eq!(processor.impact_force(0).x, 0.0);
    }

    #[test]
    fn test_auto_destroy_on_low_frequency_timer() {
        let (mut ragdoll, mut scene) = setup();
        scene.alive = false;

        // 首次检查在 0.05 秒
        frame(&mut ragdoll, &mut scene, DT);
        frame(&mut ragdoll, &mut scene, DT);
        assert!(ragdoll.is_active());

        frame(&mut ragdoll, &mut scene, DT);
        frame(&mut ragdoll, &mut scene, DT);
        assert_eq!(ragdoll.lifecycle(), Lifecycle::Destroyed);
        assert!(scene.solver.bodies.is_empty());
        assert!(matches!(ragdoll.processor(), Err(RagdollError::Destroyed)));

        // 销毁后的命令不触碰求解器
        ragdoll.set_all_kinematic(&mut scene.solver, true);
        ragdoll.fade_muscles(0.0, Some(1.0), 0.0);
        frame(&mut ragdoll, &mut scene, DT);
    }

    #[test]
    fn test_owner_alive_keeps_running() {
        let (mut ragdoll, mut scene) = setup();
        for _ in 0..120 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        assert!(ragdoll.is_active());

        // 检查间隔内宿主消失，直到下一次检查才销毁
        scene.alive = false;
        frame(&mut ragdoll, &mut scene, DT);
        assert!(ragdoll.is_active());
        for _ in 0..31 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        assert_eq!(ragdoll.lifecycle(), Lifecycle::Destroyed);
    }

    #[test]
    fn test_auto_destroy_disabled() {
        let config = RagdollConfig { auto_destroy: false, ..RagdollConfig::default() };
        let (mut ragdoll, mut scene) = setup_with(config);
        scene.alive = false;
        for _ in 0..60 {
            frame(&mut ragdoll, &mut scene, DT);
        }
        assert!(ragdoll.is_active());
    }

    #[test]
    fn test_explicit_destroy() {
        let (mut ragdoll, mut scene) = setup();
        ragdoll.destroy(&mut scene.solver);
        assert_eq!(ragdoll.lifecycle(), Lifecycle::Destroyed);
        assert!(scene.solver.bodies.is_empty());
        assert_eq!(ragdoll.reposition_root(&mut scene.host(), None, GetUpType::Auto, None), GetUpState::None);
    }

    #[test]
    fn test_kinematic_and_anchor_commands() {
        let (mut ragdoll, mut scene) = setup();
        ragdoll.set_all_kinematic(&mut scene.solver, true);
        assert!(scene.solver.bodies.values().all(|b| b.kinematic));
        ragdoll.set_all_kinematic(&mut scene.solver, false);
        assert!(scene.solver.bodies.values().all(|b| !b.kinematic));

        ragdoll.anchor_pelvis(&mut scene.solver, true, 0.0);
        let pelvis = {
            let processor = ragdoll.processor().unwrap();
            processor.limbs()[processor.pelvis_index()].body
        };
        assert!(scene.solver.is_kinematic(pelvis));
        ragdoll.anchor_pelvis(&mut scene.solver, false, 0.0);
        assert!(!scene.solver.is_kinematic(pelvis));
    }
}
