//! Rapier3D 物理世界（PhysicsSolver / GroundQuery 参考实现）
//!
//! ## 对应关系
//! | 核心接口 | Rapier |
//! |---------|--------|
//! | BodyHandle | RigidBodyHandle（按生成顺序编号） |
//! | JointHandle | ImpulseJointHandle（球关节） |
//! | set_drive | 每子步把角速度按强度拉向目标旋转 |
//! | set_kinematic | RigidBodyType::KinematicPositionBased / Dynamic |
//! | GroundQuery | 对地面碰撞体逐个射线检测 |

use glam::{Quat, Vec3};
use rapier3d::na::{Point3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::parry::query::RayCast;
use rapier3d::prelude::*;

use super::{BodyHandle, ForceMode, GroundHit, GroundMask, GroundQuery, JointHandle, PhysicsSolver};
use crate::skeleton::BoneTransform;

/// Rapier 世界配置（扁平化）
#[derive(Debug, Clone)]
pub struct RapierWorldConfig {
    /// 重力加速度
    pub gravity: Vec3,
    /// 物理 FPS（固定时间步长 = 1/fps）
    pub fps: f32,
    /// 每次 step 的最大子步数
    pub max_substep_count: u32,
    /// 肌肉驱动收敛速率（1/秒，strength = 1 时），需满足 rate * dt < 2
    pub drive_rate: f32,
    /// 最大线速度，防止穿透后速度爆炸
    pub max_linear_velocity: f32,
    /// 最大角速度
    pub max_angular_velocity: f32,
}

impl Default for RapierWorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fps: 60.0,
            max_substep_count: 4,
            drive_rate: 20.0,
            max_linear_velocity: 30.0,
            max_angular_velocity: 40.0,
        }
    }
}

/// 单个刚体的驱动与待施加外力
#[derive(Debug, Clone, Copy, Default)]
struct BodySlot {
    handle: Option<RigidBodyHandle>,
    /// 下一次 step 施加的力（已换算为牛顿力）
    pending_force: Vec3,
    /// (目标旋转, 强度)
    drive: Option<(Quat, f32)>,
}

/// Rapier ragdoll 世界
pub struct RapierRagdollWorld {
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    gravity: Vector<Real>,
    slots: Vec<BodySlot>,
    joints: Vec<ImpulseJointHandle>,
    /// (碰撞体, 层)
    ground: Vec<(ColliderHandle, u32)>,
    config: RapierWorldConfig,
}

impl RapierRagdollWorld {
    pub fn new(config: RapierWorldConfig) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = 1.0 / config.fps.max(1.0);

        log::info!(
            "[Rapier] FPS={}, 重力=({:.2},{:.2},{:.2}), 最大子步={}",
            config.fps, config.gravity.x, config.gravity.y, config.gravity.z, config.max_substep_count
        );

        Self {
            pipeline: PhysicsPipeline::new(),
            params,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            gravity: to_na_vec(config.gravity),
            slots: Vec::new(),
            joints: Vec::new(),
            ground: Vec::new(),
            config,
        }
    }

    /// 添加水平静态地面（上表面位于 `height`）
    pub fn add_ground(&mut self, height: f32, layers: u32) {
        let body = RigidBodyBuilder::fixed()
            .translation(Vector::new(0.0, height - 0.5, 0.0))
            .build();
        let body = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(500.0, 0.5, 500.0)
            .collision_groups(InteractionGroups::new(Group::from_bits_truncate(layers), Group::ALL))
            .build();
        let collider = self.colliders.insert_with_parent(collider, body, &mut self.bodies);
        self.ground.push((collider, layers));
    }

    /// 生成一个长方体肢体刚体
    ///
    /// 肢体之间不互相碰撞（由关节约束），只与地面碰撞。
    pub fn spawn_limb(&mut self, transform: BoneTransform, half_extents: Vec3, mass: f32) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .position(to_na_iso(&transform))
            .build();
        let body = self.bodies.insert(body);

        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass.max(1e-3))
            .collision_groups(InteractionGroups::new(
                Group::GROUP_32,
                Group::ALL.difference(Group::GROUP_32),
            ))
            .build();
        self.colliders.insert_with_parent(collider, body, &mut self.bodies);

        let handle = BodyHandle(self.slots.len() as u32);
        self.slots.push(BodySlot { handle: Some(body), ..BodySlot::default() });
        handle
    }

    /// 用球关节连接两个肢体，`anchor` 为世界空间连接点
    pub fn connect(&mut self, parent: BodyHandle, child: BodyHandle, anchor: Vec3) -> Option<JointHandle> {
        let h1 = self.rapier_handle(parent)?;
        let h2 = self.rapier_handle(child)?;
        let world = Point3::new(anchor.x, anchor.y, anchor.z);
        let local1 = self.bodies.get(h1)?.position().inverse_transform_point(&world);
        let local2 = self.bodies.get(h2)?.position().inverse_transform_point(&world);

        let joint = SphericalJointBuilder::new()
            .local_anchor1(local1)
            .local_anchor2(local2)
            .build();
        let joint = self.impulse_joints.insert(h1, h2, joint, true);

        let handle = JointHandle(self.joints.len() as u32);
        self.joints.push(joint);
        Some(handle)
    }

    /// 推进模拟
    ///
    /// 按固定步长切分子步；外力在所有子步中持续，结束后清空。
    pub fn step(&mut self, delta_time: f32) {
        if delta_time.is_nan() || delta_time <= 0.0 {
            return;
        }
        let fixed_dt = self.params.dt;
        let substeps = ((delta_time / fixed_dt).ceil() as u32).clamp(1, self.config.max_substep_count.max(1));

        for _ in 0..substeps {
            self.apply_body_forces();
            self.pipeline.step(
                &self.gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd,
                None,
                &(),
                &(),
            );
        }

        for slot in &mut self.slots {
            slot.pending_force = Vec3::ZERO;
            if let Some(rb) = slot.handle.and_then(|h| self.bodies.get_mut(h)) {
                rb.reset_forces(false);
                rb.reset_torques(false);
            }
        }
        self.clamp_velocities();
    }

    /// 写入本子步的外力与肌肉驱动
    fn apply_body_forces(&mut self) {
        let rate = self.config.drive_rate;

        for slot in &self.slots {
            let Some(rb) = slot.handle.and_then(|h| self.bodies.get_mut(h)) else {
                continue;
            };
            rb.reset_forces(false);
            rb.reset_torques(false);
            if !rb.is_dynamic() {
                continue;
            }

            if slot.pending_force.length_squared() > 0.0 {
                rb.add_force(to_na_vec(slot.pending_force), true);
            }

            let Some((target, strength)) = slot.drive else {
                continue;
            };
            if strength <= 0.0 {
                continue;
            }
            let current = to_glam_quat(rb.rotation());
            let mut error = target * current.inverse();
            // 最短弧
            if error.w < 0.0 {
                error = -error;
            }
            let (axis, angle) = error.to_axis_angle();
            let angvel = to_glam_vec(rb.angvel());
            let desired = angvel.lerp(axis * angle * rate, strength);
            if desired.is_finite() {
                rb.set_angvel(to_na_vec(desired), true);
            }
        }
    }

    /// 限制刚体速度，防止物理爆炸
    fn clamp_velocities(&mut self) {
        let max_lin = self.config.max_linear_velocity;
        let max_ang = self.config.max_angular_velocity;

        for slot in &self.slots {
            let Some(rb) = slot.handle.and_then(|h| self.bodies.get_mut(h)) else {
                continue;
            };
            if !rb.is_dynamic() {
                continue;
            }
            let linvel = *rb.linvel();
            let lin = linvel.norm();
            if lin > max_lin {
                rb.set_linvel(linvel * (max_lin / lin), true);
            }
            let angvel = *rb.angvel();
            let ang = angvel.norm();
            if ang > max_ang {
                rb.set_angvel(angvel * (max_ang / ang), true);
            }
        }
    }

    fn rapier_handle(&self, body: BodyHandle) -> Option<RigidBodyHandle> {
        self.slots.get(body.0 as usize).and_then(|slot| slot.handle)
    }

    fn rigid_body(&self, body: BodyHandle) -> Option<&RigidBody> {
        self.rapier_handle(body).and_then(|h| self.bodies.get(h))
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        let handle = self.rapier_handle(body)?;
        self.bodies.get_mut(handle)
    }

    pub fn body_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.handle.is_some()).count()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }
}

impl Default for RapierRagdollWorld {
    fn default() -> Self {
        Self::new(RapierWorldConfig::default())
    }
}

impl PhysicsSolver for RapierRagdollWorld {
    fn contains_body(&self, body: BodyHandle) -> bool {
        self.rigid_body(body).is_some()
    }

    fn body_transform(&self, body: BodyHandle) -> Option<BoneTransform> {
        self.rigid_body(body).map(|rb| from_na_iso(rb.position()))
    }

    fn set_body_transform(&mut self, body: BodyHandle, transform: BoneTransform) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_position(to_na_iso(&transform), true);
        }
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.rigid_body(body).map_or(Vec3::ZERO, |rb| to_glam_vec(rb.linvel()))
    }

    fn is_kinematic(&self, body: BodyHandle) -> bool {
        self.rigid_body(body).is_some_and(|rb| rb.is_kinematic())
    }

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) {
        let Some(rb) = self.rigid_body_mut(body) else {
            return;
        };
        if kinematic {
            rb.set_body_type(RigidBodyType::KinematicPositionBased, true);
            rb.set_linvel(Vector::zeros(), true);
            rb.set_angvel(Vector::zeros(), true);
        } else {
            rb.set_body_type(RigidBodyType::Dynamic, true);
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec3, mode: ForceMode) {
        let Some(mass) = self.rigid_body(body).map(|rb| rb.mass()) else {
            return;
        };
        let force = match mode {
            ForceMode::Force => force,
            ForceMode::Acceleration => force * mass,
        };
        if let Some(slot) = self.slots.get_mut(body.0 as usize) {
            slot.pending_force += force;
        }
    }

    fn set_drive(&mut self, body: BodyHandle, _joint: Option<JointHandle>, target_rotation: Quat, strength: f32) {
        if let Some(slot) = self.slots.get_mut(body.0 as usize) {
            if slot.handle.is_some() {
                slot.drive = Some((target_rotation.normalize(), strength.clamp(0.0, 1.0)));
            }
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        let Some(slot) = self.slots.get_mut(body.0 as usize) else {
            return;
        };
        if let Some(handle) = slot.handle.take() {
            self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
        slot.drive = None;
        slot.pending_force = Vec3::ZERO;
    }
}

impl GroundQuery for RapierRagdollWorld {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: GroundMask) -> Option<GroundHit> {
        let direction = direction.try_normalize()?;
        let ray = Ray::new(Point3::new(origin.x, origin.y, origin.z), to_na_vec(direction));

        let mut best: Option<f32> = None;
        for (handle, layers) in &self.ground {
            if !mask.intersects(*layers) {
                continue;
            }
            let Some(collider) = self.colliders.get(*handle) else {
                continue;
            };
            if let Some(toi) = collider.shape().cast_ray(collider.position(), &ray, max_distance, true) {
                if best.map_or(true, |b| toi < b) {
                    best = Some(toi);
                }
            }
        }

        best.map(|distance| GroundHit {
            point: origin + direction * distance,
            normal: -direction,
            distance,
        })
    }
}

// ============================================================================
// glam ↔ nalgebra
// ============================================================================

#[inline]
fn to_na_vec(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

#[inline]
fn to_glam_vec(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
fn to_glam_quat(q: &UnitQuaternion<Real>) -> Quat {
    let c = q.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

#[inline]
fn to_na_iso(t: &BoneTransform) -> Isometry<Real> {
    let q = t.rotation.normalize();
    Isometry::from_parts(
        Translation3::new(t.translation.x, t.translation.y, t.translation.z),
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

#[inline]
fn from_na_iso(iso: &Isometry<Real>) -> BoneTransform {
    BoneTransform::from_rotation_translation(
        to_glam_quat(&iso.rotation),
        to_glam_vec(&iso.translation.vector),
    )
}
