//! 测试用内存协作者
//!
//! 骨骼、求解器、动画器、地面均为最简实现：
//! 求解器只做显式欧拉积分（无重力、无碰撞），并记录驱动与外力写入。

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::physics::{
    BodyHandle, ForceMode, GroundHit, GroundMask, GroundQuery, JointHandle, PhysicsSolver,
    RagdollConfig,
};
use crate::ragdoll::{RagdollHost, RagdollProcessor};
use crate::skeleton::{Animator, BoneId, BoneTransform, LimbBinding, SkeletonProvider};

// ============================================================================
// 骨骼
// ============================================================================

/// 扁平骨骼：每根骨骼只存世界变换，写父骨骼不会带动子骨骼
#[derive(Debug, Clone)]
pub struct MockSkeleton {
    pub bones: Vec<BoneTransform>,
    pub root: Option<BoneId>,
    pub root_transform: BoneTransform,
    /// 写回计数
    pub writes: usize,
}

impl MockSkeleton {
    pub fn new(bone_count: usize) -> Self {
        Self {
            bones: vec![BoneTransform::IDENTITY; bone_count],
            root: Some(0),
            root_transform: BoneTransform::IDENTITY,
            writes: 0,
        }
    }
}

impl SkeletonProvider for MockSkeleton {
    fn bone_count(&self) -> usize {
        self.bones.len()
    }

    fn root_bone(&self) -> Option<BoneId> {
        self.root
    }

    fn bone_world_transform(&self, bone: BoneId) -> Option<BoneTransform> {
        self.bones.get(bone).copied()
    }

    fn set_bone_world_transform(&mut self, bone: BoneId, transform: BoneTransform) {
        if let Some(slot) = self.bones.get_mut(bone) {
            *slot = transform;
            self.writes += 1;
        }
    }

    fn root_transform(&self) -> BoneTransform {
        self.root_transform
    }

    fn set_root_transform(&mut self, transform: BoneTransform) {
        self.root_transform = transform;
    }
}

// ============================================================================
// 求解器
// ============================================================================

#[derive(Debug, Clone)]
pub struct MockBody {
    pub transform: BoneTransform,
    pub velocity: Vec3,
    pub kinematic: bool,
    pub mass: f32,
    /// 本步累计的外力（原始向量，未按模式换算）
    pub pending: Vec3,
    /// 本步累计的加速度
    pub accel: Vec3,
    pub last_force: Option<(Vec3, ForceMode)>,
    pub drive: Option<(Quat, f32)>,
    pub joint: Option<JointHandle>,
}

#[derive(Debug, Default)]
pub struct MockSolver {
    pub bodies: BTreeMap<BodyHandle, MockBody>,
    next: u32,
    pub kinematic_writes: usize,
}

impl MockSolver {
    pub fn add_body(&mut self, transform: BoneTransform, mass: f32) -> BodyHandle {
        let handle = BodyHandle(self.next);
        self.next += 1;
        self.bodies.insert(
            handle,
            MockBody {
                transform,
                velocity: Vec3::ZERO,
                kinematic: false,
                mass,
                pending: Vec3::ZERO,
                accel: Vec3::ZERO,
                last_force: None,
                drive: None,
                joint: None,
            },
        );
        handle
    }

    /// 积分一步并清空外力
    pub fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            if !body.kinematic {
                body.velocity += body.accel * dt;
                body.transform.translation += body.velocity * dt;
            }
            body.pending = Vec3::ZERO;
            body.accel = Vec3::ZERO;
        }
    }

    pub fn pending_force(&self, body: BodyHandle) -> Vec3 {
        self.bodies.get(&body).map_or(Vec3::ZERO, |b| b.pending)
    }

    pub fn last_force(&self, body: BodyHandle) -> Option<(Vec3, ForceMode)> {
        self.bodies.get(&body).and_then(|b| b.last_force)
    }

    pub fn drive(&self, body: BodyHandle) -> Option<(Quat, f32)> {
        self.bodies.get(&body).and_then(|b| b.drive)
    }
}

impl PhysicsSolver for MockSolver {
    fn contains_body(&self, body: BodyHandle) -> bool {
        self.bodies.contains_key(&body)
    }

    fn body_transform(&self, body: BodyHandle) -> Option<BoneTransform> {
        self.bodies.get(&body).map(|b| b.transform)
    }

    fn set_body_transform(&mut self, body: BodyHandle, transform: BoneTransform) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.transform = transform;
        }
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.bodies.get(&body).map_or(Vec3::ZERO, |b| b.velocity)
    }

    fn is_kinematic(&self, body: BodyHandle) -> bool {
        self.bodies.get(&body).is_some_and(|b| b.kinematic)
    }

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.kinematic = kinematic;
            if kinematic {
                b.velocity = Vec3::ZERO;
            }
            self.kinematic_writes += 1;
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec3, mode: ForceMode) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pending += force;
            b.accel += match mode {
                ForceMode::Force => force / b.mass.max(1e-6),
                ForceMode::Acceleration => force,
            };
            b.last_force = Some((force, mode));
        }
    }

    fn set_drive(&mut self, body: BodyHandle, joint: Option<JointHandle>, target_rotation: Quat, strength: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.drive = Some((target_rotation, strength));
            b.joint = joint;
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
    }
}

// ============================================================================
// 动画器 / 地面
// ============================================================================

#[derive(Debug, Default)]
pub struct MockAnimator {
    pub enabled: bool,
    /// set_enabled 调用记录
    pub history: Vec<bool>,
}

impl Animator for MockAnimator {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.history.push(enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// 水平无限地面（y = height）
#[derive(Debug, Clone, Copy)]
pub struct FlatGround {
    pub height: f32,
    pub layers: u32,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height, layers: 1 }
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }
}

impl GroundQuery for FlatGround {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: GroundMask) -> Option<GroundHit> {
        if !mask.intersects(self.layers) || direction.y >= 0.0 {
            return None;
        }
        let distance = (origin.y - self.height) / -direction.y;
        if !(0.0..=max_distance).contains(&distance) {
            return None;
        }
        Some(GroundHit {
            point: origin + direction * distance,
            normal: Vec3::Y,
            distance,
        })
    }
}

// ============================================================================
// 场景 / 人形夹具
// ============================================================================

pub struct Scene {
    pub skeleton: MockSkeleton,
    pub solver: MockSolver,
    pub animator: MockAnimator,
    pub ground: FlatGround,
    pub alive: bool,
}

impl Scene {
    pub fn new(skeleton: MockSkeleton, solver: MockSolver) -> Self {
        Self {
            skeleton,
            solver,
            animator: MockAnimator { enabled: true, history: Vec::new() },
            ground: FlatGround::new(0.0),
            alive: true,
        }
    }

    pub fn host(&mut self) -> RagdollHost<'_> {
        RagdollHost {
            skeleton: &mut self.skeleton,
            animator: &mut self.animator,
            solver: &mut self.solver,
            ground: &self.ground,
            owner: &self.alive,
        }
    }
}

pub struct Fixture {
    pub processor: RagdollProcessor,
    pub scene: Scene,
}

impl Fixture {
    pub fn split(&mut self) -> (&mut RagdollProcessor, RagdollHost<'_>) {
        let Fixture { processor, scene } = self;
        (processor, scene.host())
    }

    /// 完整一帧：物理阶段 → 积分 → 姿态阶段
    pub fn frame(&mut self, dt: f32) {
        let (processor, mut host) = self.split();
        processor.physics_step(dt, &mut host);
        self.scene.solver.step(dt);
        let (processor, mut host) = self.split();
        processor.pose_step(&mut host);
    }
}

/// 骨骼：0 根, 1 骨盆, 2 脊柱, 3 头, 4 左腿, 5 右腿
const HUMANOID_BONES: [(&str, Vec3); 6] = [
    ("root", Vec3::ZERO),
    ("pelvis", Vec3::new(0.0, 1.0, 0.0)),
    ("spine", Vec3::new(0.0, 1.3, 0.0)),
    ("head", Vec3::new(0.0, 1.6, 0.0)),
    ("left_leg", Vec3::new(-0.1, 0.5, 0.0)),
    ("right_leg", Vec3::new(0.1, 0.5, 0.0)),
];

/// 五肢体人形 dummy 的骨骼、求解器与绑定（未初始化）
pub fn bindings() -> (MockSkeleton, MockSolver, Vec<LimbBinding>) {
    let mut skeleton = MockSkeleton::new(HUMANOID_BONES.len());
    for (slot, (_, position)) in skeleton.bones.iter_mut().zip(HUMANOID_BONES) {
        *slot = BoneTransform::from_rotation_translation(Quat::IDENTITY, position);
    }

    // 刚体相对骨骼有少量偏移，检验偏移换算
    let offset = BoneTransform::from_rotation_translation(
        Quat::from_rotation_x(0.1),
        Vec3::new(0.0, 0.05, 0.0),
    );

    let mut solver = MockSolver::default();
    let mut limbs: Vec<LimbBinding> = Vec::new();
    // (骨骼, 父肢体)
    let layout: [(BoneId, Option<usize>); 5] = [(1, None), (2, Some(0)), (3, Some(1)), (4, Some(0)), (5, Some(0))];
    for (index, (bone, parent)) in layout.into_iter().enumerate() {
        let body_world = skeleton.bones[bone].mul_rigid(&offset);
        let body = solver.add_body(body_world, 5.0);
        let binding = LimbBinding::new(HUMANOID_BONES[bone].0, bone, body);
        let binding = match parent {
            Some(parent) => binding.with_joint(JointHandle(index as u32), parent),
            None => binding.as_pelvis(),
        };
        limbs.push(binding);
    }
    (skeleton, solver, limbs)
}

pub fn humanoid() -> Fixture {
    humanoid_with(RagdollConfig::default())
}

pub fn humanoid_with(config: RagdollConfig) -> Fixture {
    let (skeleton, solver, limbs) = bindings();
    let processor = match RagdollProcessor::initialize(config, &skeleton, &solver, limbs) {
        Ok(processor) => processor,
        Err(e) => panic!("humanoid fixture failed to initialize: {e}"),
    };
    Fixture { processor, scene: Scene::new(skeleton, solver) }
}
