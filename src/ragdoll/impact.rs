//! 外力冲击
//!
//! 每条冲击独立计时；同一肢体上的并发冲击按向量相加，不互相替换。

use glam::Vec3;

use crate::physics::{ForceMode, PhysicsSolver};
use crate::skeleton::Limb;

/// 冲击目标
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpactTarget {
    /// 肢体索引
    Limb(usize),
    All,
}

/// 冲击力随时间的衰减方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImpactFalloff {
    #[default]
    Constant,
    /// 从满强度线性衰减到 0
    Linear,
}

/// 单条冲击
#[derive(Clone, Debug)]
pub struct Impact {
    pub target: ImpactTarget,
    /// 世界空间单位方向
    pub direction: Vec3,
    pub magnitude: f32,
    /// 持续时间（秒），0 表示只作用一个物理步
    pub duration: f32,
    pub elapsed: f32,
    pub falloff: ImpactFalloff,
}

impl Impact {
    /// `power` 的方向为冲击方向，长度为力度
    pub fn new(target: ImpactTarget, power: Vec3, duration: f32, falloff: ImpactFalloff) -> Self {
        let magnitude = if power.is_finite() { power.length() } else { 0.0 };
        Self {
            target,
            direction: power.normalize_or_zero(),
            magnitude,
            duration: if duration.is_nan() { 0.0 } else { duration.max(0.0) },
            elapsed: 0.0,
            falloff,
        }
    }

    #[inline]
    pub fn affects(&self, limb: usize) -> bool {
        match self.target {
            ImpactTarget::All => true,
            ImpactTarget::Limb(index) => index == limb,
        }
    }

    /// 当前时刻的力
    pub fn current_force(&self) -> Vec3 {
        let scale = match self.falloff {
            ImpactFalloff::Constant => 1.0,
            ImpactFalloff::Linear if self.duration > 0.0 => {
                (1.0 - self.elapsed / self.duration).clamp(0.0, 1.0)
            }
            ImpactFalloff::Linear => 1.0,
        };
        self.direction * self.magnitude * scale
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// 冲击施加器
#[derive(Debug, Default)]
pub struct ImpactApplicator {
    impacts: Vec<Impact>,
    /// 每肢体合力缓冲区（复用内存）
    force_buf: Vec<Vec3>,
}

impl ImpactApplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, impact: Impact) {
        self.impacts.push(impact);
    }

    /// 某肢体当前的合力（所有活动冲击的向量和）
    pub fn accumulated_force(&self, limb: usize) -> Vec3 {
        self.impacts
            .iter()
            .filter(|impact| impact.affects(limb))
            .map(Impact::current_force)
            .sum()
    }

    /// 施加本物理步的冲击力，然后推进计时并移除过期冲击
    ///
    /// 运动学肢体不受力。
    pub fn apply(&mut self, dt: f32, limbs: &[Limb], solver: &mut dyn PhysicsSolver, mode: ForceMode) {
        if self.impacts.is_empty() {
            return;
        }

        self.force_buf.clear();
        self.force_buf.resize(limbs.len(), Vec3::ZERO);
        for impact in &self.impacts {
            let force = impact.current_force();
            match impact.target {
                ImpactTarget::All => self.force_buf.iter_mut().for_each(|f| *f += force),
                ImpactTarget::Limb(index) => {
                    if let Some(f) = self.force_buf.get_mut(index) {
                        *f += force;
                    }
                }
            }
        }

        for (limb, force) in limbs.iter().zip(&self.force_buf) {
            if limb.wants_kinematic() || force.length_squared() == 0.0 {
                continue;
            }
            solver.apply_force(limb.body, *force, mode);
        }

        let dt = if dt.is_nan() { 0.0 } else { dt.max(0.0) };
        for impact in &mut self.impacts {
            impact.elapsed += dt;
        }
        // 零时长冲击在施加一次后即过期
        self.impacts.retain(|impact| !impact.is_expired());
    }

    pub fn clear(&mut self) {
        self.impacts.clear();
    }

    pub fn len(&self) -> usize {
        self.impacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty()
    }
}
