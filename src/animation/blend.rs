//! 姿态混合
//!
//! 每个后期帧对每个肢体计算
//! `final = lerp(animated, physical, global_blend * limb_weight)`，
//! 并按层级顺序（父先于子）写回动画骨骼。

use crate::physics::PhysicsSolver;
use crate::skeleton::{BoneId, BoneTransform, Limb, SkeletonProvider};

/// 姿态混合器
#[derive(Debug, Default)]
pub struct BlendEvaluator {
    /// 写回结果缓冲区（复用内存）
    write_buf: Vec<(BoneId, BoneTransform)>,
}

impl BlendEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单肢体有效混合值
    ///
    /// 自由落体且全局 blend 为 1 时忽略单肢体权重，完全使用物理姿态。
    #[inline]
    pub fn effective_blend(global_blend: f32, limb_weight: f32, free_fall: bool) -> f32 {
        if free_fall && global_blend >= 1.0 {
            1.0
        } else {
            (global_blend * limb_weight).clamp(0.0, 1.0)
        }
    }

    /// 计算单肢体最终变换（世界空间）
    #[inline]
    pub fn evaluate(limb: &Limb, global_blend: f32, free_fall: bool) -> BoneTransform {
        let w = Self::effective_blend(global_blend, limb.blend_weight(), free_fall);
        limb.animated.blend(&limb.physical, w)
    }

    /// 采样动画姿态（在任何写回之前完成，避免读到被父骨骼带动的子骨骼）
    pub fn sample_animated(limbs: &mut [Limb], skeleton: &dyn SkeletonProvider) {
        for limb in limbs.iter_mut() {
            if let Some(t) = skeleton.bone_world_transform(limb.bone) {
                limb.animated = t;
            }
        }
    }

    /// 读回物理姿态（刚体变换换算回骨骼坐标系）
    pub fn sample_physical(limbs: &mut [Limb], solver: &dyn PhysicsSolver) {
        for limb in limbs.iter_mut() {
            if let Some(body) = solver.body_transform(limb.body) {
                let mut bone = limb.bone_from_body(&body);
                bone.scale = limb.animated.scale;
                limb.physical = bone;
            }
        }
    }

    /// 混合并写回骨骼
    ///
    /// `global_blend == 0` 时不读取物理姿态也不写回（骨骼保持动画结果）。
    /// 返回写回的骨骼数量。
    pub fn apply(
        &mut self,
        limbs: &mut [Limb],
        global_blend: f32,
        free_fall: bool,
        skeleton: &mut dyn SkeletonProvider,
        solver: &dyn PhysicsSolver,
    ) -> usize {
        Self::sample_animated(limbs, skeleton);
        if global_blend <= 0.0 {
            return 0;
        }
        Self::sample_physical(limbs, solver);

        self.write_buf.clear();
        for limb in limbs.iter() {
            let w = Self::effective_blend(global_blend, limb.blend_weight(), free_fall);
            if w <= 0.0 {
                continue;
            }
            self.write_buf.push((limb.bone, limb.animated.blend(&limb.physical, w)));
        }

        for (bone, transform) in &self.write_buf {
            skeleton.set_bone_world_transform(*bone, *transform);
        }
        self.write_buf.len()
    }
}
