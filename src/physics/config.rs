//! Ragdoll 配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! 每个实例在创建时复制一份（`RagdollAnimator::new` 读取全局配置）。

use glam::Vec3;
use once_cell::sync::Lazy;
use std::sync::RwLock;

use super::ForceMode;
use crate::animation::TransitionCurve;

/// Ragdoll 配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct RagdollConfig {
    // ========== 初始状态 ==========
    /// 初始混合值，0 = 纯动画，1 = 纯物理
    pub initial_blend: f32,
    /// 初始肌肉力量
    pub initial_muscle_power: f32,

    // ========== 过渡 ==========
    /// 未指定时长时的默认过渡时长（秒）
    pub default_fade_duration: f32,
    /// EnableFreeRagdoll 的混合过渡时长（秒）
    pub free_ragdoll_fade_duration: f32,
    /// 过渡曲线（必须单调，首尾精确）
    pub transition_curve: TransitionCurve,

    // ========== 起身序列 ==========
    /// 强制物理贴合动画的总时长
    pub get_up_force_duration: f32,
    /// 强制贴合满强度保持时长
    pub get_up_force_full_delay: f32,
    /// 肌肉淡入时长
    pub get_up_muscle_duration: f32,
    /// 肌肉淡入延迟
    pub get_up_muscle_delay: f32,
    /// 混合淡出时长
    pub get_up_blend_duration: f32,
    /// 默认目标混合值
    pub get_up_target_blend: f32,
    /// 默认目标肌肉力量
    pub get_up_target_muscle_power: f32,

    // ========== 根节点重定位 ==========
    /// 世界上方向
    pub world_up: Vec3,
    /// 骨盆局部"正面"轴（朝上 = 仰躺）
    pub pelvis_facing_axis: Vec3,
    /// 骨盆局部"脊柱"轴（指向头部）
    pub pelvis_spine_axis: Vec3,
    /// 射线起点抬高量
    pub ground_ray_offset: f32,
    /// 射线最大长度
    pub ground_ray_distance: f32,

    // ========== 骨盆锚定 ==========
    /// 锚定过渡中的弹簧刚度（加速度 / 米）
    pub anchor_stiffness: f32,
    /// 锚定过渡中的阻尼
    pub anchor_damping: f32,

    // ========== 冲击 ==========
    /// 冲击力施加方式，默认与质量无关
    pub impact_force_mode: ForceMode,

    // ========== 生命周期 ==========
    /// 宿主销毁后自动销毁 dummy
    pub auto_destroy: bool,
    /// 首次存活检查延迟（秒）
    pub liveness_first_check: f32,
    /// 存活检查间隔（秒）
    pub liveness_check_interval: f32,

    // ========== 调试 ==========
    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            // ====== 初始状态 ======
            initial_blend: 0.0,
            initial_muscle_power: 1.0,

            // ====== 过渡 ======
            default_fade_duration: 0.75,
            free_ragdoll_fade_duration: 0.2,
            transition_curve: TransitionCurve::Linear,

            // ====== 起身序列 ======
            // 强制贴合 0.75 秒，其中前 0.2 秒满强度
            get_up_force_duration: 0.75,
            get_up_force_full_delay: 0.2,
            // 肌肉比混合稍晚开始、稍早结束，避免起身动画被物理拖拽
            get_up_muscle_duration: 1.0,
            get_up_muscle_delay: 0.05,
            get_up_blend_duration: 1.25,
            get_up_target_blend: 0.0,
            get_up_target_muscle_power: 0.85,

            // ====== 根节点重定位 ======
            world_up: Vec3::Y,
            pelvis_facing_axis: Vec3::Z,
            pelvis_spine_axis: Vec3::Y,
            ground_ray_offset: 0.5,
            ground_ray_distance: 3.0,

            // ====== 骨盆锚定 ======
            anchor_stiffness: 400.0,
            anchor_damping: 40.0,

            // ====== 冲击 ======
            impact_force_mode: ForceMode::Acceleration,

            // ====== 生命周期 ======
            auto_destroy: true,
            liveness_first_check: 0.05,
            liveness_check_interval: 0.5,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static RAGDOLL_CONFIG: Lazy<RwLock<RagdollConfig>> = Lazy::new(|| {
    RwLock::new(RagdollConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> RagdollConfig {
    RAGDOLL_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: RagdollConfig) {
    *RAGDOLL_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *RAGDOLL_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = RagdollConfig::default();
}
