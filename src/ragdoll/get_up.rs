//! 根节点重定位 / 起身状态
//!
//! 倒地后把角色控制器根节点移到物理骨盆处（可选贴地），
//! 并根据骨盆朝向决定起身路径（仰躺 / 俯卧）。

use glam::{Mat3, Quat, Vec3};

use crate::physics::{GroundMask, GroundQuery, RagdollConfig};
use crate::skeleton::BoneTransform;

/// 起身请求提示
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GetUpType {
    /// 只重定位，不选择起身路径
    #[default]
    None,
    /// 采样骨盆朝向自动选择
    Auto,
    /// 强制按仰躺起身
    FromBack,
    /// 强制按俯卧起身
    FromFacedown,
}

/// 起身状态（驱动宿主播放哪段起身动画）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GetUpState {
    #[default]
    None,
    /// 仰躺（正面朝上）
    FaceUp,
    /// 俯卧（正面朝下）
    FaceDown,
}

/// 采样骨盆朝向：正面轴与世界上方向同侧为仰躺
pub fn sample_get_up_state(pelvis_rotation: Quat, facing_axis: Vec3, world_up: Vec3) -> GetUpState {
    let facing = pelvis_rotation * facing_axis;
    if facing.dot(world_up) >= 0.0 {
        GetUpState::FaceUp
    } else {
        GetUpState::FaceDown
    }
}

/// 以 `forward`（+Z）与 `up`（+Y）构造旋转；两者共线时返回 None
pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    let z = forward.try_normalize()?;
    let x = up.cross(z).try_normalize()?;
    let y = z.cross(x);
    Some(Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize())
}

/// 把 `v` 投影到以 `up` 为法线的平面
#[inline]
fn flatten(v: Vec3, up: Vec3) -> Vec3 {
    v - up * v.dot(up)
}

/// 计算新的根节点变换
///
/// # 参数
/// - `pelvis`: 骨盆物理姿态（骨骼坐标系，世界空间）
/// - `root`: 当前根节点变换
/// - `world_up`: 重新对齐的上方向，None 时使用配置值
/// - `get_up_type`: 非 None 时额外选择起身路径并朝向它
/// - `ground_mask`: Some 时从骨盆向下射线检测贴地
pub fn reposition_root(
    pelvis: &BoneTransform,
    root: &BoneTransform,
    world_up: Option<Vec3>,
    get_up_type: GetUpType,
    ground_mask: Option<GroundMask>,
    ground: &dyn GroundQuery,
    config: &RagdollConfig,
) -> (BoneTransform, GetUpState) {
    let up = world_up
        .and_then(Vec3::try_normalize)
        .or_else(|| config.world_up.try_normalize())
        .unwrap_or(Vec3::Y);

    let state = match get_up_type {
        GetUpType::None => GetUpState::None,
        GetUpType::Auto => sample_get_up_state(pelvis.rotation, config.pelvis_facing_axis, up),
        GetUpType::FromBack => GetUpState::FaceUp,
        GetUpType::FromFacedown => GetUpState::FaceDown,
    };

    // 默认保持原根节点高度
    let pelvis_pos = pelvis.translation;
    let mut position = pelvis_pos - up * (pelvis_pos - root.translation).dot(up);

    if let Some(mask) = ground_mask {
        let origin = pelvis_pos + up * config.ground_ray_offset;
        let max_distance = config.ground_ray_offset + config.ground_ray_distance;
        if let Some(hit) = ground.raycast(origin, -up, max_distance, mask) {
            position = hit.point;
        }
    }

    let spine = pelvis.rotation * config.pelvis_spine_axis;
    let rotation = match state {
        // 仰躺起身时角色面向脚的方向，俯卧时面向头的方向
        GetUpState::FaceUp => look_rotation(flatten(-spine, up), up),
        GetUpState::FaceDown => look_rotation(flatten(spine, up), up),
        GetUpState::None if world_up.is_some() => {
            look_rotation(flatten(root.rotation * Vec3::Z, up), up)
        }
        GetUpState::None => None,
    }
    .unwrap_or(root.rotation);

    let new_root = BoneTransform {
        translation: position,
        rotation,
        scale: root.scale,
    };
    (new_root, state)
}
