//! 标量过渡调度器
//!
//! 每个标量最多一条过渡记录，按标量键存放；新过渡覆盖旧过渡（后写者胜），
//! 不排队。调度器由物理步推进，不阻塞帧。

use std::collections::BTreeMap;

use super::easing::{Curve, TransitionCurve};

/// 可过渡的标量
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKey {
    /// 全局混合值
    Blend,
    /// 全局肌肉力量
    MusclePower,
    /// 强制物理贴合动画的覆盖权重
    ForceToAnimator,
    /// 骨盆锚定权重
    PelvisAnchor,
}

/// 过渡读写的标量存储
pub trait ScalarStore {
    fn scalar(&self, key: ScalarKey) -> f32;
    fn set_scalar(&mut self, key: ScalarKey, value: f32);
}

/// 单条过渡记录
#[derive(Clone, Debug)]
pub struct Transition {
    pub key: ScalarKey,
    pub target: f32,
    pub duration: f32,
    /// 剩余延迟（秒）
    pub delay: f32,
    /// 延迟结束后经过的时间
    pub elapsed: f32,
    /// 起始值，延迟结束时采样
    pub start_value: Option<f32>,
    pub curve: TransitionCurve,
}

/// 推进结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStatus {
    /// 仍在延迟中
    Waiting,
    Running,
    Finished,
}

impl Transition {
    pub fn new(key: ScalarKey, target: f32, duration: f32, delay: f32, curve: TransitionCurve) -> Self {
        Self {
            key,
            target,
            duration: sanitize_time(duration),
            delay: sanitize_time(delay),
            elapsed: 0.0,
            start_value: None,
            curve,
        }
    }

    /// 已开始插值（延迟结束）
    #[inline]
    pub fn is_started(&self) -> bool {
        self.start_value.is_some()
    }

    /// 推进 `dt` 秒并写入标量
    ///
    /// 延迟期间不写入；结束时精确写入 `target`。
    pub fn advance(&mut self, dt: f32, store: &mut dyn ScalarStore) -> TransitionStatus {
        let mut dt = sanitize_time(dt);

        if self.delay > 0.0 {
            if dt < self.delay {
                self.delay -= dt;
                return TransitionStatus::Waiting;
            }
            dt -= self.delay;
            self.delay = 0.0;
        }

        let start = *self.start_value.get_or_insert_with(|| store.scalar(self.key));

        self.elapsed += dt;
        if self.elapsed >= self.duration {
            store.set_scalar(self.key, self.target);
            return TransitionStatus::Finished;
        }

        let t = self.curve.value(self.elapsed / self.duration);
        store.set_scalar(self.key, start + (self.target - start) * t);
        TransitionStatus::Running
    }

    /// 当前进度 [0,1]，延迟中为 0
    pub fn progress(&self) -> f32 {
        if !self.is_started() {
            0.0
        } else if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }
}

/// 负数与 NaN 视为 0
#[inline]
fn sanitize_time(t: f32) -> f32 {
    if t.is_nan() { 0.0 } else { t.max(0.0) }
}

/// 过渡调度器
#[derive(Debug, Default)]
pub struct TransitionScheduler {
    transitions: BTreeMap<ScalarKey, Transition>,
}

impl TransitionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动一条过渡，覆盖同一标量上的旧过渡
    ///
    /// 无延迟时立即采样起始值；无延迟且无时长时立即写入目标值，不登记记录。
    pub fn start(&mut self, mut transition: Transition, store: &mut dyn ScalarStore) {
        let key = transition.key;
        self.transitions.remove(&key);

        if transition.delay <= 0.0
            && transition.advance(0.0, store) == TransitionStatus::Finished
        {
            return;
        }
        self.transitions.insert(key, transition);
    }

    /// 推进所有过渡，移除已完成的
    pub fn tick(&mut self, dt: f32, store: &mut dyn ScalarStore) {
        self.transitions
            .retain(|_, transition| transition.advance(dt, store) != TransitionStatus::Finished);
    }

    /// 取消某个标量的过渡，标量停留在最后写入的值
    pub fn cancel(&mut self, key: ScalarKey) -> bool {
        self.transitions.remove(&key).is_some()
    }

    /// 取消全部过渡
    pub fn cancel_all(&mut self) {
        self.transitions.clear();
    }

    pub fn is_running(&self, key: ScalarKey) -> bool {
        self.transitions.contains_key(&key)
    }

    pub fn get(&self, key: ScalarKey) -> Option<&Transition> {
        self.transitions.get(&key)
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
