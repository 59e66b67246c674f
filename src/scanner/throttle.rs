//! # 实时取帧节流模块
//!
//! 相机预览每秒产生几十帧，证件条码识别只需要稳定地处理其中一小部分。
//! 准入规则按顺序判断：
//! 1. 距上次准入不足最小间隔 → `Throttled`
//! 2. 上一帧仍在处理 → `Busy`
//! 3. 否则准入，返回 `FramePermit`，离开作用域时自动清除忙碌标志

use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::error::ScanError;

#[derive(Debug, Default)]
struct GateState {
    last_admitted: Option<Instant>,
    busy: bool,
}

/// 实时取帧准入门。
#[derive(Debug, Default)]
pub struct FrameGate {
    state: Mutex<GateState>,
}

/// 准入结果。
#[derive(Debug)]
pub enum Admission<'a> {
    Admitted(FramePermit<'a>),
    Throttled { since_last: Duration },
    Busy,
}

/// 处理中的帧许可，`Drop` 时释放忙碌标志。
#[derive(Debug)]
pub struct FramePermit<'a> {
    gate: &'a FrameGate,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_admit(&self, min_interval: Duration) -> Result<Admission<'_>, ScanError> {
        self.try_admit_at(Instant::now(), min_interval)
    }

    pub fn try_admit_at(&self, now: Instant, min_interval: Duration) -> Result<Admission<'_>, ScanError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ScanError::Config("取帧节流状态锁已中毒".to_string()))?;

        if let Some(last) = state.last_admitted {
            let since_last = now.saturating_duration_since(last);
            if since_last < min_interval {
                return Ok(Admission::Throttled { since_last });
            }
        }

        if state.busy {
            return Ok(Admission::Busy);
        }

        state.busy = true;
        state.last_admitted = Some(now);
        Ok(Admission::Admitted(FramePermit { gate: self }))
    }
}

impl Drop for FramePermit<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.gate.state.lock() {
            state.busy = false;
        }
    }
}
