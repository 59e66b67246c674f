//! # 级联控制器模块
//!
//! ## 设计思路
//!
//! 三档检测按固定顺序串行执行：原图 → 增强对比度 → 极高对比度，
//! 任意一档得到非空结果立即收敛，后续变体不会被构建。
//!
//! 控制流写成显式状态机：`Attempt(Original)`、`Attempt(Enhanced)`、
//! `Attempt(HighContrast)` 与终态，状态转移由纯函数 `transition` 决定，
//! 不依赖任何引擎即可单测。
//!
//! ## 实现思路
//!
//! - 原图变体贯穿整次调用；增强变体在本档检测结束后立即释放，
//!   因此同一时刻最多存活两个变体。
//! - 前两档的检测失败只记日志并推进；最后一档失败上转为 `ScanError::Detector`。
//! - 三档全部为空返回 `ScanOutcome::NotFound`，这是正常结果而非错误。

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::config::ScanConfig;
use super::detector::{DetectedBarcode, Detector};
use super::error::{DetectorError, ScanError};
use super::source::{DecodedFrame, Rotation};
use super::variant::{ImageVariant, Tier, VariantLedger, VariantUsage};

/// 三档全部未命中时返回给前端的固定文本。
pub const NO_BARCODES_FOUND: &str = "no barcodes found";

/// 级联结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Found {
        tier: Tier,
        barcodes: Vec<DetectedBarcode>,
    },
    NotFound,
}

impl ScanOutcome {
    /// 转换为前端约定的响应文本：命中时按换行拼接原始内容。
    pub fn to_response(&self) -> String {
        match self {
            Self::Found { barcodes, .. } => barcodes
                .iter()
                .map(|barcode| barcode.raw_value.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::NotFound => NO_BARCODES_FOUND.to_string(),
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Found { tier, .. } => Some(*tier),
            Self::NotFound => None,
        }
    }

    /// 命中档位名称，未命中返回 `None`。
    pub fn tier_name(&self) -> Option<&'static str> {
        self.tier().map(Tier::as_str)
    }
}

/// 单档尝试记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierAttempt {
    pub tier: Tier,
    pub found: usize,
    pub failure: Option<String>,
    pub elapsed_ms: u64,
}

/// 单次扫描报告。
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub rotation: Rotation,
    pub attempts: Vec<TierAttempt>,
    pub variants: VariantUsage,
    pub elapsed_ms: u64,
}

/// 级联进度事件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    TierStarted { tier: Tier },
    TierFinished { tier: Tier, found: usize, failed: bool },
}

/// 状态机状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Attempt(Tier),
    Resolved,
}

/// 一档结束后的去向。
#[derive(Debug, PartialEq, Eq)]
pub enum Transition {
    /// 命中，或最后一档为空（`NotFound`）。
    Resolve(ScanOutcome),
    /// 推进到下一档。
    Advance(Tier),
    /// 最后一档检测失败。
    Fail(DetectorError),
}

/// 根据当前档位与本档结果决定下一步。
pub fn transition(tier: Tier, result: Result<Vec<DetectedBarcode>, DetectorError>) -> Transition {
    match (result, tier.next()) {
        (Ok(barcodes), _) if !barcodes.is_empty() => Transition::Resolve(ScanOutcome::Found { tier, barcodes }),
        (Ok(_), Some(next)) => Transition::Advance(next),
        (Ok(_), None) => Transition::Resolve(ScanOutcome::NotFound),
        (Err(_), Some(next)) => Transition::Advance(next),
        (Err(error), None) => Transition::Fail(error),
    }
}

/// 级联控制器，持有可复用的检测引擎句柄。
pub struct ScanCascade<D: Detector> {
    detector: Arc<D>,
}

impl<D: Detector> ScanCascade<D> {
    pub fn new(detector: Arc<D>) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// 运行完整级联。
    pub async fn run<F>(
        &self,
        frame: DecodedFrame,
        config: &ScanConfig,
        on_event: F,
    ) -> Result<ScanReport, ScanError>
    where
        F: Fn(ScanEvent) + Send + Sync,
    {
        self.run_with_ledger(frame, config, VariantLedger::new(), on_event).await
    }

    /// 使用调用方提供的账本运行级联，便于在任意结果下核对变体释放情况。
    pub async fn run_with_ledger<F>(
        &self,
        frame: DecodedFrame,
        config: &ScanConfig,
        ledger: Arc<VariantLedger>,
        on_event: F,
    ) -> Result<ScanReport, ScanError>
    where
        F: Fn(ScanEvent) + Send + Sync,
    {
        let started = Instant::now();
        let rotation = frame.rotation;
        let mut attempts = Vec::with_capacity(Tier::ORDER.len());

        let resolved = {
            let original = ImageVariant::original(frame.image, Arc::clone(&ledger));
            let mut state = CascadeState::Attempt(Tier::Original);
            let mut resolved = None;

            while let CascadeState::Attempt(tier) = state {
                on_event(ScanEvent::TierStarted { tier });
                let attempt_start = Instant::now();

                let result = match config.tone_for(tier) {
                    None => self.attempt(&original, rotation, config).await,
                    Some(curve) => {
                        let variant = ImageVariant::derive(&original, tier, curve);
                        self.attempt(&variant, rotation, config).await
                    }
                };

                let elapsed_ms = attempt_start.elapsed().as_millis() as u64;
                let (found, failure) = match &result {
                    Ok(barcodes) => (barcodes.len(), None),
                    Err(error) => (0, Some(error.to_string())),
                };
                on_event(ScanEvent::TierFinished {
                    tier,
                    found,
                    failed: failure.is_some(),
                });
                attempts.push(TierAttempt {
                    tier,
                    found,
                    failure,
                    elapsed_ms,
                });

                match transition(tier, result) {
                    Transition::Resolve(outcome) => {
                        resolved = Some(Ok(outcome));
                        state = CascadeState::Resolved;
                    }
                    Transition::Advance(next) => {
                        log::debug!("🔁 {}档未命中，推进到{}档", tier.as_str(), next.as_str());
                        state = CascadeState::Attempt(next);
                    }
                    Transition::Fail(error) => {
                        resolved = Some(Err(error));
                        state = CascadeState::Resolved;
                    }
                }
            }

            resolved
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let outcome = match resolved {
            Some(Ok(outcome)) => outcome,
            Some(Err(error)) => {
                log::error!("🚨 所有档位检测失败，耗时 {}ms：{}", elapsed_ms, error);
                return Err(error.into());
            }
            None => return Err(ScanError::Detector("级联未产生结果".to_string())),
        };

        match &outcome {
            ScanOutcome::Found { tier, barcodes } => {
                for barcode in barcodes {
                    log::info!(
                        "🎯 命中条码（{}）：{} = {}",
                        tier.as_str(),
                        barcode.format.as_str(),
                        barcode.raw_value
                    );
                }
            }
            ScanOutcome::NotFound => log::info!("🔍 三档均未发现条码，耗时 {}ms", elapsed_ms),
        }

        Ok(ScanReport {
            outcome,
            rotation,
            attempts,
            variants: ledger.usage(),
            elapsed_ms,
        })
    }

    async fn attempt(
        &self,
        variant: &ImageVariant,
        rotation: Rotation,
        config: &ScanConfig,
    ) -> Result<Vec<DetectedBarcode>, DetectorError> {
        let result = self.detector.detect(variant, rotation, &config.formats).await;
        match &result {
            Ok(barcodes) => log::debug!(
                "🚀 {}档检测完成（{}）：{} 个结果",
                variant.tier().as_str(),
                self.detector.name(),
                barcodes.len()
            ),
            Err(error) => log::warn!(
                "⚠️ {}档检测失败（{}）：{}",
                variant.tier().as_str(),
                self.detector.name(),
                error
            ),
        }
        result
    }
}
