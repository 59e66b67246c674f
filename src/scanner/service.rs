//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `ScanServiceState` 作为 Tauri 注入状态，替代全局单例：
//! 1. 生命周期清晰（由应用 `setup` 统一创建）
//! 2. 测试可注入脚本化检测引擎，独立验证级联行为
//! 3. 检测引擎句柄无状态，整个服务共享一份
//!
//! ## 实现思路
//!
//! 对外暴露少量稳定 API：
//! - `process_frame` / `process_frame_with_progress`：加载 → 解码 → 级联
//! - `submit_frame`：带节流与忙碌判断的实时取帧入口
//! - `get_config` / `set_config`：配置快照读写
//! - `statistics` / `reset_statistics`：扫描计数

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::cascade::{ScanCascade, ScanEvent, ScanReport};
use super::config::ScanConfig;
use super::detector::{Detector, RxingDetector};
use super::error::ScanError;
use super::loader::load_frame;
use super::pipeline::decode_frame;
use super::source::FrameRequest;
use super::throttle::{Admission, FrameGate};
use super::variant::{Tier, VariantLedger};

/// 扫描计数快照。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatistics {
    pub frames_received: u64,
    pub frames_throttled: u64,
    pub frames_skipped_busy: u64,
    pub hits_original: u64,
    pub hits_enhanced: u64,
    pub hits_high_contrast: u64,
    pub misses: u64,
    pub failures: u64,
    pub variants_constructed: u64,
    pub variants_released: u64,
    pub last_elapsed_ms: Option<u64>,
}

impl ScanStatistics {
    fn record_hit(&mut self, tier: Tier) {
        match tier {
            Tier::Original => self.hits_original += 1,
            Tier::Enhanced => self.hits_enhanced += 1,
            Tier::HighContrast => self.hits_high_contrast += 1,
        }
    }
}

/// 实时取帧提交结果。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameSubmission {
    Processed {
        result: String,
        tier: Option<Tier>,
        elapsed_ms: u64,
    },
    Throttled {
        since_last_ms: u64,
    },
    Busy,
}

/// 扫描服务状态。
///
/// 作为 Tauri `State` 注入到命令层，内部持有级联控制器与运行时配置。
pub struct ScanServiceState<D: Detector = RxingDetector> {
    config: RwLock<ScanConfig>,
    cascade: ScanCascade<D>,
    gate: FrameGate,
    stats: Mutex<ScanStatistics>,
}

impl ScanServiceState<RxingDetector> {
    /// 使用默认配置与默认检测引擎创建服务。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use barcode_scanner::scanner::ScanServiceState;
    ///
    /// let service = ScanServiceState::new()?;
    /// # Ok::<(), barcode_scanner::scanner::ScanError>(())
    /// ```
    pub fn new() -> Result<Self, ScanError> {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Result<Self, ScanError> {
        Self::with_detector(config, RxingDetector)
    }
}

impl<D: Detector> ScanServiceState<D> {
    /// 使用自定义检测引擎创建服务，主要用于测试或替换引擎。
    pub fn with_detector(config: ScanConfig, detector: D) -> Result<Self, ScanError> {
        config.validate()?;
        log::info!(
            "🚀 扫描服务已创建 - 引擎: {} 码制: {:?}",
            detector.name(),
            config.formats.iter().map(|f| f.as_str()).collect::<Vec<_>>()
        );

        Ok(Self {
            config: RwLock::new(config),
            cascade: ScanCascade::new(Arc::new(detector)),
            gate: FrameGate::new(),
            stats: Mutex::new(ScanStatistics::default()),
        })
    }

    pub fn detector(&self) -> &D {
        self.cascade.detector()
    }

    /// 获取配置快照，保证单次请求使用一致参数。
    pub fn get_config(&self) -> Result<ScanConfig, ScanError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ScanError::Config("配置读取锁已中毒".to_string()))
    }

    /// 校验并应用新配置。
    pub fn set_config(&self, config: ScanConfig) -> Result<(), ScanError> {
        config.validate()?;

        let mut current = self
            .config
            .write()
            .map_err(|_| ScanError::Config("配置写入锁已中毒".to_string()))?;

        log::info!(
            "⚙️ 已更新扫描配置 - 码制: {:?} 增强: {:?} 高对比: {:?} 节流: {}ms",
            config.formats.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            config.enhanced_tone,
            config.high_contrast_tone,
            config.throttle_interval_ms
        );
        *current = config;
        Ok(())
    }

    /// 执行完整扫描：加载 → 解码 → 三档级联。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use barcode_scanner::scanner::{FrameRequest, ScanServiceState};
    ///
    /// # async fn demo(frame_base64: String) -> Result<(), barcode_scanner::scanner::ScanError> {
    /// let service = ScanServiceState::new()?;
    /// let report = service
    ///     .process_frame(FrameRequest::base64(frame_base64, 1920, 1080, "portrait"))
    ///     .await?;
    /// println!("{}", report.outcome.to_response());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn process_frame(&self, request: FrameRequest) -> Result<ScanReport, ScanError> {
        self.process_frame_with_progress(request, |_| {}).await
    }

    pub async fn process_frame_with_progress<F>(
        &self,
        request: FrameRequest,
        on_event: F,
    ) -> Result<ScanReport, ScanError>
    where
        F: Fn(ScanEvent) + Send + Sync,
    {
        let config = self.get_config()?;
        let total_start = Instant::now();
        self.update_stats(|stats| stats.frames_received += 1);

        log::debug!(
            "🚀 处理帧：{}x{} 方向: {}",
            request.width,
            request.height,
            request.orientation
        );

        let decode_start = Instant::now();
        let decoded = load_frame(request, &config).and_then(|raw| decode_frame(raw, &config));
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(error) => {
                log::error!("🚨 帧加载失败（{}）：{}", error.code(), error);
                self.update_stats(|stats| stats.failures += 1);
                return Err(error);
            }
        };
        let decode_elapsed = decode_start.elapsed();

        let ledger = VariantLedger::new();
        let result = self
            .cascade
            .run_with_ledger(decoded, &config, Arc::clone(&ledger), on_event)
            .await;

        let usage = ledger.usage();
        let total_elapsed = total_start.elapsed().as_millis() as u64;

        self.update_stats(|stats| {
            stats.variants_constructed += usage.constructed as u64;
            stats.variants_released += usage.released as u64;
            stats.last_elapsed_ms = Some(total_elapsed);
            match &result {
                Ok(report) => match report.outcome.tier() {
                    Some(tier) => stats.record_hit(tier),
                    None => stats.misses += 1,
                },
                Err(_) => stats.failures += 1,
            }
        });

        if !usage.is_balanced() {
            log::warn!(
                "⚠️ 变体释放数与构建数不一致：constructed={} released={}",
                usage.constructed,
                usage.released
            );
        }

        log::info!(
            "✅ 帧处理完成 - decode={}ms total={}ms variants={}",
            decode_elapsed.as_millis(),
            total_elapsed,
            usage.constructed
        );

        result
    }

    /// 实时取帧入口：按节流间隔与忙碌状态决定是否处理本帧。
    pub async fn submit_frame(&self, request: FrameRequest) -> Result<FrameSubmission, ScanError> {
        let interval = Duration::from_millis(self.get_config()?.throttle_interval_ms);

        let _permit = match self.gate.try_admit(interval)? {
            Admission::Admitted(permit) => permit,
            Admission::Throttled { since_last } => {
                log::trace!("⏳ 节流跳过：距上次 {}ms", since_last.as_millis());
                self.update_stats(|stats| stats.frames_throttled += 1);
                return Ok(FrameSubmission::Throttled {
                    since_last_ms: since_last.as_millis() as u64,
                });
            }
            Admission::Busy => {
                log::trace!("⏳ 上一帧仍在处理，跳过");
                self.update_stats(|stats| stats.frames_skipped_busy += 1);
                return Ok(FrameSubmission::Busy);
            }
        };

        let report = self.process_frame(request).await?;
        Ok(FrameSubmission::Processed {
            result: report.outcome.to_response(),
            tier: report.outcome.tier(),
            elapsed_ms: report.elapsed_ms,
        })
    }

    pub fn statistics(&self) -> Result<ScanStatistics, ScanError> {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .map_err(|_| ScanError::Config("统计状态锁已中毒".to_string()))
    }

    pub fn reset_statistics(&self) -> Result<(), ScanError> {
        let mut stats = self
            .stats
            .lock()
            .map_err(|_| ScanError::Config("统计状态锁已中毒".to_string()))?;
        *stats = ScanStatistics::default();
        Ok(())
    }

    fn update_stats(&self, apply: impl FnOnce(&mut ScanStatistics)) {
        match self.stats.lock() {
            Ok(mut stats) => apply(&mut stats),
            Err(_) => log::warn!("⚠️ 统计状态锁已中毒，跳过计数"),
        }
    }
}
