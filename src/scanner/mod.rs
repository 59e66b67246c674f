//! # 条码扫描模块（scanner）
//!
//! ## 设计思路
//!
//! 该模块把“帧加载校验 → 解码缩放 → 三档对比度级联检测 → Tauri 命令暴露”
//! 按职责拆分为多个子模块，检测引擎通过 `Detector` trait 注入。
//!
//! - `commands`：仅做 IPC 入参/出参适配（薄封装，需启用 `app` 特性）
//! - `service`：承载可注入状态（`ScanServiceState`）、节流与统计
//! - `cascade`：三档级联状态机与变体释放
//! - `loader`：Base64/二进制帧加载与安全校验
//! - `pipeline`：解码、像素限制、降采样
//! - `variant`：档位、色调曲线、变体与释放账本
//! - `detector`：码制、检测结果与默认引擎
//! - `throttle`：实时取帧准入门
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! 前端 invoke
//!    ↓
//! commands.rs（参数适配 + 进度事件）
//!    ↓
//! service.rs（State 注入、节流、统计）
//!    ├─ loader.rs（Base64/字节 + 体积/签名校验）
//!    ├─ pipeline.rs（解码 + 像素限制 + 降采样）
//!    └─ cascade.rs（原图 → 增强 → 极高对比度）
//!          └─ detector.rs（Detector trait / rxing）
//!    ↓
//! 条码文本 / "no barcodes found" / { code, stage, message }
//! ```
//!
//! ## 分层职责建议
//!
//! - 调用入口变更（命令名/参数）优先改 `commands.rs`
//! - 增强曲线与限额变更优先改 `config.rs`
//! - 档位顺序与收敛规则变更优先改 `cascade.rs`
//! - 更换检测引擎只需实现 `Detector`

mod cascade;
#[cfg(feature = "app")]
pub mod commands;
mod config;
mod detector;
mod error;
mod loader;
mod pipeline;
mod service;
mod source;
mod throttle;
mod variant;

pub use cascade::{
    CascadeState,
    NO_BARCODES_FOUND,
    ScanCascade,
    ScanEvent,
    ScanOutcome,
    ScanReport,
    TierAttempt,
    Transition,
    transition,
};
pub use config::ScanConfig;
pub use detector::{BarcodeFormat, DetectedBarcode, Detector, RxingDetector};
pub use error::{DetectorError, ScanError};
pub use service::{FrameSubmission, ScanServiceState, ScanStatistics};
pub use source::{DecodedFrame, FrameData, FrameRequest, Rotation};
pub use throttle::{Admission, FrameGate, FramePermit};
pub use variant::{ImageVariant, Tier, ToneCurve, VariantLedger, VariantUsage};
