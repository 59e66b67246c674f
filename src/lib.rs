//! # 证件条码扫描器 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  前端 (相机预览 + 结果展示)               │
//! │                                                          │
//! │  CameraFeed ── 取帧 (Base64 / 字节) ── ScanResultView    │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Tauri IPC (String / { code, stage, message })
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ─────── AppError (统一错误类型)                 │
//! │  │                                                       │
//! │  ├─ scanner ───── 帧加载 · 解码 · 三档级联检测            │
//! │  │   ├─ cascade        原图 → 增强 → 极高对比度           │
//! │  │   ├─ detector       Detector trait / rxing            │
//! │  │   └─ throttle       实时取帧节流                      │
//! │  │                                                       │
//! │  ├─ settings ──── scanner-config.json 持久化             │
//! │  └─ diagnostics ─ env_logger + 日志文件                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，配置/统计类命令的返回类型 |
//! | [`scanner`] | 扫描链路与可注入服务 `ScanServiceState` |
//! | [`settings`] | 扫描配置的读取与落盘 |
//! | [`diagnostics`] | 日志初始化，只执行一次 |
//!
//! Tauri 命令层需启用 `app` 特性；核心扫描逻辑不依赖 webview，可直接在测试中驱动。

pub mod diagnostics;
pub mod error;
pub mod scanner;
pub mod settings;
