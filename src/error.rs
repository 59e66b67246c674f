//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError`，承载扫描链路之外的失败（存储目录、配置落盘、日志初始化），
//! 并通过 `From<ScanError>` 吸收扫描领域错误，调用侧可直接使用 `?`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 实现 `Serialize` 将错误序列化为字符串，满足 Tauri IPC 要求。
//! - 扫描命令本身返回结构化的 `ScanCommandError`，这里只服务于配置/统计类命令。

use serde::Serialize;

use crate::scanner::ScanError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 扫描链路错误（解码 / 图像 / 检测 / 配置）
    #[error("{0}")]
    Scan(#[from] ScanError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 存储目录或配置文件不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 日志初始化失败
    #[error("日志初始化失败: {0}")]
    Logging(String),
}

/// Tauri IPC 要求返回值实现 `Serialize`。
/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
