//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 扫描链路只有三类会交给前端的失败：输入解码失败、图像构建失败、最终档检测失败。
//! 中间档位的检测失败属于可恢复错误，由级联控制器就地吞掉并推进到下一档，
//! 因此 `DetectorError` 与 `ScanError` 分开定义，只有最后一档才会上转。

/// 扫描统一错误类型。
///
/// 该类型会在命令层被转换为 `{ code, stage, message }` 结构透传给前端。
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 输入编码错误（Base64 非法、内容为空、体积超限）。
    #[error("解码错误：{0}")]
    Decode(String),

    /// 字节无法构建为图像。
    #[error("图像错误：{0}")]
    Image(String),

    /// 最后一档检测仍然失败。
    #[error("检测错误：{0}")]
    Detector(String),

    /// 配置非法或配置状态不可用。
    #[error("配置错误：{0}")]
    Config(String),
}

impl ScanError {
    /// 面向前端的稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode-error",
            Self::Image(_) => "image-error",
            Self::Detector(_) => "detector-error",
            Self::Config(_) => "config-error",
        }
    }

    /// 出错阶段，用于日志与前端诊断。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Decode(_) => "load",
            Self::Image(_) => "decode",
            Self::Detector(_) => "detect",
            Self::Config(_) => "config",
        }
    }
}

impl From<DetectorError> for ScanError {
    fn from(error: DetectorError) -> Self {
        Self::Detector(error.to_string())
    }
}

/// 单次检测调用的失败。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    /// 检测引擎返回了失败。
    #[error("检测引擎失败：{0}")]
    Engine(String),

    /// 后台检测任务异常退出。
    #[error("检测任务异常：{0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ScanError::Decode("x".into()).code(), "decode-error");
        assert_eq!(ScanError::Image("x".into()).code(), "image-error");
        assert_eq!(ScanError::Detector("x".into()).code(), "detector-error");
        assert_eq!(ScanError::Config("x".into()).code(), "config-error");
    }

    #[test]
    fn detector_error_converts_to_detector_stage() {
        let error: ScanError = DetectorError::Engine("boom".into()).into();
        assert_eq!(error.stage(), "detect");
        assert!(error.to_string().contains("boom"));
    }
}
