//! # 帧数据与中间模型
//!
//! ## 设计思路
//!
//! 将“外部请求”和“流水线中间结果”解耦：
//! - `FrameRequest` 表示前端传入的一帧（编码字节 + 声明尺寸 + 方向字符串）
//! - `RawFrame` 表示已取得原始字节、尚未解码的帧
//! - `DecodedFrame` 表示已解码为 RGBA 的帧，交给级联控制器

use image::RgbaImage;
use serde::Serialize;

/// 帧的编码形式。
pub enum FrameData {
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 已经是二进制的编码图片字节。
    Bytes(Vec<u8>),
}

/// 前端提交的一帧。
pub struct FrameRequest {
    pub data: FrameData,
    /// 相机声明的宽度（像素），仅用于诊断。
    pub width: u32,
    /// 相机声明的高度（像素），仅用于诊断。
    pub height: u32,
    /// 相机方向字符串，例如 `portrait`。
    pub orientation: String,
}

impl FrameRequest {
    pub fn base64(data: impl Into<String>, width: u32, height: u32, orientation: impl Into<String>) -> Self {
        Self {
            data: FrameData::Base64(data.into()),
            width,
            height,
            orientation: orientation.into(),
        }
    }

    pub fn bytes(data: Vec<u8>, width: u32, height: u32, orientation: impl Into<String>) -> Self {
        Self {
            data: FrameData::Bytes(data),
            width,
            height,
            orientation: orientation.into(),
        }
    }
}

/// 检测时需要把图像转正的顺时针角度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rotation {
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// 将相机方向字符串映射为旋转角度，未知值一律按 0°。
    ///
    /// # 示例
    /// ```rust
    /// use barcode_scanner::scanner::Rotation;
    ///
    /// assert_eq!(Rotation::from_orientation("landscape-left").degrees(), 90);
    /// assert_eq!(Rotation::from_orientation("sideways").degrees(), 0);
    /// ```
    pub fn from_orientation(orientation: &str) -> Self {
        match orientation {
            "portrait" => Self::Deg0,
            "landscape-left" => Self::Deg90,
            "portrait-upside-down" => Self::Deg180,
            "landscape-right" => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawFrame {
    /// 编码后的图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
    pub(crate) declared_width: u32,
    pub(crate) declared_height: u32,
    pub(crate) rotation: Rotation,
}

/// 解码阶段输出：可直接构建原始变体的 RGBA 帧。
pub struct DecodedFrame {
    pub image: RgbaImage,
    pub rotation: Rotation,
}
