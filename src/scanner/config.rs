//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ScanConfig`：启用的码制、两档增强曲线、输入体积与像素上限、
//! 降采样策略以及实时取帧节流间隔。配置可序列化，便于前端读写与落盘。
//!
//! ## 实现思路
//!
//! - `Default` 给出生产可用的默认值（仅 PDF417，证件场景速度优先）。
//! - `#[serde(default)]` 允许前端只提交部分字段。
//! - `validate` 在应用前拒绝非法组合，避免运行中途才暴露问题。

use serde::{Deserialize, Deserializer, Serialize};

use super::detector::BarcodeFormat;
use super::error::ScanError;
use super::variant::{Tier, ToneCurve};

/// 扫描配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 启用的码制，反序列化时接受 `all` 与大小写不敏感的名称。
    #[serde(deserialize_with = "deserialize_formats")]
    pub formats: Vec<BarcodeFormat>,
    /// 第二档（增强）色调曲线。
    pub enhanced_tone: ToneCurve,
    /// 第三档（极高对比度）色调曲线。
    pub high_contrast_tone: ToneCurve,
    /// 编码帧允许的最大体积（字节）。
    pub max_frame_bytes: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 是否对超大帧降采样后再检测。
    pub adaptive_resize: bool,
    /// 送入检测引擎的最长边。
    pub max_detect_dimension: u32,
    /// 实时取帧的最小间隔（毫秒）。
    pub throttle_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            formats: vec![BarcodeFormat::Pdf417],
            enhanced_tone: ToneCurve::ENHANCED,
            high_contrast_tone: ToneCurve::HIGH_CONTRAST,
            max_frame_bytes: 20 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            adaptive_resize: true,
            max_detect_dimension: 4096,
            throttle_interval_ms: 1_000,
        }
    }
}

impl ScanConfig {
    /// 校验配置是否可用。
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.formats.is_empty() {
            return Err(ScanError::Config("至少需要启用一种码制".to_string()));
        }

        for (name, curve) in [
            ("enhanced_tone", self.enhanced_tone),
            ("high_contrast_tone", self.high_contrast_tone),
        ] {
            if !curve.contrast.is_finite() || curve.contrast <= 0.0 {
                return Err(ScanError::Config(format!("{}.contrast 必须为正数", name)));
            }
            if !curve.brightness.is_finite() {
                return Err(ScanError::Config(format!("{}.brightness 必须为有限数", name)));
            }
        }

        if self.max_frame_bytes == 0 {
            return Err(ScanError::Config("max_frame_bytes 不能为 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ScanError::Config("max_decoded_pixels 不能为 0".to_string()));
        }
        if self.max_detect_dimension < 64 {
            return Err(ScanError::Config("max_detect_dimension 不能小于 64".to_string()));
        }

        Ok(())
    }

    /// 取某一档的增强曲线；原图档没有曲线。
    pub fn tone_for(&self, tier: Tier) -> Option<ToneCurve> {
        match tier {
            Tier::Original => None,
            Tier::Enhanced => Some(self.enhanced_tone),
            Tier::HighContrast => Some(self.high_contrast_tone),
        }
    }
}

fn deserialize_formats<'de, D>(deserializer: D) -> Result<Vec<BarcodeFormat>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    BarcodeFormat::parse_list(&names).map_err(serde::de::Error::custom)
}
