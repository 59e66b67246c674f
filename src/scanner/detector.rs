//! # 检测引擎模块
//!
//! ## 设计思路
//!
//! 级联控制器只依赖 `Detector` trait，不关心引擎内部。
//! 引擎句柄无状态、可跨调用复用，因此以 `Arc<D>` 在服务内共享。
//!
//! ## 实现思路
//!
//! 默认引擎 `RxingDetector` 基于纯 Rust 的 ZXing 移植：
//! 1. 变体转灰度并按旋转角度转正
//! 2. 在阻塞线程池中执行多码检测，避免阻塞 IPC 异步运行时
//! 3. “未找到”映射为空结果，其余异常映射为 `DetectorError`
//! 4. 启用的码制作为 `POSSIBLE_FORMATS` 提示传给引擎，结果再按码制过滤一次

use std::collections::HashSet;
use std::future::Future;

use image::{GrayImage, imageops};
use rxing::{DecodeHintType, DecodeHintValue, DecodingHintDictionary};
use serde::{Deserialize, Serialize};

use super::error::{DetectorError, ScanError};
use super::source::Rotation;
use super::variant::ImageVariant;

/// 支持的码制，命名与相机插件保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    #[serde(rename = "aztec")]
    Aztec,
    #[serde(rename = "code_128")]
    Code128,
    #[serde(rename = "code_39")]
    Code39,
    #[serde(rename = "code_93")]
    Code93,
    #[serde(rename = "codabar")]
    Codabar,
    #[serde(rename = "ean_13")]
    Ean13,
    #[serde(rename = "ean_8")]
    Ean8,
    #[serde(rename = "pdf_417")]
    Pdf417,
    #[serde(rename = "qr")]
    Qr,
    #[serde(rename = "upc_e")]
    UpcE,
    #[serde(rename = "upc_a")]
    UpcA,
    #[serde(rename = "itf")]
    Itf,
    #[serde(rename = "data_matrix")]
    DataMatrix,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 13] = [
        Self::Aztec,
        Self::Code128,
        Self::Code39,
        Self::Code93,
        Self::Codabar,
        Self::Ean13,
        Self::Ean8,
        Self::Pdf417,
        Self::Qr,
        Self::UpcE,
        Self::UpcA,
        Self::Itf,
        Self::DataMatrix,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aztec => "aztec",
            Self::Code128 => "code_128",
            Self::Code39 => "code_39",
            Self::Code93 => "code_93",
            Self::Codabar => "codabar",
            Self::Ean13 => "ean_13",
            Self::Ean8 => "ean_8",
            Self::Pdf417 => "pdf_417",
            Self::Qr => "qr",
            Self::UpcE => "upc_e",
            Self::UpcA => "upc_a",
            Self::Itf => "itf",
            Self::DataMatrix => "data_matrix",
        }
    }

    /// 从外部字符串解析码制。
    pub fn from_name(name: &str) -> Result<Self, ScanError> {
        let normalized = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| ScanError::Config(format!("未知码制：{}", name)))
    }

    /// 解析码制列表，`all` 展开为全部码制，结果去重并保持首次出现顺序。
    ///
    /// # 示例
    /// ```rust
    /// use barcode_scanner::scanner::BarcodeFormat;
    ///
    /// let formats = BarcodeFormat::parse_list(&["pdf_417", "qr", "pdf_417"])?;
    /// assert_eq!(formats, vec![BarcodeFormat::Pdf417, BarcodeFormat::Qr]);
    /// # Ok::<(), barcode_scanner::scanner::ScanError>(())
    /// ```
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, ScanError> {
        let mut formats = Vec::new();
        for name in names {
            let name = name.as_ref();
            let parsed = if name.trim().eq_ignore_ascii_case("all") {
                Self::ALL.to_vec()
            } else {
                vec![Self::from_name(name)?]
            };
            for format in parsed {
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }
        Ok(formats)
    }

    fn to_rxing(self) -> rxing::BarcodeFormat {
        use rxing::BarcodeFormat as Rx;

        match self {
            Self::Aztec => Rx::AZTEC,
            Self::Code128 => Rx::CODE_128,
            Self::Code39 => Rx::CODE_39,
            Self::Code93 => Rx::CODE_93,
            Self::Codabar => Rx::CODABAR,
            Self::Ean13 => Rx::EAN_13,
            Self::Ean8 => Rx::EAN_8,
            Self::Pdf417 => Rx::PDF_417,
            Self::Qr => Rx::QR_CODE,
            Self::UpcE => Rx::UPC_E,
            Self::UpcA => Rx::UPC_A,
            Self::Itf => Rx::ITF,
            Self::DataMatrix => Rx::DATA_MATRIX,
        }
    }

    fn from_rxing(format: &rxing::BarcodeFormat) -> Option<Self> {
        use rxing::BarcodeFormat as Rx;

        match format {
            Rx::AZTEC => Some(Self::Aztec),
            Rx::CODE_128 => Some(Self::Code128),
            Rx::CODE_39 => Some(Self::Code39),
            Rx::CODE_93 => Some(Self::Code93),
            Rx::CODABAR => Some(Self::Codabar),
            Rx::EAN_13 => Some(Self::Ean13),
            Rx::EAN_8 => Some(Self::Ean8),
            Rx::PDF_417 => Some(Self::Pdf417),
            Rx::QR_CODE => Some(Self::Qr),
            Rx::UPC_E => Some(Self::UpcE),
            Rx::UPC_A => Some(Self::UpcA),
            Rx::ITF => Some(Self::Itf),
            Rx::DATA_MATRIX => Some(Self::DataMatrix),
            _ => None,
        }
    }
}

/// 单个检测到的条码。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedBarcode {
    pub format: BarcodeFormat,
    pub raw_value: String,
}

impl DetectedBarcode {
    pub fn new(format: BarcodeFormat, raw_value: impl Into<String>) -> Self {
        Self {
            format,
            raw_value: raw_value.into(),
        }
    }
}

/// 条码检测引擎。
///
/// 实现方必须无状态或内部同步，同一实例会被并发调用。
pub trait Detector: Send + Sync + 'static {
    /// 引擎名称（用于日志）。
    fn name(&self) -> &'static str;

    /// 对单个变体执行一次检测。空结果表示“未找到”，不是错误。
    fn detect(
        &self,
        variant: &ImageVariant,
        rotation: Rotation,
        formats: &[BarcodeFormat],
    ) -> impl Future<Output = Result<Vec<DetectedBarcode>, DetectorError>> + Send;
}

/// 基于 rxing 的默认检测引擎。
#[derive(Debug, Clone, Copy, Default)]
pub struct RxingDetector;

impl Detector for RxingDetector {
    fn name(&self) -> &'static str {
        "rxing"
    }

    async fn detect(
        &self,
        variant: &ImageVariant,
        rotation: Rotation,
        formats: &[BarcodeFormat],
    ) -> Result<Vec<DetectedBarcode>, DetectorError> {
        let luma = upright_luma(variant, rotation);
        let formats = formats.to_vec();

        tokio::task::spawn_blocking(move || detect_in_luma(luma, &formats))
            .await
            .map_err(|e| DetectorError::Task(format!("检测线程执行失败：{}", e)))?
    }
}

/// 灰度化并按顺时针角度转正。
fn upright_luma(variant: &ImageVariant, rotation: Rotation) -> GrayImage {
    let luma = imageops::grayscale(variant.image());
    match rotation {
        Rotation::Deg0 => luma,
        Rotation::Deg90 => imageops::rotate90(&luma),
        Rotation::Deg180 => imageops::rotate180(&luma),
        Rotation::Deg270 => imageops::rotate270(&luma),
    }
}

/// 只让引擎搜索已启用的码制，未命中帧无需遍历全部码制。
fn decode_hints(formats: &[BarcodeFormat]) -> DecodingHintDictionary {
    let possible: HashSet<rxing::BarcodeFormat> = formats.iter().map(|format| format.to_rxing()).collect();

    let mut hints = DecodingHintDictionary::new();
    hints.insert(DecodeHintType::POSSIBLE_FORMATS, DecodeHintValue::PossibleFormats(possible));
    hints
}

fn detect_in_luma(luma: GrayImage, formats: &[BarcodeFormat]) -> Result<Vec<DetectedBarcode>, DetectorError> {
    let (width, height) = luma.dimensions();
    let mut hints = decode_hints(formats);

    match rxing::helpers::detect_multiple_in_luma_with_hints(luma.into_raw(), width, height, &mut hints) {
        Ok(results) => Ok(results
            .iter()
            .filter_map(|result| {
                let format = BarcodeFormat::from_rxing(result.getBarcodeFormat())?;
                if !formats.contains(&format) {
                    log::debug!("⏭️ 忽略未启用码制：{}", format.as_str());
                    return None;
                }
                Some(DetectedBarcode::new(format, result.getText().to_string()))
            })
            .collect()),
        Err(rxing::Exceptions::NotFoundException(_)) => Ok(Vec::new()),
        Err(e) => Err(DetectorError::Engine(format!("{:?}", e))),
    }
}
