//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 在“尽可能早”的阶段执行输入校验，目标是在调用任何检测引擎之前快速失败。
//!
//! ## 实现思路
//!
//! - Base64：去除空白 → 识别 Data URL → 按编码长度预估解码体积 → 解码。
//! - 二进制：直接做体积限制。
//! - 两条路径最后都做非空与图片签名校验。

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::config::ScanConfig;
use super::error::ScanError;
use super::source::{FrameData, FrameRequest, RawFrame, Rotation};

/// 相机插件输出的 Base64 可能带换行或缺少补齐，这里统一宽松解码。
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 将前端请求加载为原始帧字节。
pub(crate) fn load_frame(request: FrameRequest, config: &ScanConfig) -> Result<RawFrame, ScanError> {
    let rotation = Rotation::from_orientation(&request.orientation);

    let (bytes, source_hint) = match request.data {
        FrameData::Base64(data) => (parse_base64_with_limit(&data, config.max_frame_bytes)?, "base64"),
        FrameData::Bytes(bytes) => {
            if bytes.len() as u64 > config.max_frame_bytes {
                return Err(ScanError::Decode(format!(
                    "帧体积过大：{:.2} MB（限制：{:.2} MB）",
                    bytes.len() as f64 / 1024.0 / 1024.0,
                    config.max_frame_bytes as f64 / 1024.0 / 1024.0
                )));
            }
            (bytes, "bytes")
        }
    };

    log::debug!("📝 帧字节就绪 - 来源: {} 长度: {}", source_hint, bytes.len());

    if bytes.is_empty() {
        return Err(ScanError::Decode("帧数据为空".to_string()));
    }
    validate_image_signature(&bytes)?;

    Ok(RawFrame {
        bytes,
        source_hint,
        declared_width: request.width,
        declared_height: request.height,
        rotation,
    })
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ScanError> {
    let len = base64_data.len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| ScanError::Decode("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| ScanError::Decode("Base64 解码体积估算溢出".to_string()))
}

/// 解析 Base64 / Data URL，并在解码前按预估体积拒绝超大输入。
pub(crate) fn parse_base64_with_limit(data: &str, max_frame_bytes: u64) -> Result<Vec<u8>, ScanError> {
    let trimmed = data.trim();

    let payload = if trimmed.starts_with("data:") {
        let base64_start = trimmed
            .find(";base64,")
            .ok_or_else(|| ScanError::Decode("缺少 base64 标记".to_string()))?;
        &trimmed[base64_start + 8..]
    } else {
        trimmed
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(ScanError::Decode("Base64 内容为空".to_string()));
    }

    let estimated_len = estimate_base64_decoded_upper_bound_len(&compact)?;
    if estimated_len > max_frame_bytes {
        return Err(ScanError::Decode(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_frame_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    LENIENT_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ScanError::Decode(format!("Base64 解码失败：{}", e)))
}

/// 通过文件签名确认字节确实是图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), ScanError> {
    let kind = infer::get(bytes)
        .ok_or_else(|| ScanError::Image("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(ScanError::Image(format!(
            "帧签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn parses_plain_and_data_url_base64() {
        let png = png_bytes();
        let encoded = general_purpose::STANDARD.encode(&png);

        let plain = parse_base64_with_limit(&encoded, u64::MAX).expect("plain base64 should parse");
        assert_eq!(plain, png);

        let data_url = format!("data:image/png;base64,{}", encoded);
        let from_url = parse_base64_with_limit(&data_url, u64::MAX).expect("data url should parse");
        assert_eq!(from_url, png);
    }

    #[test]
    fn tolerates_line_breaks_and_missing_padding() {
        let png = png_bytes();
        let encoded = general_purpose::STANDARD_NO_PAD.encode(&png);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(76)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n");

        let decoded = parse_base64_with_limit(&wrapped, u64::MAX).expect("wrapped base64 should parse");
        assert_eq!(decoded, png);
    }

    #[test]
    fn rejects_empty_and_malformed_base64() {
        assert!(matches!(parse_base64_with_limit("   ", u64::MAX), Err(ScanError::Decode(_))));
        assert!(matches!(parse_base64_with_limit("@@not-base64@@", u64::MAX), Err(ScanError::Decode(_))));
        assert!(matches!(
            parse_base64_with_limit("data:image/png,AAAA", u64::MAX),
            Err(ScanError::Decode(_))
        ));
    }

    #[test]
    fn rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = parse_base64_with_limit(&huge, 32);

        assert!(matches!(result, Err(ScanError::Decode(_))));
    }

    #[test]
    fn non_image_bytes_are_image_errors() {
        let config = ScanConfig::default();
        let encoded = general_purpose::STANDARD.encode(b"plain text, not a picture");
        let result = load_frame(FrameRequest::base64(encoded, 0, 0, "portrait"), &config);

        assert!(matches!(result, Err(ScanError::Image(_))));
    }

    #[test]
    fn load_frame_keeps_declared_metadata() {
        let config = ScanConfig::default();
        let raw = load_frame(FrameRequest::bytes(png_bytes(), 1920, 1080, "landscape-right"), &config)
            .expect("png bytes should load");

        assert_eq!(raw.source_hint, "bytes");
        assert_eq!(raw.declared_width, 1920);
        assert_eq!(raw.declared_height, 1080);
        assert_eq!(raw.rotation, Rotation::Deg270);
    }

    #[test]
    fn empty_binary_frame_is_decode_error() {
        let config = ScanConfig::default();
        let result = load_frame(FrameRequest::bytes(Vec::new(), 0, 0, "portrait"), &config);

        assert!(matches!(result, Err(ScanError::Decode(_))));
    }
}
