//! # 解码流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在完整解码前先做像素上限检查，
//! 降低恶意或异常帧触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 读取 header 尺寸并按像素上限快速拒绝
//! 2. 完整解码
//! 3. 声明尺寸与实际尺寸不一致时记录告警
//! 4. 根据配置决定是否降采样
//! 5. 转换 RGBA

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgba, imageops::FilterType};
use std::io::Cursor;

use super::config::ScanConfig;
use super::error::ScanError;
use super::source::{DecodedFrame, RawFrame};

/// 将原始帧解码为级联可用的 RGBA 帧。
pub(crate) fn decode_frame(raw: RawFrame, config: &ScanConfig) -> Result<DecodedFrame, ScanError> {
    let (header_width, header_height) = inspect_dimensions_from_memory(&raw.bytes)?;
    validate_pixel_limits(config, header_width, header_height)?;

    let decoded = image::load_from_memory(&raw.bytes)
        .map_err(|e| ScanError::Image(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(ScanError::Image("解码结果为空图像".to_string()));
    }

    if raw.declared_width != 0
        && raw.declared_height != 0
        && (raw.declared_width, raw.declared_height) != (width, height)
    {
        log::warn!(
            "⚠️ 帧尺寸与声明不一致 - 声明: {}x{} 实际: {}x{}",
            raw.declared_width,
            raw.declared_height,
            width,
            height
        );
    }

    let optimized = maybe_downscale_for_detection(decoded, config)?;
    let image = optimized.to_rgba8();

    log::info!(
        "✅ 帧解码成功 - 来源: {} 原始尺寸: {}x{} 检测尺寸: {}x{} 旋转: {}°",
        raw.source_hint,
        width,
        height,
        image.width(),
        image.height(),
        raw.rotation.degrees()
    );

    Ok(DecodedFrame {
        image,
        rotation: raw.rotation,
    })
}

/// 仅通过图片头信息读取宽高。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ScanError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ScanError::Image(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| ScanError::Image(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(config: &ScanConfig, width: u32, height: u32) -> Result<(), ScanError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ScanError::Image("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ScanError::Image(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

/// 最长边超过上限时等比降采样。
fn maybe_downscale_for_detection(image: DynamicImage, config: &ScanConfig) -> Result<DynamicImage, ScanError> {
    if !config.adaptive_resize {
        return Ok(image);
    }

    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= config.max_detect_dimension {
        return Ok(image);
    }

    let scale = config.max_detect_dimension as f64 / longest as f64;
    let target_width = ((width as f64 * scale).floor() as u32).max(1);
    let target_height = ((height as f64 * scale).floor() as u32).max(1);

    log::info!(
        "🧩 检测前降采样：{}x{} -> {}x{}",
        width,
        height,
        target_width,
        target_height
    );

    match resize_with_fast_image_resize(&image, target_width, target_height) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
            Ok(image.resize_exact(target_width, target_height, FilterType::Triangle))
        }
    }
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
) -> Result<DynamicImage, ScanError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image = fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
        .map_err(|e| ScanError::Image(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ScanError::Image(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ScanError::Image("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}
