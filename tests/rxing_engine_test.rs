// 默认 rxing 引擎端到端测试：渲染真实条码图片，经完整服务链路识别
use std::io::Cursor;

use base64::Engine as _;
use barcode_scanner::scanner::{
    BarcodeFormat, FrameRequest, NO_BARCODES_FOUND, ScanConfig, ScanServiceState, Tier,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use rxing::{MultiFormatWriter, Writer};

const LICENSE_PAYLOAD: &str = "ANSI 636014080002DL00410278ZC03190008DLDAQD1234567";
const QR_PAYLOAD: &str = "https://example.com/ticket/42";

/// 渲染条码并加白边，编码为 PNG Base64。
fn render_base64(payload: &str, format: rxing::BarcodeFormat, width: i32, height: i32) -> String {
    let matrix = MultiFormatWriter
        .encode(payload, &format, width, height)
        .expect("failed to render barcode");
    let symbol = DynamicImage::from(&matrix).to_rgba8();

    let mut canvas = RgbaImage::from_pixel(symbol.width() + 80, symbol.height() + 80, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &symbol, 40, 40);

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    base64::engine::general_purpose::STANDARD.encode(cursor.into_inner())
}

#[tokio::test]
async fn default_engine_reads_pdf417_on_first_tier() {
    let service = ScanServiceState::new().expect("service init failed");
    let frame = render_base64(LICENSE_PAYLOAD, rxing::BarcodeFormat::PDF_417, 400, 200);

    let report = service
        .process_frame(FrameRequest::base64(frame, 0, 0, "portrait"))
        .await
        .expect("scan should succeed");

    assert_eq!(report.outcome.tier(), Some(Tier::Original));
    assert_eq!(report.outcome.to_response(), LICENSE_PAYLOAD);
    assert_eq!(report.variants.constructed, 1);
}

#[tokio::test]
async fn disabled_format_is_reported_as_not_found() {
    let service = ScanServiceState::new().expect("service init failed");
    let frame = render_base64(QR_PAYLOAD, rxing::BarcodeFormat::QR_CODE, 200, 200);

    let report = service
        .process_frame(FrameRequest::base64(frame, 0, 0, "portrait"))
        .await
        .expect("scan should succeed");

    assert_eq!(report.outcome.to_response(), NO_BARCODES_FOUND);
    assert!(report.variants.is_balanced());
}

#[tokio::test]
async fn enabled_qr_format_returns_payload() {
    let mut config = ScanConfig::default();
    config.formats = vec![BarcodeFormat::Qr];
    let service = ScanServiceState::with_config(config).expect("service init failed");
    let frame = render_base64(QR_PAYLOAD, rxing::BarcodeFormat::QR_CODE, 200, 200);

    let report = service
        .process_frame(FrameRequest::base64(frame, 0, 0, "portrait"))
        .await
        .expect("scan should succeed");

    assert_eq!(report.outcome.tier(), Some(Tier::Original));
    assert_eq!(report.outcome.to_response(), QR_PAYLOAD);
}
