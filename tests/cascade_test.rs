// 级联扫描端到端测试：通过脚本化检测引擎驱动完整的 加载 → 解码 → 三档级联 流程
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use barcode_scanner::scanner::{
    BarcodeFormat, DecodedFrame, DetectedBarcode, Detector, DetectorError, FrameRequest, ImageVariant,
    NO_BARCODES_FOUND, Rotation, ScanCascade, ScanConfig, ScanError, ScanEvent, ScanServiceState, Tier,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

/// 每档返回预设结果，并记录每次调用的档位、旋转与首像素值。
struct ScriptedDetector {
    original: Result<Vec<DetectedBarcode>, DetectorError>,
    enhanced: Result<Vec<DetectedBarcode>, DetectorError>,
    high_contrast: Result<Vec<DetectedBarcode>, DetectorError>,
    calls: Mutex<Vec<(Tier, Rotation, u8)>>,
}

impl ScriptedDetector {
    fn new(
        original: Result<Vec<DetectedBarcode>, DetectorError>,
        enhanced: Result<Vec<DetectedBarcode>, DetectorError>,
        high_contrast: Result<Vec<DetectedBarcode>, DetectorError>,
    ) -> Self {
        Self {
            original,
            enhanced,
            high_contrast,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(Tier, Rotation, u8)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn detect(
        &self,
        variant: &ImageVariant,
        rotation: Rotation,
        _formats: &[BarcodeFormat],
    ) -> Result<Vec<DetectedBarcode>, DetectorError> {
        let first = variant.image().get_pixel(0, 0).0[0];
        self.calls.lock().unwrap().push((variant.tier(), rotation, first));

        match variant.tier() {
            Tier::Original => self.original.clone(),
            Tier::Enhanced => self.enhanced.clone(),
            Tier::HighContrast => self.high_contrast.clone(),
        }
    }
}

/// 只有像素值精确达到阈值时才“看见”条码。
struct ThresholdDetector {
    level: u8,
}

impl Detector for ThresholdDetector {
    fn name(&self) -> &'static str {
        "threshold"
    }

    async fn detect(
        &self,
        variant: &ImageVariant,
        _rotation: Rotation,
        _formats: &[BarcodeFormat],
    ) -> Result<Vec<DetectedBarcode>, DetectorError> {
        if variant.image().get_pixel(0, 0).0[0] == self.level {
            Ok(vec![DetectedBarcode::new(BarcodeFormat::Pdf417, "ANSI 636014")])
        } else {
            Ok(Vec::new())
        }
    }
}

fn hit(value: &str) -> Result<Vec<DetectedBarcode>, DetectorError> {
    Ok(vec![DetectedBarcode::new(BarcodeFormat::Pdf417, value)])
}

fn empty() -> Result<Vec<DetectedBarcode>, DetectorError> {
    Ok(Vec::new())
}

fn png_frame_base64(value: u8) -> String {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 24, Rgba([value, value, value, 255])));
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    base64::engine::general_purpose::STANDARD.encode(cursor.into_inner())
}

fn service_with<D: Detector>(detector: D) -> ScanServiceState<D> {
    ScanServiceState::with_detector(ScanConfig::default(), detector).expect("service init failed")
}

#[tokio::test]
async fn original_hit_never_builds_enhanced_variants() {
    let service = service_with(ScriptedDetector::new(hit("DL-1"), hit("never"), hit("never")));

    let report = service
        .process_frame(FrameRequest::base64(png_frame_base64(80), 32, 24, "portrait"))
        .await
        .expect("scan should succeed");

    assert_eq!(report.outcome.to_response(), "DL-1");
    assert_eq!(report.outcome.tier(), Some(Tier::Original));
    assert_eq!(report.variants.constructed, 1);
    assert!(report.variants.is_balanced());
    assert_eq!(service.detector().calls().len(), 1);
}

#[tokio::test]
async fn high_contrast_only_hit_builds_and_releases_two_extra_variants() {
    let service = service_with(ScriptedDetector::new(empty(), empty(), hit("DL-3")));

    let report = service
        .process_frame(FrameRequest::base64(png_frame_base64(40), 32, 24, "portrait"))
        .await
        .expect("scan should succeed");

    assert_eq!(report.outcome.to_response(), "DL-3");
    assert_eq!(report.outcome.tier(), Some(Tier::HighContrast));
    assert_eq!(report.variants.constructed, 3);
    assert_eq!(report.variants.released, 3);
    assert_eq!(report.variants.peak_live, 2);

    // 每档都从原图派生：40 → 2*40+10 → 3*40+20
    let pixels: Vec<u8> = service.detector().calls().iter().map(|c| c.2).collect();
    assert_eq!(pixels, vec![40, 90, 140]);
}

#[tokio::test]
async fn exhaustion_is_a_negative_result_not_an_error() {
    let service = service_with(ScriptedDetector::new(empty(), empty(), empty()));

    let report = service
        .process_frame(FrameRequest::base64(png_frame_base64(10), 32, 24, "portrait"))
        .await
        .expect("exhaustion is not an error");

    assert_eq!(report.outcome.to_response(), NO_BARCODES_FOUND);
    assert_eq!(report.outcome.to_response(), "no barcodes found");
    assert!(report.variants.is_balanced());

    let stats = service.statistics().unwrap();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn malformed_base64_is_rejected_before_any_detection() {
    let service = service_with(ScriptedDetector::new(hit("x"), hit("x"), hit("x")));

    let error = service
        .process_frame(FrameRequest::base64("%%%not-base64%%%", 32, 24, "portrait"))
        .await
        .expect_err("malformed input must fail");

    assert!(matches!(error, ScanError::Decode(_)));
    assert_eq!(error.code(), "decode-error");
    assert!(service.detector().calls().is_empty());

    let stats = service.statistics().unwrap();
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.variants_constructed, 0);
}

#[tokio::test]
async fn intermediate_failures_advance_and_final_failure_propagates() {
    let engine_down = || Err(DetectorError::Engine("engine unavailable".to_string()));

    let recovers = service_with(ScriptedDetector::new(engine_down(), engine_down(), hit("DL-9")));
    let report = recovers
        .process_frame(FrameRequest::base64(png_frame_base64(60), 32, 24, "portrait"))
        .await
        .expect("final tier hit should win");
    assert_eq!(report.outcome.to_response(), "DL-9");
    assert_eq!(report.attempts.iter().filter(|a| a.failure.is_some()).count(), 2);

    let fails = service_with(ScriptedDetector::new(empty(), empty(), engine_down()));
    let error = fails
        .process_frame(FrameRequest::base64(png_frame_base64(60), 32, 24, "portrait"))
        .await
        .expect_err("final tier failure must propagate");
    assert_eq!(error.code(), "detector-error");

    let stats = fails.statistics().unwrap();
    assert_eq!(stats.variants_constructed, 3);
    assert_eq!(stats.variants_released, 3);
}

#[tokio::test]
async fn orientation_strings_map_to_rotation_passed_to_detector() {
    let cases = [
        ("portrait", Rotation::Deg0),
        ("landscape-left", Rotation::Deg90),
        ("portrait-upside-down", Rotation::Deg180),
        ("landscape-right", Rotation::Deg270),
        ("LANDSCAPE-LEFT", Rotation::Deg0),
        ("", Rotation::Deg0),
    ];

    for (orientation, expected) in cases {
        let service = service_with(ScriptedDetector::new(hit("x"), empty(), empty()));
        let report = service
            .process_frame(FrameRequest::base64(png_frame_base64(0), 32, 24, orientation))
            .await
            .expect("scan should succeed");

        assert_eq!(report.rotation, expected, "orientation {:?}", orientation);
        assert_eq!(service.detector().calls()[0].1, expected);
    }
}

#[tokio::test]
async fn threshold_detector_sees_barcode_only_in_enhanced_tier() {
    // 60 → 2*60+10 = 130
    let service = service_with(ThresholdDetector { level: 130 });

    let report = service
        .process_frame(FrameRequest::base64(png_frame_base64(60), 32, 24, "portrait"))
        .await
        .expect("scan should succeed");

    assert_eq!(report.outcome.tier(), Some(Tier::Enhanced));
    assert_eq!(report.outcome.to_response(), "ANSI 636014");
    assert_eq!(report.variants.constructed, 2);
}

#[tokio::test]
async fn cascade_emits_progress_events_in_tier_order() {
    let detector = Arc::new(ScriptedDetector::new(empty(), hit("DL-2"), hit("never")));
    let cascade = ScanCascade::new(Arc::clone(&detector));
    let events = Mutex::new(Vec::new());

    let frame = DecodedFrame {
        image: RgbaImage::from_pixel(8, 8, Rgba([20, 20, 20, 255])),
        rotation: Rotation::Deg90,
    };

    let report = cascade
        .run(frame, &ScanConfig::default(), |event| {
            events.lock().unwrap().push(event);
        })
        .await
        .expect("cascade should resolve");

    assert_eq!(report.outcome.tier(), Some(Tier::Enhanced));
    assert_eq!(
        events.into_inner().unwrap(),
        vec![
            ScanEvent::TierStarted { tier: Tier::Original },
            ScanEvent::TierFinished { tier: Tier::Original, found: 0, failed: false },
            ScanEvent::TierStarted { tier: Tier::Enhanced },
            ScanEvent::TierFinished { tier: Tier::Enhanced, found: 1, failed: false },
        ]
    );
    assert_eq!(report.variants.constructed, 2);
    assert_eq!(report.variants.peak_live, 2);
    assert!(report.variants.is_balanced());
}
