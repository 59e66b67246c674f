//! # 图像变体模块
//!
//! ## 设计思路
//!
//! 每一档检测使用一个“变体”：原图、增强对比度图、极高对比度图。
//! 变体由创建它的那次级联调用独占，离开作用域即释放。
//!
//! ## 实现思路
//!
//! - `ImageVariant` 采用 RAII：构造时登记到 `VariantLedger`，`Drop` 时登记释放，
//!   任何退出路径（命中 / 未命中 / 失败 / panic 展开）都不会漏记。
//! - 增强变体一律从原图像素派生，不做链式叠加。
//! - 色调曲线逐通道线性映射 `out = in * contrast + brightness`，alpha 保持不变。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// 级联中的一档。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Original,
    Enhanced,
    HighContrast,
}

impl Tier {
    /// 固定的尝试顺序。
    pub const ORDER: [Tier; 3] = [Tier::Original, Tier::Enhanced, Tier::HighContrast];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Enhanced => "enhanced",
            Self::HighContrast => "high_contrast",
        }
    }

    /// 下一档；最后一档返回 `None`。
    pub fn next(self) -> Option<Tier> {
        match self {
            Self::Original => Some(Self::Enhanced),
            Self::Enhanced => Some(Self::HighContrast),
            Self::HighContrast => None,
        }
    }
}

/// 逐通道线性色调曲线。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneCurve {
    pub contrast: f32,
    pub brightness: f32,
}

impl ToneCurve {
    pub const ENHANCED: ToneCurve = ToneCurve {
        contrast: 2.0,
        brightness: 10.0,
    };

    pub const HIGH_CONTRAST: ToneCurve = ToneCurve {
        contrast: 3.0,
        brightness: 20.0,
    };

    /// 映射单个通道值。
    pub fn map_channel(&self, value: u8) -> u8 {
        (value as f32 * self.contrast + self.brightness)
            .round()
            .clamp(0.0, 255.0) as u8
    }

    /// 将曲线应用到整张图，返回新缓冲区。
    pub fn apply(&self, source: &RgbaImage) -> RgbaImage {
        let lut: [u8; 256] = std::array::from_fn(|v| self.map_channel(v as u8));

        let mut output = source.clone();
        for pixel in output.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            pixel.0 = [lut[r as usize], lut[g as usize], lut[b as usize], a];
        }
        output
    }
}

/// 变体生命周期账本。
///
/// 记录单次级联中构建与释放的变体数量，以及同时存活的峰值。
#[derive(Debug, Default)]
pub struct VariantLedger {
    constructed: AtomicUsize,
    released: AtomicUsize,
    live: AtomicUsize,
    peak_live: AtomicUsize,
}

impl VariantLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record_construct(&self) {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_live.fetch_max(live, Ordering::SeqCst);
    }

    fn record_release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }

    pub fn usage(&self) -> VariantUsage {
        VariantUsage {
            constructed: self.constructed(),
            released: self.released(),
            peak_live: self.peak_live(),
        }
    }
}

/// 账本快照，随扫描报告返回给调用方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VariantUsage {
    pub constructed: usize,
    pub released: usize,
    pub peak_live: usize,
}

impl VariantUsage {
    pub fn is_balanced(&self) -> bool {
        self.constructed == self.released
    }
}

/// 单档检测使用的图像变体。
pub struct ImageVariant {
    tier: Tier,
    image: RgbaImage,
    ledger: Arc<VariantLedger>,
}

impl ImageVariant {
    /// 以解码后的原图构建第一档变体。
    pub fn original(image: RgbaImage, ledger: Arc<VariantLedger>) -> Self {
        Self::register(Tier::Original, image, ledger)
    }

    /// 从原图派生增强变体。
    pub fn derive(base: &ImageVariant, tier: Tier, curve: ToneCurve) -> Self {
        log::debug!(
            "🔧 构建{}变体：contrast={} brightness={}",
            tier.as_str(),
            curve.contrast,
            curve.brightness
        );
        let image = curve.apply(&base.image);
        Self::register(tier, image, Arc::clone(&base.ledger))
    }

    fn register(tier: Tier, image: RgbaImage, ledger: Arc<VariantLedger>) -> Self {
        ledger.record_construct();
        Self { tier, image, ledger }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl Drop for ImageVariant {
    fn drop(&mut self) {
        self.ledger.record_release();
        log::debug!("♻️ 释放{}变体", self.tier.as_str());
    }
}
