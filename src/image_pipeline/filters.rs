//! # 像素滤镜模块
//!
//! ## 设计思路
//!
//! 每个滤镜都是像素缓冲上的纯函数：输入只读，输出新图，不依赖任何绘制上下文。
//! Alpha 通道原样保留。
//!
//! ## 实现思路
//!
//! - 灰度：定点整数 `(299R + 587G + 114B + 500) / 1000`，权重和恰为 1000，
//!   因此灰度图再次灰度化结果不变。
//! - 对比度：`factor * c + 128 * (1 - factor)`，浮点计算后先夹到 `[0, 255]`
//!   再收窄为 `u8`；256 项查找表避免逐像素重复计算。
//! - 二值化：亮度 ≥ 阈值为白，否则为黑。

use image::{Rgba, RgbaImage};

use super::config::validate_contrast_factor;
use super::PipelineError;

/// 单个像素的感知亮度（四舍五入到整数）。
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((weighted + 500) / 1000) as u8
}

/// 去饱和：RGB 替换为感知亮度，Alpha 保留。
pub fn grayscale(image: &RgbaImage) -> RgbaImage {
    map_pixels(image, |Rgba([r, g, b, a])| {
        let y = luminance(r, g, b);
        Rgba([y, y, y, a])
    })
}

/// 线性对比度调整。
///
/// `factor == 1.0` 为恒等变换；大于 1 增强、小于 1 减弱；
/// 非有限系数返回 `InvalidContrastFactor`。
pub fn adjust_contrast(image: &RgbaImage, factor: f32) -> Result<RgbaImage, PipelineError> {
    validate_contrast_factor(factor)?;

    let table = contrast_table(factor);
    Ok(map_pixels(image, |Rgba([r, g, b, a])| {
        Rgba([
            table[r as usize],
            table[g as usize],
            table[b as usize],
            a,
        ])
    }))
}

fn contrast_table(factor: f32) -> [u8; 256] {
    let offset = 128.0 * (1.0 - factor);
    let mut table = [0u8; 256];
    for (c, slot) in table.iter_mut().enumerate() {
        let value = factor * c as f32 + offset;
        *slot = value.round().clamp(0.0, 255.0) as u8;
    }
    table
}

/// 按亮度阈值二值化。
pub fn binarize(image: &RgbaImage, threshold: u8) -> RgbaImage {
    map_pixels(image, |Rgba([r, g, b, a])| {
        let v = if luminance(r, g, b) >= threshold { 255 } else { 0 };
        Rgba([v, v, v, a])
    })
}

fn map_pixels<F>(image: &RgbaImage, f: F) -> RgbaImage
where
    F: Fn(Rgba<u8>) -> Rgba<u8>,
{
    let (width, height) = image.dimensions();
    let mut output = RgbaImage::new(width, height);

    for (dst, src) in output.pixels_mut().zip(image.pixels()) {
        *dst = f(*src);
    }

    output
}
