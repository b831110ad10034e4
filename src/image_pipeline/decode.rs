//! # 拍摄解码模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低超大输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素 / 内存上限快速拒绝
//! 3. 完整解码
//! 4. 按配置等比缩放到拍摄位图尺寸以内（相机侧请求的是 1024×768 位图）
//! 5. 转换 RGBA

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

use super::source::RawCapture;
use super::{PipelineConfig, PipelineError, PipelineHandler};

impl PipelineHandler {
    /// 将原始字节解码为流水线输入的 RGBA 图像。
    pub(crate) fn decode_capture(
        &self,
        raw: RawCapture,
        config: &PipelineConfig,
    ) -> Result<RgbaImage, PipelineError> {
        image::guess_format(&raw.bytes)
            .map_err(|e| PipelineError::CaptureDecode(format!("不支持的图片格式：{}", e)))?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;
        Self::validate_decoded_memory_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| PipelineError::CaptureDecode(format!("图片解码失败：{}", e)))?;

        let (raw_width, raw_height) = decoded.dimensions();
        Self::validate_pixel_limits(config, raw_width, raw_height)?;

        let fitted = Self::maybe_fit_capture(decoded, config)?;
        let rgba = fitted.to_rgba8();

        log::info!(
            "✅ 拍摄图片解码成功 - 来源: {} 原始尺寸: {}x{} 输出尺寸: {}x{}",
            raw.source_hint,
            raw_width,
            raw_height,
            rgba.width(),
            rgba.height()
        );

        Ok(rgba)
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), PipelineError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::CaptureDecode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| PipelineError::CaptureDecode(format!("无法读取图片尺寸：{}", e)))
    }

    fn validate_pixel_limits(
        config: &PipelineConfig,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| PipelineError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels == 0 {
            return Err(PipelineError::CaptureDecode(format!(
                "图片尺寸为空：{}x{}",
                width, height
            )));
        }

        if pixels > config.max_decoded_pixels {
            return Err(PipelineError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(
        config: &PipelineConfig,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| PipelineError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > config.max_decoded_bytes {
            return Err(PipelineError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }

    /// 等比缩放到拍摄位图尺寸以内，不放大。
    fn maybe_fit_capture(
        image: DynamicImage,
        config: &PipelineConfig,
    ) -> Result<DynamicImage, PipelineError> {
        if !config.fit_capture {
            return Ok(image);
        }

        let (width, height) = image.dimensions();
        let Some((target_width, target_height)) =
            fit_within(width, height, config.capture_max_width, config.capture_max_height)
        else {
            return Ok(image);
        };

        log::info!(
            "🧩 拍摄图片缩放：{}x{} -> {}x{}（filter={:?}）",
            width,
            height,
            target_width,
            target_height,
            config.resize_filter
        );

        match Self::resize_with_fast_image_resize(&image, target_width, target_height, config.resize_filter)
        {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}",
                    err
                );
                Ok(image.resize_exact(target_width, target_height, config.resize_filter))
            }
        }
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: FilterType,
    ) -> Result<DynamicImage, PipelineError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| PipelineError::CaptureDecode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(
            Self::to_fast_filter(filter),
        ));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| PipelineError::CaptureDecode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| PipelineError::CaptureDecode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn to_fast_filter(filter: FilterType) -> fr::FilterType {
        match filter {
            FilterType::Nearest => fr::FilterType::Box,
            FilterType::Triangle => fr::FilterType::Bilinear,
            FilterType::CatmullRom => fr::FilterType::CatmullRom,
            FilterType::Gaussian => fr::FilterType::Mitchell,
            FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

/// 计算等比缩放后的目标尺寸；已在范围内时返回 `None`。
fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> Option<(u32, u32)> {
    if width <= max_width && height <= max_height {
        return None;
    }

    let (w, h) = (width as u64, height as u64);
    let (max_w, max_h) = (max_width as u64, max_height as u64);

    // 交叉相乘比较宽高比，整数运算避免浮点误差
    let (target_width, target_height) = if w * max_h > h * max_w {
        (max_w, h * max_w / w)
    } else {
        (w * max_h / h, max_h)
    };

    Some((target_width.max(1) as u32, target_height.max(1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::NoopSink;
    use image::ImageFormat;
    use std::sync::Arc;

    fn handler() -> PipelineHandler {
        PipelineHandler::new(PipelineConfig::default(), Arc::new(NoopSink))
            .expect("handler init failed")
    }

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        assert_eq!(fit_within(4032, 3024, 1024, 768), Some((1024, 768)));
        assert_eq!(fit_within(3000, 4000, 1024, 768), Some((576, 768)));
        assert_eq!(fit_within(800, 600, 1024, 768), None);
    }

    #[test]
    fn decode_fits_large_capture_into_bitmap_size() {
        let handler = handler();
        let config = PipelineConfig::default();

        let rgba = handler
            .decode_capture(
                RawCapture {
                    bytes: create_png_bytes(2048, 1536),
                    source_hint: "test",
                },
                &config,
            )
            .expect("decode should succeed");

        assert_eq!(rgba.dimensions(), (1024, 768));
    }

    #[test]
    fn decode_keeps_size_when_fitting_disabled() {
        let handler = handler();
        let mut config = PipelineConfig::default();
        config.fit_capture = false;

        let rgba = handler
            .decode_capture(
                RawCapture {
                    bytes: create_png_bytes(1200, 900),
                    source_hint: "test",
                },
                &config,
            )
            .expect("decode should succeed");

        assert_eq!(rgba.dimensions(), (1200, 900));
    }

    #[test]
    fn stress_rejects_too_many_pixels() {
        let handler = handler();
        let mut config = PipelineConfig::default();
        config.max_decoded_pixels = 1_000_000;

        let result = handler.decode_capture(
            RawCapture {
                bytes: create_png_bytes(2000, 2000),
                source_hint: "test",
            },
            &config,
        );

        assert!(matches!(result, Err(PipelineError::ResourceLimit(_))));
    }

    #[test]
    fn decode_rejects_truncated_data() {
        let handler = handler();
        let mut bytes = create_png_bytes(64, 64);
        bytes.truncate(40);

        let result = handler.decode_capture(
            RawCapture {
                bytes,
                source_hint: "test",
            },
            &PipelineConfig::default(),
        );

        assert!(matches!(result, Err(PipelineError::CaptureDecode(_))));
    }
}
