//! # 选区映射与裁剪模块
//!
//! ## 设计思路
//!
//! 用户框选发生在视图坐标，裁剪发生在图像坐标。
//! `map_selection` 是两种坐标之间唯一的转换入口，`crop` 只接受图像坐标矩形。
//!
//! ## 实现思路
//!
//! - 映射按轴独立缩放：`coord * image_dim / view_dim`，整数运算向零截断，
//!   与浮点比例后截断的结果一致，但没有浮点误差。
//! - 裁剪先夹到图像边界，再判断面积；空选区显式返回 `EmptyCrop`。

use image::RgbaImage;

use crate::geometry::{ImageRect, ImageSize, ViewRect, ViewSize};

use super::source::CroppedRegion;
use super::PipelineError;

/// 将视图坐标选区映射到位图像素坐标。
///
/// 视图宽或高为 0 时返回 `InvalidViewSize`。
///
/// # 示例
/// ```rust
/// use camera_ocr::geometry::{ImageRect, ImageSize, ViewRect, ViewSize};
/// use camera_ocr::image_pipeline::map_selection;
///
/// let mapped = map_selection(
///     ViewRect::new(10, 10, 50, 50),
///     ViewSize::new(100, 100),
///     ImageSize::new(1024, 768),
/// )?;
/// assert_eq!(mapped, ImageRect::new(102, 76, 512, 384));
/// # Ok::<(), camera_ocr::image_pipeline::PipelineError>(())
/// ```
pub fn map_selection(
    rect: ViewRect,
    view: ViewSize,
    image: ImageSize,
) -> Result<ImageRect, PipelineError> {
    if view.width == 0 || view.height == 0 {
        return Err(PipelineError::InvalidViewSize(format!(
            "视图尺寸为 {}x{}，无法计算缩放比例",
            view.width, view.height
        )));
    }

    let scale_x = |v: i32| scale_axis(v, image.width, view.width);
    let scale_y = |v: i32| scale_axis(v, image.height, view.height);

    Ok(ImageRect::new(
        scale_x(rect.left),
        scale_y(rect.top),
        scale_x(rect.right),
        scale_y(rect.bottom),
    ))
}

fn scale_axis(value: i32, image_dim: u32, view_dim: u32) -> i32 {
    let scaled = value as i128 * image_dim as i128 / view_dim as i128;
    scaled.clamp(i32::MIN as i128, i32::MAX as i128) as i32
}

/// 按图像坐标矩形裁剪出子图。
///
/// 矩形先夹到 `[0, width] × [0, height]`，面积为空时返回 `EmptyCrop`。
pub fn crop(image: &RgbaImage, rect: ImageRect) -> Result<CroppedRegion, PipelineError> {
    let bounds = rect.clip_to(ImageSize::of(image));

    if bounds.is_empty() {
        return Err(PipelineError::EmptyCrop(format!(
            "选区 {} 裁剪到 {}x{} 图像后为 {}x{}",
            rect,
            image.width(),
            image.height(),
            bounds.width().max(0),
            bounds.height().max(0)
        )));
    }

    // 夹取后四个边界均在 [0, u32 范围] 内，宽高为正
    let x = bounds.left as u32;
    let y = bounds.top as u32;
    let width = bounds.width() as u32;
    let height = bounds.height() as u32;

    let cropped = image::imageops::crop_imm(image, x, y, width, height).to_image();

    Ok(CroppedRegion {
        image: cropped,
        bounds,
    })
}
