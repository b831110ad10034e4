//! # 坐标空间与矩形模块
//!
//! ## 设计思路
//!
//! 用户在屏幕上框选的矩形（视图坐标）与拍摄得到的位图（图像坐标）尺寸不同，
//! 两者混用会导致裁剪区域错位。这里把坐标空间编码进类型：
//! `Rect<ViewSpace>` 与 `Rect<ImageSpace>` 是两种不同类型，
//! 唯一的转换入口是 `image_pipeline::map_selection`。
//!
//! ## 实现思路
//!
//! - 空间标记为零大小类型，通过 `PhantomData` 挂在矩形与尺寸上。
//! - `Clone/Copy/PartialEq/Debug` 手动实现，避免派生宏对标记类型追加约束。
//! - 裁剪前允许反转、越界的矩形；`clip_to` 之后才保证 `left <= right`、`top <= bottom`。

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// 坐标空间标记。
pub trait CoordinateSpace {
    /// 用于日志与错误信息的空间名称。
    const NAME: &'static str;
}

/// 屏幕视图坐标（用户框选所在空间）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSpace;

/// 位图像素坐标。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpace;

impl CoordinateSpace for ViewSpace {
    const NAME: &'static str = "view";
}

impl CoordinateSpace for ImageSpace {
    const NAME: &'static str = "image";
}

/// 带坐标空间标记的整数矩形。
pub struct Rect<S> {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    _space: PhantomData<S>,
}

pub type ViewRect = Rect<ViewSpace>;
pub type ImageRect = Rect<ImageSpace>;

impl<S> Rect<S> {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            _space: PhantomData,
        }
    }

    /// 宽度，可能为负（反转矩形）。
    pub fn width(&self) -> i64 {
        self.right as i64 - self.left as i64
    }

    /// 高度，可能为负（反转矩形）。
    pub fn height(&self) -> i64 {
        self.bottom as i64 - self.top as i64
    }

    /// 面积非正即视为空。
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// 将矩形夹到 `[0, width] × [0, height]` 范围内。
    ///
    /// 结果可能仍为空（例如矩形完全在边界外），调用方需检查 `is_empty`。
    pub fn clip_to(&self, bounds: Size<S>) -> Self {
        let max_x = i32::try_from(bounds.width).unwrap_or(i32::MAX);
        let max_y = i32::try_from(bounds.height).unwrap_or(i32::MAX);

        Self::new(
            self.left.max(0),
            self.top.max(0),
            self.right.min(max_x),
            self.bottom.min(max_y),
        )
    }
}

impl<S> Clone for Rect<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Rect<S> {}

impl<S> PartialEq for Rect<S> {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left
            && self.top == other.top
            && self.right == other.right
            && self.bottom == other.bottom
    }
}

impl<S> Eq for Rect<S> {}

impl<S: CoordinateSpace> fmt::Debug for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect<{}>({}, {}, {}, {})",
            S::NAME,
            self.left,
            self.top,
            self.right,
            self.bottom
        )
    }
}

impl<S: CoordinateSpace> fmt::Display for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

/// 从 `left,top,right,bottom` 文本解析矩形（命令行与配置使用）。
impl<S> FromStr for Rect<S> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("矩形格式应为 left,top,right,bottom：{}", s));
        }

        let mut values = [0i32; 4];
        for (slot, part) in values.iter_mut().zip(parts) {
            *slot = part
                .parse()
                .map_err(|e| format!("矩形坐标无法解析 '{}'：{}", part, e))?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

/// 带坐标空间标记的尺寸。
pub struct Size<S> {
    pub width: u32,
    pub height: u32,
    _space: PhantomData<S>,
}

pub type ViewSize = Size<ViewSpace>;
pub type ImageSize = Size<ImageSpace>;

impl<S> Size<S> {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            _space: PhantomData,
        }
    }
}

impl ImageSize {
    pub fn of(image: &image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height)
    }
}

impl<S> Clone for Size<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Size<S> {}

impl<S> PartialEq for Size<S> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl<S> Eq for Size<S> {}

impl<S: CoordinateSpace> fmt::Debug for Size<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Size<{}>({}x{})", S::NAME, self.width, self.height)
    }
}

/// 从 `WIDTHxHEIGHT` 文本解析尺寸。
impl<S> FromStr for Size<S> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("尺寸格式应为 WIDTHxHEIGHT：{}", s))?;

        let width = w
            .trim()
            .parse()
            .map_err(|e| format!("宽度无法解析 '{}'：{}", w, e))?;
        let height = h
            .trim()
            .parse()
            .map_err(|e| format!("高度无法解析 '{}'：{}", h, e))?;

        Ok(Self::new(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_floors_origin_and_caps_far_edges() {
        let rect = ImageRect::new(-10, -10, 150, 50);
        let clipped = rect.clip_to(ImageSize::new(100, 100));

        assert_eq!(clipped, ImageRect::new(0, 0, 100, 50));
        assert!(!clipped.is_empty());
    }

    #[test]
    fn clip_of_rect_outside_bounds_is_empty() {
        let rect = ImageRect::new(200, 200, 300, 300);
        assert!(rect.clip_to(ImageSize::new(100, 100)).is_empty());

        let rect = ImageRect::new(-50, -50, -10, -10);
        assert!(rect.clip_to(ImageSize::new(100, 100)).is_empty());
    }

    #[test]
    fn inverted_rect_is_empty() {
        let rect = ViewRect::new(50, 50, 10, 10);
        assert!(rect.is_empty());
        assert_eq!(rect.width(), -40);
    }

    #[test]
    fn parse_rect_and_size_from_text() {
        let rect: ViewRect = "10, 20,30,40".parse().expect("rect should parse");
        assert_eq!(rect, ViewRect::new(10, 20, 30, 40));

        let size: ViewSize = "1080x1920".parse().expect("size should parse");
        assert_eq!(size, ViewSize::new(1080, 1920));

        assert!("1,2,3".parse::<ViewRect>().is_err());
        assert!("100".parse::<ViewSize>().is_err());
    }

    #[test]
    fn debug_output_names_the_space() {
        let rect = ImageRect::new(1, 2, 3, 4);
        assert_eq!(format!("{:?}", rect), "Rect<image>(1, 2, 3, 4)");
    }
}
