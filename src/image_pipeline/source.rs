//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `CaptureSource` 表示相机协作方交付的拍摄数据
//! - `RawCapture` 表示已加载但未解码的字节
//! - `CroppedRegion` / `PipelineResult` 表示流水线各阶段产物及来源信息

use std::path::PathBuf;

use image::RgbaImage;

use crate::geometry::ImageRect;

/// 拍摄数据来源。
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// 相机写出的图片文件。
    FilePath(PathBuf),
    /// 已编码的图片字节（JPEG / PNG 等）。
    Bytes(Vec<u8>),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawCapture {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 裁剪阶段输出。
#[derive(Debug, Clone)]
pub struct CroppedRegion {
    pub image: RgbaImage,
    /// 实际裁剪范围（已夹到图像边界内）。
    pub bounds: ImageRect,
}

/// 流水线阶段，顺序即执行顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Crop,
    Grayscale,
    Contrast,
    Binarize,
}

impl PipelineStage {
    /// 诊断图片的逻辑名称。
    pub fn diagnostic_name(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Grayscale => "grey",
            Self::Contrast => "contrast",
            Self::Binarize => "binarized",
        }
    }
}

/// 流水线最终结果，交给 OCR 协作方。
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// 最终处理后的图片。
    pub image: RgbaImage,
    /// 图像坐标下的实际裁剪范围。
    pub crop_bounds: ImageRect,
    /// 按执行顺序记录已应用的阶段。
    pub stages: Vec<PipelineStage>,
    /// 成功写出的诊断图片路径。
    pub diagnostics: Vec<PathBuf>,
}
