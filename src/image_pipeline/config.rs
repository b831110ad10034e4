//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `PipelineConfig`，保证运行时行为可观测、可调整、可测试。
//! 流水线最终阶段（grayscale / contrast / binarize）作为显式配置项，
//! 不再依赖代码里提前 `return` 来决定实际输出。
//!
//! ## 实现思路
//!
//! - `Default` 提供与原始拍照界面一致的参数（1024×768 位图、对比度系数 10）。
//! - `FinalStage` 负责阶段字符串解析与反向输出。
//! - `validate` 在写入运行时配置前统一校验，避免半途失败。

use image::imageops::FilterType;

use super::PipelineError;

/// 预处理流水线配置。
///
/// 字段覆盖了加载、解码适配、滤镜与诊断落盘四个阶段。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 是否将拍摄图片缩放到 `capture_max_width × capture_max_height` 以内。
    pub fit_capture: bool,
    /// 拍摄位图最大宽度。
    pub capture_max_width: u32,
    /// 拍摄位图最大高度。
    pub capture_max_height: u32,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 流水线最后执行到哪个阶段。
    pub final_stage: FinalStage,
    /// 对比度系数，`1.0` 为不变。
    pub contrast_factor: f32,
    /// 二值化亮度阈值。
    pub binarize_threshold: u8,
    /// 是否写出每个阶段的诊断图片。
    pub persist_diagnostics: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            fit_capture: true,
            capture_max_width: 1024,
            capture_max_height: 768,
            resize_filter: FilterType::Triangle,
            final_stage: FinalStage::Contrast,
            contrast_factor: 10.0,
            binarize_threshold: 128,
            persist_diagnostics: true,
        }
    }
}

impl PipelineConfig {
    /// 校验配置取值。
    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_contrast_factor(self.contrast_factor)?;

        if self.capture_max_width == 0 || self.capture_max_height == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "拍摄位图尺寸必须大于 0：{}x{}",
                self.capture_max_width, self.capture_max_height
            )));
        }
        if self.max_decoded_pixels == 0 || self.max_file_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_decoded_pixels / max_file_size 不能为 0".to_string(),
            ));
        }
        if self.max_decoded_bytes < 4 * 1024 * 1024 {
            return Err(PipelineError::InvalidConfig(
                "max_decoded_bytes 不能小于 4MB".to_string(),
            ));
        }

        Ok(())
    }
}

/// 对比度系数必须是有限值。
pub(crate) fn validate_contrast_factor(factor: f32) -> Result<(), PipelineError> {
    if !factor.is_finite() {
        return Err(PipelineError::InvalidContrastFactor(format!(
            "系数必须为有限数值，当前为 {}",
            factor
        )));
    }
    Ok(())
}

/// 流水线最终阶段。
///
/// - `Grayscale`：裁剪 → 灰度
/// - `Contrast`：裁剪 → 灰度 → 对比度增强
/// - `Binarize`：裁剪 → 灰度 → 对比度增强 → 二值化
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FinalStage {
    Grayscale,
    Contrast,
    Binarize,
}

impl FinalStage {
    /// 从外部字符串解析阶段。
    ///
    /// # 示例
    /// ```rust
    /// use camera_ocr::image_pipeline::FinalStage;
    ///
    /// let stage = FinalStage::from_str("contrast")?;
    /// assert_eq!(stage.as_str(), "contrast");
    /// # Ok::<(), camera_ocr::image_pipeline::PipelineError>(())
    /// ```
    pub fn from_str(stage: &str) -> Result<Self, PipelineError> {
        match stage.trim().to_lowercase().as_str() {
            "grayscale" | "grey" | "gray" => Ok(Self::Grayscale),
            "contrast" => Ok(Self::Contrast),
            "binarize" | "binarized" => Ok(Self::Binarize),
            other => Err(PipelineError::InvalidConfig(format!(
                "未知流水线阶段：{}（可选：grayscale / contrast / binarize）",
                other
            ))),
        }
    }

    /// 将阶段输出为稳定字符串，供日志与设置文件持久化。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Contrast => "contrast",
            Self::Binarize => "binarize",
        }
    }
}
