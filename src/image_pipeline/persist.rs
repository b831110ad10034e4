//! # 诊断图片落盘模块
//!
//! ## 设计思路
//!
//! 流水线每个阶段的输出都可以写到磁盘，便于排查“为什么识别不出来”。
//! 落盘是旁路能力：失败只记录日志，不能影响内存中的流水线数据。
//!
//! ## 实现思路
//!
//! - `DiagnosticSink` 抽象写入目标，编排器只依赖该 trait。
//! - `FileDiagnosticSink` 写 JPEG（默认质量 100）或 PNG；文件名带时间戳前缀，
//!   避免两次连续拍摄相互覆盖。
//! - 逻辑名称只保留 `[A-Za-z0-9_-]`，防止路径穿越。
//! - `NoopSink` 用于关闭诊断输出的场景。

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;

use super::PipelineError;

static UNSAFE_NAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_-]+").expect("static regex is valid")
});

/// 诊断图片写入目标。
pub trait DiagnosticSink: Send + Sync {
    /// 写出图片，返回实际写入的路径；不落盘的实现返回 `None`。
    fn persist(&self, image: &RgbaImage, name: &str) -> Result<Option<PathBuf>, PipelineError>;
}

/// 诊断图片编码格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticFormat {
    Jpeg { quality: u8 },
    Png,
}

impl DiagnosticFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "jpg",
            Self::Png => "png",
        }
    }

    /// 从外部字符串解析格式，`quality` 仅对 JPEG 生效。
    pub fn from_str(format: &str, quality: u8) -> Result<Self, PipelineError> {
        match format.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => {
                if !(1..=100).contains(&quality) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "JPEG 质量必须在 1~100 之间，当前为 {}",
                        quality
                    )));
                }
                Ok(Self::Jpeg { quality })
            }
            "png" => Ok(Self::Png),
            other => Err(PipelineError::InvalidConfig(format!(
                "未知诊断图片格式：{}（可选：jpeg / png）",
                other
            ))),
        }
    }
}

impl Default for DiagnosticFormat {
    fn default() -> Self {
        Self::Jpeg { quality: 100 }
    }
}

/// 写入本地目录的诊断落盘实现。
#[derive(Debug, Clone)]
pub struct FileDiagnosticSink {
    dir: PathBuf,
    format: DiagnosticFormat,
    timestamped: bool,
}

impl FileDiagnosticSink {
    pub fn new(dir: impl Into<PathBuf>, format: DiagnosticFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
            timestamped: true,
        }
    }

    /// 关闭时间戳前缀，同名阶段每次覆盖同一个文件。
    pub fn with_timestamped_names(mut self, timestamped: bool) -> Self {
        self.timestamped = timestamped;
        self
    }

    fn file_name(&self, name: &str) -> String {
        let logical = sanitize_name(name);
        if self.timestamped {
            let timestamp = Local::now().format("%Y%m%d%H%M%S%f");
            format!("{}_{}.{}", timestamp, logical, self.format.extension())
        } else {
            format!("{}.{}", logical, self.format.extension())
        }
    }

    fn encode_to(&self, image: &RgbaImage, path: &Path) -> Result<(), PipelineError> {
        match self.format {
            DiagnosticFormat::Jpeg { quality } => {
                // JPEG 不支持 Alpha，先转为 RGB
                let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                let file = File::create(path).map_err(|e| {
                    PipelineError::Persistence(format!("创建文件 {} 失败：{}", path.display(), e))
                })?;
                let mut writer = BufWriter::new(file);
                JpegEncoder::new_with_quality(&mut writer, quality)
                    .encode_image(&rgb)
                    .map_err(|e| PipelineError::Persistence(format!("JPEG 编码失败：{}", e)))?;
                writer
                    .flush()
                    .map_err(|e| PipelineError::Persistence(format!("写入文件失败：{}", e)))
            }
            DiagnosticFormat::Png => image
                .save_with_format(path, ImageFormat::Png)
                .map_err(|e| PipelineError::Persistence(format!("PNG 写入失败：{}", e))),
        }
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn persist(&self, image: &RgbaImage, name: &str) -> Result<Option<PathBuf>, PipelineError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                PipelineError::Persistence(format!(
                    "创建诊断目录 '{}' 失败：{}",
                    self.dir.display(),
                    e
                ))
            })?;
        }

        let path = self.dir.join(self.file_name(name));
        self.encode_to(image, &path)?;

        log::info!("💾 诊断图片已保存：{}", path.display());
        Ok(Some(path))
    }
}

/// 丢弃所有诊断输出。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn persist(&self, _image: &RgbaImage, name: &str) -> Result<Option<PathBuf>, PipelineError> {
        log::debug!("⏭️  诊断输出已关闭，跳过 {}", name);
        Ok(None)
    }
}

fn sanitize_name(name: &str) -> String {
    let cleaned = UNSAFE_NAME_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}
