//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理相机协作方交付的不同形式（文件 / 原始字节 / Base64）的拍摄数据，
//! 并在“尽可能早”的阶段执行输入校验，尽快失败。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 原始字节：体积限制。
//! - Base64：格式解析 + 解码前体积预估。
//! - 三种来源最终都经过文件签名（magic bytes）校验，非图片统一映射为 `CaptureDecode`。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::source::{CaptureSource, RawCapture};
use super::{PipelineConfig, PipelineError, PipelineHandler};

impl PipelineHandler {
    /// 按来源加载拍摄数据原始字节。
    pub(crate) fn load_capture(
        &self,
        source: CaptureSource,
        config: &PipelineConfig,
    ) -> Result<RawCapture, PipelineError> {
        match source {
            CaptureSource::FilePath(path) => Self::load_from_file(&path, config),
            CaptureSource::Bytes(bytes) => Self::load_from_bytes(bytes, config),
            CaptureSource::Base64(data) => Self::load_from_base64(&data, config),
        }
    }

    fn load_from_bytes(bytes: Vec<u8>, config: &PipelineConfig) -> Result<RawCapture, PipelineError> {
        Self::validate_size(bytes.len() as u64, config.max_file_size, "拍摄数据")?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawCapture {
            bytes,
            source_hint: "bytes",
        })
    }

    fn load_from_base64(data: &str, config: &PipelineConfig) -> Result<RawCapture, PipelineError> {
        log::info!("📝 开始处理 base64 拍摄数据");

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;
        Self::validate_size(bytes.len() as u64, config.max_file_size, "Base64 解码后数据")?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawCapture {
            bytes,
            source_hint: "base64",
        })
    }

    fn load_from_file(path: &Path, config: &PipelineConfig) -> Result<RawCapture, PipelineError> {
        log::info!("📁 开始读取拍摄图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(PipelineError::FileSystem(format!(
                "文件不存在：{}",
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| PipelineError::FileSystem(format!("无法读取文件信息：{}", e)))?;
        Self::validate_size(metadata.len(), config.max_file_size, "文件")?;

        let bytes = std::fs::read(path)
            .map_err(|e| PipelineError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawCapture {
            bytes,
            source_hint: "file",
        })
    }

    fn validate_size(len: u64, limit: u64, what: &str) -> Result<(), PipelineError> {
        if len > limit {
            return Err(PipelineError::ResourceLimit(format!(
                "{}过大：{:.2} MB（限制：{:.2} MB）",
                what,
                len as f64 / 1024.0 / 1024.0,
                limit as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, PipelineError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| PipelineError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| PipelineError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 解析 Base64 输入（支持 Data URL / 纯 Base64），解码前按预估体积拒绝。
    fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, PipelineError> {
        let normalized = data.trim();

        let payload = if normalized.starts_with("data:image/") {
            let base64_start = normalized
                .find(";base64,")
                .ok_or_else(|| PipelineError::CaptureDecode("缺少 base64 标记".to_string()))?;
            &normalized[base64_start + 8..]
        } else {
            normalized
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(payload)?;
        if estimated_len > max_file_size {
            return Err(PipelineError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| PipelineError::CaptureDecode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::CaptureDecode("拍摄数据为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| PipelineError::CaptureDecode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(PipelineError::CaptureDecode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}
