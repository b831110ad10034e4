//! 设置文件模块
//!
//! 设置以 JSON 保存在 `<config_dir>/camera-ocr/settings.json`。
//! 缺失字段取默认值，文件不存在时整体使用默认设置。
//! 读取后通过 `apply_to` 写入 `PipelineConfig`，非法取值在这里统一拒绝。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_pipeline::{DiagnosticFormat, FinalStage, PipelineConfig};

const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub final_stage: String,
    pub contrast_factor: f32,
    pub binarize_threshold: u8,
    pub diagnostics_enabled: bool,
    /// 为空时使用默认诊断目录。
    pub diagnostics_dir: Option<PathBuf>,
    pub diagnostics_format: String,
    pub jpeg_quality: u8,
    pub capture_max_width: u32,
    pub capture_max_height: u32,
    pub ocr_lang: String,
    pub ocr_psm: i32,
}

impl Default for AppSettings {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            final_stage: pipeline.final_stage.as_str().to_string(),
            contrast_factor: pipeline.contrast_factor,
            binarize_threshold: pipeline.binarize_threshold,
            diagnostics_enabled: pipeline.persist_diagnostics,
            diagnostics_dir: None,
            diagnostics_format: "jpeg".to_string(),
            jpeg_quality: 100,
            capture_max_width: pipeline.capture_max_width,
            capture_max_height: pipeline.capture_max_height,
            ocr_lang: "eng".to_string(),
            ocr_psm: 3,
        }
    }
}

impl AppSettings {
    /// 将设置写入流水线配置，写入前整体校验。
    pub fn apply_to(&self, config: &mut PipelineConfig) -> Result<(), AppError> {
        let mut next = config.clone();
        next.final_stage = FinalStage::from_str(&self.final_stage)?;
        next.contrast_factor = self.contrast_factor;
        next.binarize_threshold = self.binarize_threshold;
        next.persist_diagnostics = self.diagnostics_enabled;
        next.capture_max_width = self.capture_max_width;
        next.capture_max_height = self.capture_max_height;
        next.validate()?;

        *config = next;
        Ok(())
    }

    pub fn diagnostic_format(&self) -> Result<DiagnosticFormat, AppError> {
        Ok(DiagnosticFormat::from_str(
            &self.diagnostics_format,
            self.jpeg_quality,
        )?)
    }
}

/// 默认设置文件路径（不创建目录）。
pub fn default_settings_path() -> Result<PathBuf, AppError> {
    dirs::config_dir()
        .map(|dir| dir.join(crate::APP_DIR_NAME).join(SETTINGS_FILE_NAME))
        .ok_or_else(|| AppError::Storage("获取配置目录失败".to_string()))
}

/// 读取设置；文件不存在时返回默认设置。
pub fn load_settings(path: &Path) -> Result<AppSettings, AppError> {
    if !path.exists() {
        log::debug!("设置文件不存在，使用默认设置：{}", path.display());
        return Ok(AppSettings::default());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str::<AppSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Storage(format!("创建配置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}
