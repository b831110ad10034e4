//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `PipelineHandler` 只负责流程编排与配置管理，不直接与 UI 或 OCR 绑定。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 选区映射（视图坐标 → 图像坐标）
//! 3. 裁剪（空选区立即终止）
//! 4. 灰度 → 对比度增强 → 二值化（按 `final_stage` 截止）
//!
//! 每个阶段输出都先交给诊断落盘，再进入下一阶段；落盘失败只记录日志。
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<PipelineConfig>>` 支持运行时动态调整。
//! - 单次运行内使用“同一配置快照”，避免处理中途配置漂移。
//! - 每次运行独占自己的图像链，不保留跨运行状态。
//! - 阶段之间检查 `is_cancelled`，实现协作式取消。
//! - 记录 `map/crop/filter/total` 阶段耗时，便于性能诊断。

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use image::RgbaImage;

use crate::geometry::{ImageSize, ViewRect, ViewSize};

use super::config::validate_contrast_factor;
use super::filters::{adjust_contrast, binarize, grayscale};
use super::mapping::{crop, map_selection};
use super::source::{CaptureSource, PipelineResult, PipelineStage};
use super::{DiagnosticSink, FinalStage, PipelineConfig, PipelineError};

/// 图像预处理编排器。
///
/// 封装了配置状态与诊断落盘目标，并编排各子模块实现完整流程。
pub struct PipelineHandler {
    config: Arc<RwLock<PipelineConfig>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl PipelineHandler {
    /// 根据初始配置创建编排器，配置非法时直接拒绝。
    ///
    /// # 示例
    /// ```rust
    /// use std::sync::Arc;
    /// use camera_ocr::image_pipeline::{NoopSink, PipelineConfig, PipelineHandler};
    ///
    /// let handler = PipelineHandler::new(PipelineConfig::default(), Arc::new(NoopSink))?;
    /// # Ok::<(), camera_ocr::image_pipeline::PipelineError>(())
    /// ```
    pub fn new(config: PipelineConfig, sink: Arc<dyn DiagnosticSink>) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            sink,
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次运行链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<PipelineConfig, PipelineError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| PipelineError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置。
    pub fn replace_config(&self, config: PipelineConfig) -> Result<(), PipelineError> {
        config.validate()?;
        let mut guard = self
            .config
            .write()
            .map_err(|_| PipelineError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *guard = config;
        Ok(())
    }

    /// 设置流水线最终阶段。
    pub fn set_final_stage(&self, stage: FinalStage) -> Result<(), PipelineError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| PipelineError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.final_stage = stage;

        log::info!(
            "⚙️ 已切换流水线最终阶段：{}（contrast_factor={}, threshold={}）",
            stage.as_str(),
            config.contrast_factor,
            config.binarize_threshold
        );

        Ok(())
    }

    /// 获取当前生效的最终阶段。
    pub fn final_stage(&self) -> Result<FinalStage, PipelineError> {
        Ok(self.config_snapshot()?.final_stage)
    }

    /// 设置对比度系数，非有限值被拒绝。
    pub fn set_contrast_factor(&self, factor: f32) -> Result<(), PipelineError> {
        validate_contrast_factor(factor)?;
        let mut config = self
            .config
            .write()
            .map_err(|_| PipelineError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.contrast_factor = factor;
        Ok(())
    }

    /// 处理主入口：对已解码的拍摄图片执行映射、裁剪与滤镜。
    ///
    /// # 示例
    /// ```rust
    /// use std::sync::Arc;
    /// use camera_ocr::geometry::{ViewRect, ViewSize};
    /// use camera_ocr::image_pipeline::{NoopSink, PipelineConfig, PipelineHandler};
    /// use image::RgbaImage;
    ///
    /// let handler = PipelineHandler::new(PipelineConfig::default(), Arc::new(NoopSink))?;
    /// let captured = RgbaImage::new(1024, 768);
    /// let result = handler.process(
    ///     captured,
    ///     ViewRect::new(10, 10, 50, 50),
    ///     ViewSize::new(100, 100),
    /// )?;
    /// assert_eq!(result.image.dimensions(), (410, 308));
    /// # Ok::<(), camera_ocr::image_pipeline::PipelineError>(())
    /// ```
    pub fn process(
        &self,
        captured: RgbaImage,
        selection: ViewRect,
        view: ViewSize,
    ) -> Result<PipelineResult, PipelineError> {
        self.process_with_cancel(captured, selection, view, || false)
    }

    /// 带协作式取消的处理入口，`is_cancelled` 在每个阶段开始前检查。
    pub fn process_with_cancel<C>(
        &self,
        captured: RgbaImage,
        selection: ViewRect,
        view: ViewSize,
        is_cancelled: C,
    ) -> Result<PipelineResult, PipelineError>
    where
        C: Fn() -> bool,
    {
        let config = self.config_snapshot()?;
        self.run_stages(&config, captured, selection, view, &is_cancelled)
    }

    /// 从拍摄来源开始的完整链路：加载 → 解码 → 映射 → 裁剪 → 滤镜。
    pub fn decode_and_process<C>(
        &self,
        source: CaptureSource,
        selection: ViewRect,
        view: ViewSize,
        is_cancelled: C,
    ) -> Result<PipelineResult, PipelineError>
    where
        C: Fn() -> bool,
    {
        let config = self.config_snapshot()?;

        let load_start = Instant::now();
        let raw = self.load_capture(source, &config)?;
        let load_elapsed = load_start.elapsed();

        Self::check_cancelled(&is_cancelled, "decode")?;
        let decode_start = Instant::now();
        let captured = self.decode_capture(raw, &config)?;
        let decode_elapsed = decode_start.elapsed();

        log::info!(
            "📷 拍摄图片就绪 - load={}ms decode={}ms",
            load_elapsed.as_millis(),
            decode_elapsed.as_millis()
        );

        self.run_stages(&config, captured, selection, view, &is_cancelled)
    }

    fn run_stages<C>(
        &self,
        config: &PipelineConfig,
        captured: RgbaImage,
        selection: ViewRect,
        view: ViewSize,
        is_cancelled: &C,
    ) -> Result<PipelineResult, PipelineError>
    where
        C: Fn() -> bool,
    {
        let total_start = Instant::now();
        let mut stages = Vec::with_capacity(4);
        let mut diagnostics = Vec::new();

        Self::check_cancelled(is_cancelled, "map")?;
        let image_rect = map_selection(selection, view, ImageSize::of(&captured))?;
        log::debug!("选区映射：{:?} -> {:?}", selection, image_rect);

        Self::check_cancelled(is_cancelled, "crop")?;
        let crop_start = Instant::now();
        let region = crop(&captured, image_rect)?;
        drop(captured);
        let crop_elapsed = crop_start.elapsed();
        stages.push(PipelineStage::Crop);
        self.persist_stage(config, &region.image, PipelineStage::Crop, &mut diagnostics);

        let filter_start = Instant::now();

        Self::check_cancelled(is_cancelled, "grayscale")?;
        let mut current = grayscale(&region.image);
        stages.push(PipelineStage::Grayscale);
        self.persist_stage(config, &current, PipelineStage::Grayscale, &mut diagnostics);

        if config.final_stage >= FinalStage::Contrast {
            Self::check_cancelled(is_cancelled, "contrast")?;
            current = adjust_contrast(&current, config.contrast_factor)?;
            stages.push(PipelineStage::Contrast);
            self.persist_stage(config, &current, PipelineStage::Contrast, &mut diagnostics);
        }

        if config.final_stage >= FinalStage::Binarize {
            Self::check_cancelled(is_cancelled, "binarize")?;
            current = binarize(&current, config.binarize_threshold);
            stages.push(PipelineStage::Binarize);
            self.persist_stage(config, &current, PipelineStage::Binarize, &mut diagnostics);
        }

        let filter_elapsed = filter_start.elapsed();
        log::info!(
            "✅ 预处理完成 - 选区 {} 输出 {}x{} 阶段 {:?} crop={}ms filter={}ms total={}ms",
            region.bounds,
            current.width(),
            current.height(),
            stages,
            crop_elapsed.as_millis(),
            filter_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(PipelineResult {
            image: current,
            crop_bounds: region.bounds,
            stages,
            diagnostics,
        })
    }

    /// 诊断落盘：失败只告警，不中断流水线。
    fn persist_stage(
        &self,
        config: &PipelineConfig,
        image: &RgbaImage,
        stage: PipelineStage,
        diagnostics: &mut Vec<PathBuf>,
    ) {
        if !config.persist_diagnostics {
            return;
        }

        match self.sink.persist(image, stage.diagnostic_name()) {
            Ok(Some(path)) => diagnostics.push(path),
            Ok(None) => {}
            Err(err) => {
                log::warn!("⚠️ 阶段 {} 诊断图片写入失败，继续处理：{}", stage.diagnostic_name(), err);
            }
        }
    }

    fn check_cancelled<C>(is_cancelled: &C, next_stage: &str) -> Result<(), PipelineError>
    where
        C: Fn() -> bool,
    {
        if is_cancelled() {
            log::info!("⏹️ 流水线在 {} 阶段前被取消", next_stage);
            return Err(PipelineError::Cancelled(format!("在 {} 阶段前取消", next_stage)));
        }
        Ok(())
    }
}
