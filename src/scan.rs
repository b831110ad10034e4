//! # 扫描服务层
//!
//! ## 设计思路
//!
//! `ScanService` 是一次“拍照取字”的完整入口：
//! 加载 → 解码 → 预处理 → 文字识别，各段顺序 `await`。
//! CPU 密集的部分放到 `spawn_blocking`，不阻塞异步运行时。
//!
//! ## 实现思路
//!
//! - 每个请求登记一个取消标志，`cancel(request_id)` 只负责置位，
//!   流水线在阶段之间检查。同一编号在处理中时拒绝再次登记。
//! - 识别失败记录 `error` 日志后原样返回，由调用方决定如何提示。
//! - 配置调整直接转发给内部 `PipelineHandler`。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;

use crate::error::AppError;
use crate::geometry::{ViewRect, ViewSize};
use crate::image_pipeline::{
    CaptureSource, FinalStage, PipelineError, PipelineHandler, PipelineResult,
};
use crate::ocr::{TextBlock, TextRecognizer};

/// 一次扫描请求：拍摄数据 + 用户在预览上框出的选区。
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub request_id: String,
    pub source: CaptureSource,
    pub selection: ViewRect,
    pub view: ViewSize,
}

/// 扫描结果。
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub request_id: String,
    /// 各文本块按换行拼接后的全文。
    pub text: String,
    pub blocks: Vec<TextBlock>,
    /// 实际执行过的阶段名称，按执行顺序。
    pub stages: Vec<&'static str>,
    pub crop_width: u32,
    pub crop_height: u32,
    pub diagnostics: Vec<PathBuf>,
}

/// 扫描服务状态，持有流水线编排器与识别器。
pub struct ScanService<R> {
    handler: Arc<PipelineHandler>,
    recognizer: Arc<R>,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl<R> ScanService<R>
where
    R: TextRecognizer + 'static,
{
    pub fn new(handler: PipelineHandler, recognizer: R) -> Self {
        Self {
            handler: Arc::new(handler),
            recognizer: Arc::new(recognizer),
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    /// 执行一次完整扫描。
    ///
    /// `request_id` 已在处理中时返回 [`AppError::DuplicateRequest`]。
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanOutcome, AppError> {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        {
            let mut guard = self
                .cancel_flags
                .lock()
                .map_err(|_| PipelineError::ResourceLimit("扫描取消标志锁已中毒".to_string()))?;
            if guard.contains_key(&request.request_id) {
                return Err(AppError::DuplicateRequest(request.request_id));
            }
            guard.insert(request.request_id.clone(), Arc::clone(&cancel_flag));
        }

        let request_id = request.request_id.clone();
        let result = self.run(request, Arc::clone(&cancel_flag)).await;

        {
            let mut guard = self
                .cancel_flags
                .lock()
                .map_err(|_| PipelineError::ResourceLimit("扫描取消标志锁已中毒".to_string()))?;
            if guard
                .get(&request_id)
                .is_some_and(|flag| Arc::ptr_eq(flag, &cancel_flag))
            {
                guard.remove(&request_id);
            }
        }

        // 标志移除后不会再被置位，这里的读取是最终结论
        let result = match result {
            Ok(_) if cancel_flag.load(Ordering::SeqCst) => {
                Err(PipelineError::Cancelled("识别完成前已取消".to_string()).into())
            }
            other => other,
        };

        if let Err(err) = &result {
            log::warn!("❌ 扫描 {} 失败 [{}]：{}", request_id, err.code(), err);
        }

        result
    }

    async fn run(
        &self,
        request: ScanRequest,
        cancel_flag: Arc<AtomicBool>,
    ) -> Result<ScanOutcome, AppError> {
        let total_start = Instant::now();
        let ScanRequest {
            request_id,
            source,
            selection,
            view,
        } = request;

        let handler = Arc::clone(&self.handler);
        let pipeline_flag = Arc::clone(&cancel_flag);
        let processed: PipelineResult = tokio::task::spawn_blocking(move || {
            handler.decode_and_process(source, selection, view, || {
                pipeline_flag.load(Ordering::SeqCst)
            })
        })
        .await??;

        if cancel_flag.load(Ordering::SeqCst) {
            return Err(PipelineError::Cancelled("识别前取消".to_string()).into());
        }

        let recognizer = Arc::clone(&self.recognizer);
        let image = processed.image;
        let recognized = tokio::task::spawn_blocking(move || recognizer.recognize(&image)).await?;

        let blocks: Vec<TextBlock> = match recognized {
            Ok(blocks) => blocks.collect(),
            Err(err) => {
                log::error!("文字识别失败 - 请求 {}：{}", request_id, err);
                return Err(err.into());
            }
        };

        let text = crate::ocr::join_text(&blocks);
        log::info!(
            "✅ 扫描完成 - 请求 {} 文本块 {} 个 total={}ms",
            request_id,
            blocks.len(),
            total_start.elapsed().as_millis()
        );

        Ok(ScanOutcome {
            request_id,
            text,
            blocks,
            stages: processed
                .stages
                .iter()
                .map(|stage| stage.diagnostic_name())
                .collect(),
            crop_width: processed.crop_bounds.width() as u32,
            crop_height: processed.crop_bounds.height() as u32,
            diagnostics: processed.diagnostics,
        })
    }

    /// 请求取消；返回 `false` 表示该请求不存在或已结束。
    pub fn cancel(&self, request_id: &str) -> Result<bool, AppError> {
        let guard = self
            .cancel_flags
            .lock()
            .map_err(|_| PipelineError::ResourceLimit("扫描取消标志锁已中毒".to_string()))?;

        if let Some(flag) = guard.get(request_id) {
            flag.store(true, Ordering::SeqCst);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 设置流水线最终阶段。
    pub fn set_final_stage(&self, stage: &str) -> Result<(), AppError> {
        let stage = FinalStage::from_str(stage)?;
        Ok(self.handler.set_final_stage(stage)?)
    }

    /// 获取当前最终阶段（字符串）。
    pub fn final_stage(&self) -> Result<String, AppError> {
        Ok(self.handler.final_stage()?.as_str().to_string())
    }
}
