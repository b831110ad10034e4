//! # 图像预处理模块（image_pipeline）
//!
//! ## 设计思路
//!
//! 该模块将“拍摄加载 → 解码缩放 → 选区映射 → 裁剪 → 灰度 → 对比度 → 二值化 → 诊断落盘”
//! 按职责拆分为多个子模块，OCR 与相机协作方都不在本模块内。
//!
//! - `handler`：编排整条处理流水线
//! - `loader`：负责文件 / 字节 / Base64 加载与签名校验
//! - `decode`：负责解码、像素限制、等比缩放到拍摄位图尺寸
//! - `mapping`：视图坐标到图像坐标的映射与裁剪
//! - `filters`：纯像素滤镜
//! - `persist`：诊断图片落盘
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! ScanService::scan（crate::scan）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志 + 取消检查）
//!    ├─ loader.rs（来源加载 + 体积 / 签名校验）
//!    ├─ decode.rs（解码 + 像素限制 + 缩放）
//!    ├─ mapping.rs（map_selection + crop）
//!    ├─ filters.rs（grayscale → adjust_contrast → binarize）
//!    └─ persist.rs（每阶段诊断落盘，失败只告警）
//!    ↓
//! PipelineResult 交给 OCR
//! ```

mod config;
mod decode;
mod error;
pub mod filters;
mod handler;
mod loader;
mod mapping;
mod persist;
mod source;

pub use config::{FinalStage, PipelineConfig};
pub use error::PipelineError;
pub use filters::{adjust_contrast, binarize, grayscale, luminance};
pub use handler::PipelineHandler;
pub use mapping::{crop, map_selection};
pub use persist::{DiagnosticFormat, DiagnosticSink, FileDiagnosticSink, NoopSink};
pub use source::{CaptureSource, CroppedRegion, PipelineResult, PipelineStage};
