//! # 拍照取字工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           相机协作方（拍摄文件 / 字节 / Base64）          │
//! │           + 预览上的选区 ViewRect + 预览尺寸 ViewSize     │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ ScanRequest
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ scan ─────── ScanService（异步入口 + 取消）           │
//! │  │                                                       │
//! │  ├─ image_pipeline   加载·解码·映射·裁剪·滤镜·诊断落盘   │
//! │  ├─ ocr              TextRecognizer + tesseract 实现      │
//! │  ├─ geometry         带坐标空间标记的 Rect / Size         │
//! │  ├─ settings         JSON 设置文件                        │
//! │  └─ storage          诊断图片目录 (返回 Result)           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，服务层与命令行的返回类型 |
//! | [`geometry`] | 视图 / 图像坐标空间在类型层面区分 |
//! | [`image_pipeline`] | 从拍摄数据得到交给 OCR 的预处理图片 |
//! | [`ocr`] | 文字识别抽象与 tesseract 实现 |
//! | [`scan`] | 组合流水线与识别的异步服务 |
//! | [`settings`] | 设置文件读写与应用到流水线配置 |
//! | [`storage`] | 诊断图片目录的获取与自动创建 |

pub mod error;
pub mod geometry;
pub mod image_pipeline;
pub mod ocr;
pub mod scan;
pub mod settings;
pub mod storage;

/// 配置目录 / 数据目录下使用的应用子目录名。
pub const APP_DIR_NAME: &str = "camera-ocr";
