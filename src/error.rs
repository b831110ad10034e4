//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，服务层与命令行入口统一返回
//! `Result<T, AppError>`，各层错误通过 `#[from]` 自动转换。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `PipelineError` / `RecognitionError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于写入 JSON 输出。

use serde::Serialize;

use crate::image_pipeline::PipelineError;
use crate::ocr::RecognitionError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片预处理流水线错误（加载 / 解码 / 裁剪 / 滤镜）
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// 文字识别失败
    #[error("{0}")]
    Recognition(#[from] RecognitionError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 存储目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 设置文件读写或取值失败
    #[error("设置错误: {0}")]
    Settings(String),

    /// 后台任务异常退出
    #[error("后台任务失败: {0}")]
    Task(String),

    /// 同一请求编号仍在处理中
    #[error("请求 {0} 正在处理中")]
    DuplicateRequest(String),
}

impl AppError {
    /// 稳定错误码，流水线错误沿用其自身错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pipeline(err) => err.code(),
            Self::Recognition(_) => "E_RECOGNITION",
            Self::Io(_) => "E_IO",
            Self::Storage(_) => "E_STORAGE",
            Self::Settings(_) => "E_SETTINGS",
            Self::Task(_) => "E_TASK",
            Self::DuplicateRequest(_) => "E_DUPLICATE_REQUEST",
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::Task("任务已中止".to_string())
        } else {
            Self::Task(format!("任务异常退出: {}", err))
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
