//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载预处理链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 传播策略：
//! - 解码 / 裁剪错误：终止本次流水线，但不影响应用。
//! - 持久化错误：只记录日志，编排器不向上传播。

/// 预处理流水线统一错误类型。
///
/// 该类型会在服务层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("拍摄数据解码失败：{0}")]
    CaptureDecode(String),

    #[error("选区无效：裁剪后面积为空（{0}）")]
    EmptyCrop(String),

    #[error("视图尺寸无效：{0}")]
    InvalidViewSize(String),

    #[error("对比度系数无效：{0}")]
    InvalidContrastFactor(String),

    #[error("配置无效：{0}")]
    InvalidConfig(String),

    #[error("诊断图片写入失败：{0}")]
    Persistence(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("已取消：{0}")]
    Cancelled(String),
}

impl PipelineError {
    /// 稳定错误码，供调用方展示与统计。
    pub fn code(&self) -> &'static str {
        match self {
            Self::CaptureDecode(_) => "E_DECODE",
            Self::EmptyCrop(_) => "E_EMPTY_CROP",
            Self::InvalidViewSize(_) => "E_VIEW_SIZE",
            Self::InvalidContrastFactor(_) => "E_CONTRAST_FACTOR",
            Self::InvalidConfig(_) => "E_CONFIG",
            Self::Persistence(_) => "E_PERSIST",
            Self::FileSystem(_) => "E_FILE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::Cancelled(_) => "E_CANCELLED",
        }
    }

    /// 出错所在阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::CaptureDecode(_) | Self::ResourceLimit(_) => "decode",
            Self::FileSystem(_) => "load",
            Self::InvalidViewSize(_) => "map",
            Self::EmptyCrop(_) => "crop",
            Self::InvalidContrastFactor(_) => "filter",
            Self::Persistence(_) => "persist",
            Self::InvalidConfig(_) => "config",
            Self::Cancelled(_) => "cancel",
        }
    }
}
