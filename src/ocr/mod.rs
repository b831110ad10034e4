//! # 文字识别模块（ocr）
//!
//! ## 设计思路
//!
//! 预处理流水线只产出图片，识别交给 `TextRecognizer` 实现。
//! 识别结果 `TextBlocks` 是一次性迭代器：按块顺序产出，耗尽后不可重放。
//!
//! - `tesseract`：基于系统 tesseract 的默认实现

mod tesseract;

use image::RgbaImage;

use crate::geometry::ImageRect;

pub use tesseract::TesseractRecognizer;

/// 识别阶段错误。
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// 识别引擎调用失败（未安装、语言包缺失、进程异常等）
    #[error("识别引擎错误: {0}")]
    Engine(String),

    /// 输入图片无法交给识别引擎
    #[error("识别输入无效: {0}")]
    InvalidImage(String),
}

/// 一个识别出的文本块。
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TextBlock {
    pub text: String,
    /// 处理后图片坐标系下的外接矩形。
    #[serde(skip)]
    pub bounds: Option<ImageRect>,
    /// 块内单词的平均置信度（0~100）。
    pub confidence: f32,
}

/// 按顺序产出的识别结果，只能遍历一次。
#[derive(Debug)]
pub struct TextBlocks {
    inner: std::vec::IntoIter<TextBlock>,
}

impl TextBlocks {
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        Self {
            inner: blocks.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// 消费所有文本块，按换行拼接为整段文本。
    pub fn into_text(self) -> String {
        join_text(self)
    }
}

impl Iterator for TextBlocks {
    type Item = TextBlock;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for TextBlocks {}

/// 文字识别协作方。
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &RgbaImage) -> Result<TextBlocks, RecognitionError>;
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for std::sync::Arc<R> {
    fn recognize(&self, image: &RgbaImage) -> Result<TextBlocks, RecognitionError> {
        (**self).recognize(image)
    }
}

/// 拼接块文本，跳过空块。
pub fn join_text<I>(blocks: I) -> String
where
    I: IntoIterator,
    I::Item: std::borrow::Borrow<TextBlock>,
{
    use std::borrow::Borrow;

    blocks
        .into_iter()
        .filter_map(|block| {
            let text = block.borrow().text.trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            bounds: None,
            confidence: 90.0,
        }
    }

    #[test]
    fn text_blocks_yield_in_order_once() {
        let mut blocks = TextBlocks::new(vec![block("first"), block("second")]);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks.next().map(|b| b.text), Some("first".to_string()));
        assert_eq!(blocks.next().map(|b| b.text), Some("second".to_string()));
        assert!(blocks.next().is_none());
        assert!(blocks.next().is_none());
    }

    #[test]
    fn into_text_joins_non_empty_blocks() {
        let blocks = TextBlocks::new(vec![block("Hello world"), block("  "), block("42 ")]);
        assert_eq!(blocks.into_text(), "Hello world\n42");
    }

    #[test]
    fn empty_blocks_produce_empty_text() {
        assert_eq!(TextBlocks::empty().into_text(), "");
    }
}
