//! 基于 rusty-tesseract 的识别实现。
//!
//! tesseract 以单词为粒度返回结果（层级为 block → par → line → word），
//! 这里按 `block_num` 聚合成文本块：块按编号升序，块内单词按
//! `(par_num, line_num, word_num)` 排序，行与行之间以换行拼接。
//! 空文本与置信度 ≤ 0 的单词直接丢弃。

use std::collections::{BTreeMap, HashMap};

use image::{DynamicImage, RgbaImage};
use rusty_tesseract::{Args, Image};

use super::{RecognitionError, TextBlock, TextBlocks, TextRecognizer};
use crate::geometry::ImageRect;

/// 调用系统 tesseract 的识别器。
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    lang: String,
    psm: i32,
    oem: i32,
    dpi: i32,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            lang: "eng".to_string(),
            psm: 3,
            oem: 3,
            dpi: 300,
        }
    }
}

impl TesseractRecognizer {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            ..Self::default()
        }
    }

    /// 页面分割模式（tesseract `--psm`）。
    pub fn with_psm(mut self, psm: i32) -> Self {
        self.psm = psm;
        self
    }

    fn args(&self) -> Args {
        Args {
            lang: self.lang.clone(),
            config_variables: HashMap::new(),
            dpi: Some(self.dpi),
            psm: Some(self.psm),
            oem: Some(self.oem),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &RgbaImage) -> Result<TextBlocks, RecognitionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RecognitionError::InvalidImage(format!(
                "图片尺寸为空：{}x{}",
                image.width(),
                image.height()
            )));
        }

        log::info!(
            "🔍 开始文字识别 - {}x{} lang={} psm={}",
            image.width(),
            image.height(),
            self.lang,
            self.psm
        );

        let dynamic = DynamicImage::ImageRgba8(image.clone());
        let tess_image = Image::from_dynamic_image(&dynamic)
            .map_err(|e| RecognitionError::InvalidImage(format!("无法构建识别输入：{}", e)))?;

        let output = rusty_tesseract::image_to_data(&tess_image, &self.args())
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;

        log::debug!("tesseract 返回 {} 条数据", output.data.len());

        let words = output.data.into_iter().map(|d| RecognizedWord {
            block_num: d.block_num,
            par_num: d.par_num,
            line_num: d.line_num,
            word_num: d.word_num,
            left: d.left,
            top: d.top,
            width: d.width,
            height: d.height,
            conf: d.conf,
            text: d.text,
        });

        let blocks = group_words_into_blocks(words);
        log::info!("✅ 文字识别完成 - {} 个文本块", blocks.len());

        Ok(TextBlocks::new(blocks))
    }
}

/// tesseract 单词级结果中与聚合相关的字段。
#[derive(Debug, Clone)]
struct RecognizedWord {
    block_num: i32,
    /// `line_num` / `word_num` 在每个段落内重新计数。
    par_num: i32,
    line_num: i32,
    word_num: i32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    conf: f32,
    text: String,
}

fn group_words_into_blocks<I>(words: I) -> Vec<TextBlock>
where
    I: IntoIterator<Item = RecognizedWord>,
{
    let mut grouped: BTreeMap<i32, Vec<RecognizedWord>> = BTreeMap::new();
    for word in words
        .into_iter()
        .filter(|w| !w.text.trim().is_empty() && w.conf > 0.0)
    {
        grouped.entry(word.block_num).or_default().push(word);
    }

    grouped
        .into_values()
        .filter_map(|mut words| {
            words.sort_by_key(|w| (w.par_num, w.line_num, w.word_num));

            let mut lines: Vec<Vec<&str>> = Vec::new();
            let mut current_line = None;
            let (mut left, mut top) = (i32::MAX, i32::MAX);
            let (mut right, mut bottom) = (i32::MIN, i32::MIN);
            let mut conf_sum = 0.0f32;

            for word in &words {
                left = left.min(word.left);
                top = top.min(word.top);
                right = right.max(word.left.saturating_add(word.width));
                bottom = bottom.max(word.top.saturating_add(word.height));
                conf_sum += word.conf;

                let key = (word.par_num, word.line_num);
                if current_line != Some(key) {
                    lines.push(Vec::new());
                    current_line = Some(key);
                }
                if let Some(line) = lines.last_mut() {
                    line.push(word.text.trim());
                }
            }

            let text = lines
                .iter()
                .map(|line| line.join(" "))
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                return None;
            }

            Some(TextBlock {
                text,
                bounds: Some(ImageRect::new(left, top, right, bottom)),
                confidence: conf_sum / words.len() as f32,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(block: i32, line: i32, idx: i32, text: &str, conf: f32) -> RecognizedWord {
        word_in_par(block, 1, line, idx, text, conf)
    }

    fn word_in_par(
        block: i32,
        par: i32,
        line: i32,
        idx: i32,
        text: &str,
        conf: f32,
    ) -> RecognizedWord {
        RecognizedWord {
            block_num: block,
            par_num: par,
            line_num: line,
            word_num: idx,
            left: idx * 10,
            top: line * 20,
            width: 8,
            height: 12,
            conf,
            text: text.to_string(),
        }
    }

    #[test]
    fn groups_by_block_and_orders_words() {
        let words = vec![
            word(2, 1, 1, "second", 80.0),
            word(1, 2, 1, "line", 90.0),
            word(1, 1, 2, "world", 90.0),
            word(1, 1, 1, "hello", 90.0),
        ];

        let blocks = group_words_into_blocks(words);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "hello world\nline");
        assert_eq!(blocks[1].text, "second");
        assert_eq!(blocks[0].bounds, Some(ImageRect::new(10, 20, 28, 52)));
    }

    #[test]
    fn paragraphs_in_one_block_keep_reading_order() {
        // line_num / word_num restart in the second paragraph
        let words = vec![
            word_in_par(1, 2, 1, 2, "delta", 88.0),
            word_in_par(1, 1, 1, 1, "alpha", 91.0),
            word_in_par(1, 2, 1, 1, "gamma", 87.0),
            word_in_par(1, 1, 1, 2, "beta", 90.0),
        ];

        let blocks = group_words_into_blocks(words);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "alpha beta\ngamma delta");
    }

    #[test]
    fn drops_empty_and_low_confidence_words() {
        let words = vec![
            word(1, 1, 1, "  ", 95.0),
            word(1, 1, 2, "noise", -1.0),
            word(1, 1, 3, "kept", 60.0),
            word(3, 1, 1, "zero", 0.0),
        ];

        let blocks = group_words_into_blocks(words);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "kept");
        assert_eq!(blocks[0].confidence, 60.0);
    }

    #[test]
    fn recognize_rejects_empty_image() {
        let result = TesseractRecognizer::default().recognize(&RgbaImage::new(0, 0));
        assert!(matches!(result, Err(RecognitionError::InvalidImage(_))));
    }
}
