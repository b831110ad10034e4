// Property tests for the pure pipeline stages and the orchestrator
use std::path::PathBuf;
use std::sync::Arc;

use camera_ocr::geometry::{ImageRect, ImageSize, ViewRect, ViewSize};
use camera_ocr::image_pipeline::{
    adjust_contrast, crop, grayscale, map_selection, DiagnosticSink, FinalStage, NoopSink,
    PipelineConfig, PipelineError, PipelineHandler, PipelineStage,
};
use image::{Rgba, RgbaImage};
use proptest::prelude::*;

fn seeded_image(width: u32, height: u32, seed: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let v = x
            .wrapping_mul(2_654_435_761)
            .wrapping_add(y.wrapping_mul(40_503))
            .wrapping_add(seed.wrapping_mul(97));
        Rgba([v as u8, (v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8])
    })
}

struct FailingSink;

impl DiagnosticSink for FailingSink {
    fn persist(&self, _image: &RgbaImage, name: &str) -> Result<Option<PathBuf>, PipelineError> {
        Err(PipelineError::Persistence(format!("disk full while writing {}", name)))
    }
}

fn handler_with(config: PipelineConfig) -> PipelineHandler {
    PipelineHandler::new(config, Arc::new(NoopSink)).expect("handler init failed")
}

proptest! {
    #[test]
    fn grayscale_is_idempotent(w in 1u32..32, h in 1u32..32, seed in any::<u32>()) {
        let once = grayscale(&seeded_image(w, h, seed));
        let twice = grayscale(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn contrast_one_is_identity(w in 1u32..32, h in 1u32..32, seed in any::<u32>()) {
        let img = seeded_image(w, h, seed);
        let out = adjust_contrast(&img, 1.0).expect("finite factor");
        prop_assert_eq!(out, img);
    }

    #[test]
    fn contrast_keeps_mid_gray_and_alpha(factor in -5.0f32..10.0, alpha in any::<u8>()) {
        let img = RgbaImage::from_pixel(2, 2, Rgba([128, 128, 128, alpha]));
        let out = adjust_contrast(&img, factor).expect("finite factor");
        for px in out.pixels() {
            prop_assert_eq!(*px, Rgba([128, 128, 128, alpha]));
        }
    }

    #[test]
    fn contrast_matches_clamped_reference(factor in -5.0f32..10.0, c in any::<u8>(), alpha in any::<u8>()) {
        let img = RgbaImage::from_pixel(1, 1, Rgba([c, c, c, alpha]));
        let out = adjust_contrast(&img, factor).expect("finite factor");

        let offset = 128.0 * (1.0 - factor);
        let expected = (factor * c as f32 + offset).round().clamp(0.0, 255.0) as u8;
        prop_assert_eq!(*out.get_pixel(0, 0), Rgba([expected, expected, expected, alpha]));
    }

    #[test]
    fn contrast_is_monotonic_for_positive_factors(factor in 0.0f32..10.0, a in any::<u8>(), b in any::<u8>()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([lo, lo, lo, 255]));
        img.put_pixel(1, 0, Rgba([hi, hi, hi, 255]));

        let out = adjust_contrast(&img, factor).expect("finite factor");
        prop_assert!(out.get_pixel(0, 0)[0] <= out.get_pixel(1, 0)[0]);
    }

    #[test]
    fn mapping_with_equal_sizes_is_identity(
        w in 1u32..2000, h in 1u32..2000,
        l in -500i32..2500, t in -500i32..2500, r in -500i32..2500, b in -500i32..2500,
    ) {
        let mapped = map_selection(ViewRect::new(l, t, r, b), ViewSize::new(w, h), ImageSize::new(w, h))
            .expect("non-zero view");
        prop_assert_eq!(mapped, ImageRect::new(l, t, r, b));
    }

    #[test]
    fn crop_never_exceeds_image_bounds(
        w in 1u32..64, h in 1u32..64,
        l in -100i32..100, t in -100i32..100, r in -100i32..100, b in -100i32..100,
    ) {
        let img = seeded_image(w, h, 7);
        match crop(&img, ImageRect::new(l, t, r, b)) {
            Ok(region) => {
                prop_assert!(region.bounds.left >= 0 && region.bounds.top >= 0);
                prop_assert!(region.bounds.right <= w as i32 && region.bounds.bottom <= h as i32);
                prop_assert_eq!(region.image.width() as i64, region.bounds.width());
                prop_assert_eq!(region.image.height() as i64, region.bounds.height());
            }
            Err(err) => prop_assert!(matches!(err, PipelineError::EmptyCrop(_))),
        }
    }

    #[test]
    fn end_to_end_output_matches_mapped_crop_and_is_gray(
        img_w in 100u32..300, img_h in 100u32..300,
        l in 0i32..90, t in 0i32..90, dw in 1i32..60, dh in 1i32..60,
        seed in any::<u32>(),
    ) {
        let mut config = PipelineConfig::default();
        config.final_stage = FinalStage::Grayscale;
        let handler = handler_with(config);

        let view = ViewSize::new(100, 100);
        let selection = ViewRect::new(l, t, l + dw, t + dh);
        let image_size = ImageSize::new(img_w, img_h);
        let expected = map_selection(selection, view, image_size)
            .expect("non-zero view")
            .clip_to(image_size);

        let result = handler
            .process(seeded_image(img_w, img_h, seed), selection, view)
            .expect("selection inside view maps to a non-empty crop");

        prop_assert_eq!(result.crop_bounds, expected);
        prop_assert_eq!(result.image.width() as i64, expected.width());
        prop_assert_eq!(result.image.height() as i64, expected.height());
        for px in result.image.pixels() {
            prop_assert!(px[0] == px[1] && px[1] == px[2]);
        }
    }
}

#[test]
fn literal_selection_maps_to_expected_image_rect() {
    let mapped = map_selection(
        ViewRect::new(10, 10, 50, 50),
        ViewSize::new(100, 100),
        ImageSize::new(1024, 768),
    )
    .expect("non-zero view");

    assert_eq!(mapped, ImageRect::new(102, 76, 512, 384));
}

#[test]
fn contrast_saturates_for_negative_factors() {
    let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 77]));
    let out = adjust_contrast(&img, -5.0).expect("finite factor");
    assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 77]));
}

#[test]
fn full_view_selection_on_a_default_capture() {
    let handler = handler_with(PipelineConfig::default());
    let view = ViewSize::new(100, 100);
    let selection = ViewRect::new(0, 0, 100, 100);
    let image_size = ImageSize::new(1024, 768);
    let expected = map_selection(selection, view, image_size)
        .expect("non-zero view")
        .clip_to(image_size);

    let result = handler
        .process(seeded_image(1024, 768, 13), selection, view)
        .expect("pipeline should succeed");

    assert_eq!(expected, ImageRect::new(0, 0, 1024, 768));
    assert_eq!(result.crop_bounds, expected);
    assert_eq!(result.image.dimensions(), (1024, 768));
    assert_eq!(
        result.stages,
        vec![PipelineStage::Crop, PipelineStage::Grayscale, PipelineStage::Contrast]
    );
    for px in result.image.pixels() {
        assert!(px[0] == px[1] && px[1] == px[2]);
    }
}

#[test]
fn selection_outside_the_image_is_an_empty_crop() {
    let handler = handler_with(PipelineConfig::default());
    let result = handler.process(
        seeded_image(200, 100, 1),
        ViewRect::new(120, 0, 180, 50),
        ViewSize::new(100, 100),
    );

    assert!(matches!(result, Err(PipelineError::EmptyCrop(_))));
}

#[test]
fn failing_sink_never_fails_the_pipeline() {
    let handler = PipelineHandler::new(PipelineConfig::default(), Arc::new(FailingSink))
        .expect("handler init failed");

    let result = handler
        .process(
            seeded_image(400, 300, 3),
            ViewRect::new(0, 0, 50, 50),
            ViewSize::new(100, 100),
        )
        .expect("sink failures are swallowed");

    assert_eq!(result.image.dimensions(), (200, 150));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn final_stage_controls_provenance() {
    let cases = [
        (FinalStage::Grayscale, vec![PipelineStage::Crop, PipelineStage::Grayscale]),
        (
            FinalStage::Contrast,
            vec![PipelineStage::Crop, PipelineStage::Grayscale, PipelineStage::Contrast],
        ),
        (
            FinalStage::Binarize,
            vec![
                PipelineStage::Crop,
                PipelineStage::Grayscale,
                PipelineStage::Contrast,
                PipelineStage::Binarize,
            ],
        ),
    ];

    for (stage, expected) in cases {
        let mut config = PipelineConfig::default();
        config.final_stage = stage;
        let result = handler_with(config)
            .process(
                seeded_image(64, 64, 5),
                ViewRect::new(0, 0, 64, 64),
                ViewSize::new(64, 64),
            )
            .expect("pipeline should succeed");

        assert_eq!(result.stages, expected, "final stage {}", stage.as_str());
    }
}

#[test]
fn binarized_output_is_pure_black_and_white() {
    let mut config = PipelineConfig::default();
    config.final_stage = FinalStage::Binarize;

    let result = handler_with(config)
        .process(
            seeded_image(80, 60, 11),
            ViewRect::new(0, 0, 80, 60),
            ViewSize::new(80, 60),
        )
        .expect("pipeline should succeed");

    for px in result.image.pixels() {
        assert!(px[0] == 0 || px[0] == 255);
        assert!(px[0] == px[1] && px[1] == px[2]);
    }
}
