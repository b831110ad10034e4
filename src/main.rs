//! # 拍照取字工具 — 命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与服务组装。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::sync::Arc;

use camera_ocr::error::AppError;
use camera_ocr::geometry::{ViewRect, ViewSize};
use camera_ocr::image_pipeline::{
    CaptureSource, DiagnosticSink, FileDiagnosticSink, FinalStage, NoopSink, PipelineConfig,
    PipelineHandler,
};
use camera_ocr::ocr::TesseractRecognizer;
use camera_ocr::scan::{ScanRequest, ScanService};
use camera_ocr::{settings, storage};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "camera-ocr")]
#[command(about = "Crop a region of a photo, enhance it and recognize its text")]
struct Cli {
    /// Settings file (default: <config_dir>/camera-ocr/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scan on a captured photo
    Scan {
        /// Captured photo
        image: PathBuf,

        /// Selection in preview coordinates: left,top,right,bottom
        #[arg(short, long)]
        selection: ViewRect,

        /// Preview size the selection was drawn on: WIDTHxHEIGHT
        #[arg(short, long)]
        view: ViewSize,

        /// Last pipeline stage: grayscale, contrast or binarize
        #[arg(long)]
        stage: Option<String>,

        /// Contrast factor (1.0 keeps the image unchanged)
        #[arg(long)]
        contrast: Option<f32>,

        /// Skip writing diagnostic images
        #[arg(long)]
        no_diagnostics: bool,

        /// Directory for diagnostic images
        #[arg(long)]
        diagnostics_dir: Option<PathBuf>,

        /// Tesseract language
        #[arg(long)]
        lang: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the diagnostics directory and its usage
    StorageInfo {
        /// Directory to inspect instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("camera-ocr failed [{}]: {}", err.code(), err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let settings_path = match cli.settings {
        Some(path) => path,
        None => settings::default_settings_path()?,
    };
    let mut app_settings = settings::load_settings(&settings_path)?;

    match cli.command {
        Command::Scan {
            image,
            selection,
            view,
            stage,
            contrast,
            no_diagnostics,
            diagnostics_dir,
            lang,
            json,
        } => {
            if let Some(stage) = stage {
                app_settings.final_stage = FinalStage::from_str(&stage)?.as_str().to_string();
            }
            if let Some(factor) = contrast {
                app_settings.contrast_factor = factor;
            }
            if no_diagnostics {
                app_settings.diagnostics_enabled = false;
            }
            if diagnostics_dir.is_some() {
                app_settings.diagnostics_dir = diagnostics_dir;
            }
            if let Some(lang) = lang {
                app_settings.ocr_lang = lang;
            }

            let mut config = PipelineConfig::default();
            app_settings.apply_to(&mut config)?;

            let sink: Arc<dyn DiagnosticSink> = if app_settings.diagnostics_enabled {
                let dir = storage::get_diagnostics_dir(app_settings.diagnostics_dir.as_deref())?;
                log::info!("💾 诊断图片目录：{}", dir.display());
                Arc::new(FileDiagnosticSink::new(dir, app_settings.diagnostic_format()?))
            } else {
                Arc::new(NoopSink)
            };

            let handler = PipelineHandler::new(config, sink)?;
            let recognizer =
                TesseractRecognizer::new(app_settings.ocr_lang.clone()).with_psm(app_settings.ocr_psm);
            let service = ScanService::new(handler, recognizer);

            let outcome = service
                .scan(ScanRequest {
                    request_id: chrono::Local::now().format("%Y%m%d%H%M%S%3f").to_string(),
                    source: CaptureSource::FilePath(image),
                    selection,
                    view,
                })
                .await?;

            if json {
                let rendered =
                    serde_json::to_string_pretty(&outcome).map_err(std::io::Error::from)?;
                println!("{}", rendered);
            } else if outcome.text.is_empty() {
                println!("(no text recognized)");
            } else {
                println!("{}", outcome.text);
            }
        }
        Command::StorageInfo { dir } => {
            let dir = dir.or(app_settings.diagnostics_dir);
            let info = storage::get_diagnostics_dir_info(dir.as_deref())?;
            println!(
                "{}\n{} files, {:.2} MB",
                info.path,
                info.file_count,
                info.total_size as f64 / 1024.0 / 1024.0
            );
        }
    }

    Ok(())
}
