use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use abduction_rom::config::Config;
use abduction_rom::pipeline::VideoPipeline;
use abduction_rom::pose::MoveNetDetector;
use abduction_rom::render::{save_angle_plot, OverlayRenderer};
use abduction_rom::report::{save_angle_csv, AnalysisSummary, ANGLE_CSV_FILE, ANGLE_PLOT_FILE, SUMMARY_FILE};
use abduction_rom::video::{FfprobeReader, OpenCvBackend};

/// 出力動画のファイル名
const OUTPUT_VIDEO_FILE: &str = "output.mp4";

/// グラフ画像のサイズ
const PLOT_WIDTH: i32 = 800;
const PLOT_HEIGHT: i32 = 480;

#[derive(Parser, Debug)]
#[command(author, version = env!("GIT_VERSION"), about = "Shoulder abduction range-of-motion analyzer", long_about = None)]
struct Args {
    /// 解析する動画
    input: PathBuf,

    /// 設定ファイル（無ければ既定値）
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// 出力先ディレクトリ（設定ファイルより優先）
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// ONNXモデル（設定ファイルより優先）
    #[arg(short, long)]
    model: Option<PathBuf>,
}

fn main() -> Result<()> {
    abduction_rom::init_tracing();
    let args = Args::parse();
    info!("abduction-rom {}", env!("GIT_VERSION"));

    let mut config = Config::load_or_default(&args.config);
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(model) = args.model {
        config.model.path = model;
    }

    let output_dir = &config.output.dir;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    info!("Loading model from {}", config.model.path.display());
    let mut detector = MoveNetDetector::new(&config.model.path, config.model.thresholds())?;

    let output_video = output_dir.join(OUTPUT_VIDEO_FILE);
    let mut pipeline = VideoPipeline::new(
        OpenCvBackend::new(&config.output.fourcc),
        FfprobeReader::new(config.probe.ffprobe.clone()),
        config.joint.clone(),
        OverlayRenderer::new(config.overlay.clone()),
    );
    info!("Analyzing {} ({})", args.input.display(), config.joint.name);
    let outcome = pipeline.run(&mut detector, &args.input, &output_video)?;

    save_angle_csv(output_dir.join(ANGLE_CSV_FILE), &outcome.series)?;
    save_angle_plot(output_dir.join(ANGLE_PLOT_FILE), &outcome.series, PLOT_WIDTH, PLOT_HEIGHT)?;
    AnalysisSummary::new(&args.input, &output_video, &config.joint.name, &outcome)
        .save(output_dir.join(SUMMARY_FILE))?;
    info!("Results saved to {}", output_dir.display());

    println!("ROM: {:.2}°", outcome.rom());
    Ok(())
}
