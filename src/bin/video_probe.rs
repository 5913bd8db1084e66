use anyhow::{Context, Result};
use clap::Parser;
use opencv::core::Vector;
use opencv::imgcodecs;
use opencv::prelude::*;
use std::path::PathBuf;

use abduction_rom::config::Config;
use abduction_rom::video::{
    correct, get_rotation, FfprobeReader, FrameSource, Rotation, RotationReader, VideoFileSource,
};

const PROBE_FRAME_FILE: &str = "probe_frame.png";

#[derive(Parser, Debug)]
#[command(author, version = env!("GIT_VERSION"), about = "Print rotation metadata and decoder properties of a video", long_about = None)]
struct Args {
    /// 調べる動画
    input: PathBuf,

    /// 設定ファイル（ffprobe のパス）
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    abduction_rom::init_tracing();
    let args = Args::parse();
    let config = Config::load_or_default(&args.config);

    println!("=== ビデオプローブ ===");
    println!("file: {}", args.input.display());

    let reader = FfprobeReader::new(config.probe.ffprobe.clone());
    match reader.read_rotation_tag(&args.input) {
        Some(tag) => println!("ffprobe rotation tag: {}", tag),
        None => println!("ffprobe rotation tag: (none)"),
    }
    let rotation = get_rotation(&reader, &args.input);
    println!("rotation: {}°", rotation.degrees());

    let mut source = VideoFileSource::open(&args.input)?;
    let info = source.info();
    // デコーダが回転済みなら補正しない
    let applied = if info.decoder_oriented { Rotation::None } else { rotation };
    let (out_w, out_h) = applied.apply_to_size(info.width, info.height);
    println!(
        "prop: {}x{} fps={} frames={}",
        info.width,
        info.height,
        info.fps,
        info.frame_count.map_or("unknown".to_string(), |n| n.to_string())
    );
    println!("corrected: {}x{}", out_w, out_h);
    if info.decoder_oriented {
        println!("decoder auto-orientation: ON (frames arrive already rotated)");
    }

    // 先頭フレームを補正して保存
    match source.read()? {
        Some(frame) => {
            let frame = correct(frame, applied)?;
            println!(
                "frame: {}x{} ch={} type={}",
                frame.cols(),
                frame.rows(),
                frame.channels(),
                frame.typ()
            );
            imgcodecs::imwrite(PROBE_FRAME_FILE, &frame, &Vector::new())
                .with_context(|| format!("Failed to write {}", PROBE_FRAME_FILE))?;
            println!("saved: {}", PROBE_FRAME_FILE);
        }
        None => println!("frame: EMPTY"),
    }
    source.release();

    Ok(())
}
