//! Build a motion photo from a still image and an MP4 video
//!
//! Usage: `cargo run --example remux -- <still> <video> <timestamp_us> [output]`
//!
//! The output defaults to `motion_photo.<ext>`, with the extension of the
//! still.

use std::env;

use mphotokit::{classify, Remuxer};
use tracing_subscriber::EnvFilter;

fn remux_files() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let (still_path, video_path, timestamp, output) = match args.len() {
        4 | 5 => (&args[1], &args[2], &args[3], args.get(4)),
        n => {
            return Err(format!(
                "expected 3 or 4 arguments (still, video, timestamp_us, [output]), got {} arguments",
                n - 1
            )
            .into())
        }
    };
    let timestamp: i64 = timestamp
        .parse()
        .map_err(|e| format!("invalid timestamp {:?}: {}", timestamp, e))?;

    let still = std::fs::read(still_path)?;
    let output = match output {
        Some(output) => output.clone(),
        None => format!("motion_photo.{}", classify(&still).extension()),
    };

    let mut remuxer = Remuxer::new();
    remuxer.set_still(still, timestamp)?;
    remuxer.set_video(std::fs::read(video_path)?)?;
    let motion_photo = remuxer.finalize()?;

    std::fs::write(&output, &motion_photo)?;
    println!("Wrote {} ({} bytes)", output, motion_photo.len());

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = remux_files() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
