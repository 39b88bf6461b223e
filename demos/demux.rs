//! Split a motion photo into its still image and video
//!
//! Usage: `cargo run --example demux -- <motion_photo>`
//!
//! Prints the motion photo metadata and writes `still.<ext>` and
//! `video.mp4` into the current directory. Set `RUST_LOG=mphotokit=debug`
//! to see what the demuxer detects.

use std::env;

use mphotokit::Demuxer;
use tracing_subscriber::EnvFilter;

fn demux_file() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let path = match args.len() {
        // args[0] = path to executable
        2 => Ok(&args[1]),
        n => Err(format!(
            "expected 1 argument (motion photo), got {} arguments",
            n - 1
        )),
    }?;

    let demuxer = Demuxer::open(path)?;
    let info = demuxer.info()?;
    println!("{}", info);

    let still_path = format!("still.{}", info.still_mime_type.extension());
    std::fs::write(&still_path, demuxer.still()?)?;
    std::fs::write("video.mp4", demuxer.video()?)?;
    println!("Wrote {} and video.mp4", still_path);

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = demux_file() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
