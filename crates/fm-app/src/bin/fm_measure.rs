use std::path::PathBuf;
use std::time::Duration;
use anyhow::Context;
use clap::Parser;
use log::info;
use fm_pose::{HttpPoseDetector, MeasurementExtractor};

#[derive(Parser, Debug)]
#[command(name = "fm-measure", version, about = "Estimate body measurements from a front and a side photo")]
struct Cli {
    front: PathBuf,
    side: PathBuf,
    /// Subject's real height, written to `height_cm`; the other distances stay in normalised detector units
    #[arg(long)]
    height_cm: f64,
    /// Pose landmark service endpoint
    #[arg(long, env = "POSE_DETECTOR_URL")]
    detector_url: String,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Write the measurements here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let detector = HttpPoseDetector::new(cli.detector_url, Duration::from_secs(cli.timeout_secs))?;
    let measurement = MeasurementExtractor::new(detector, cli.height_cm).extract(&cli.front, &cli.side)?;
    let json = serde_json::to_string_pretty(&measurement)?;

    match cli.out {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Measurements written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_is_required() {
        let err = Cli::try_parse_from(["fm-measure", "f.png", "s.png", "--detector-url", "http://pose"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "fm-measure", "f.png", "s.png", "--height-cm", "172.5", "--detector-url", "http://pose",
        ])
        .unwrap();
        assert_eq!(cli.height_cm, 172.5);
        assert_eq!(cli.timeout_secs, 30);
        assert!(cli.out.is_none());
    }
}
