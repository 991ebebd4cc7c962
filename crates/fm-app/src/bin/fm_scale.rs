use std::path::PathBuf;
use clap::Parser;
use log::info;
use fm_mesh::ScalingJob;

#[derive(Parser, Debug)]
#[command(name = "fm-scale", version, about = "Scale a reconstructed OBJ to body measurements and export GLB")]
struct Cli {
    /// Reconstructed mesh (.obj)
    input: PathBuf,
    /// Destination (.glb)
    output: PathBuf,
    /// JSON file with `height_cm` and `shoulder_cm`
    measurements: PathBuf,
    /// Overrides `height_cm` from the measurements file
    target_height_cm: Option<f64>,
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"], help = "Replace all materials with one flat colour (0..1 per channel)")]
    monochrome: Option<Vec<f64>>,
}

impl Cli {
    fn into_job(self) -> ScalingJob {
        ScalingJob {
            input: self.input,
            output: self.output,
            measurements: self.measurements,
            height_override: self.target_height_cm,
            monochrome: self.monochrome.and_then(|c| <[f64; 3]>::try_from(c).ok()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let report = cli.into_job().run()?;

    info!(
        "Height {:.1} cm -> {:.1} cm, shoulders {:.1} cm -> {:.1} cm",
        report.before.height_cm(),
        report.after.height_cm(),
        report.before.shoulder_cm(),
        report.after.shoulder_cm()
    );
    if let Some(material) = &report.material {
        info!("Applied material {material}");
    }
    println!(
        "Scaled by {:.4} (height {:.4}, shoulder {:.4}) -> {}",
        report.factor.uniform,
        report.factor.by_height,
        report.factor.by_shoulder,
        report.output.display()
    );
    Ok(())
}
