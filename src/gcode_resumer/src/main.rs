use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gcode_resumer_lib as gr;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gcode_resumer")]
#[command(about = "Rebuild a G-code file so an interrupted print can restart at a given layer", long_about = None)]
struct Cli {
    /// Original G-code file
    source: PathBuf,

    /// Layer to resume at, exactly as written after ;LAYER:
    layer: u32,

    /// Output file (default: source name with _start<LAYER> before the extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Lift after zeroing Z, in mm
    #[arg(long, default_value_t = gr::config::LIFT_HEIGHT_DEFAULT)]
    lift_height: gr::Mm,

    /// Feed rate for the lift, in mm/min
    #[arg(long, default_value_t = gr::config::LIFT_FEED_RATE_DEFAULT)]
    lift_feed_rate: gr::FeedRate,

    /// Clearance above the recovered Z for the move back over the part, in mm
    #[arg(long, default_value_t = gr::config::RESUME_Z_OFFSET_DEFAULT)]
    resume_z_offset: gr::Mm,

    /// Feed rate for the move back to Z, in mm/min
    #[arg(long, default_value_t = gr::config::RESUME_Z_FEED_RATE_DEFAULT)]
    resume_z_feed_rate: gr::FeedRate,

    /// Recover negative coordinates such as X-5.2
    #[arg(long)]
    signed_coordinates: bool,

    /// Only recover values written with a decimal point (X10.0, not X10)
    #[arg(long)]
    decimal_only: bool,

    /// Heat the bed to the header's M190 temperature before the nozzle
    #[arg(long)]
    heat_bed: bool,
}

impl Cli {
    fn config(&self) -> gr::ResumeConfig {
        gr::ResumeConfig {
            lift_height: self.lift_height,
            lift_feed_rate: self.lift_feed_rate,
            resume_z_offset: self.resume_z_offset,
            resume_z_feed_rate: self.resume_z_feed_rate,
            numeric_policy: gr::NumericPolicy {
                allow_sign: self.signed_coordinates,
                allow_integer: !self.decimal_only,
            },
            heat_bed: self.heat_bed,
            ..gr::ResumeConfig::default()
        }
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| gr::output_path_for(&cli.source, cli.layer));
    info!(output = %output.display(), "gcode_resumer starting");

    gr::resume_file(&cli.source, cli.layer, &output, &cli.config()).with_context(|| {
        format!(
            "resuming {} at layer {} failed",
            cli.source.display(),
            cli.layer
        )
    })?;

    println!("{}", output.display());
    Ok(())
}
