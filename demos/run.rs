// Basic session example
//
// Resets the oscilloscope, sets up the timebase and all four channels, lets
// it acquire for a moment, then saves a screenshot and the full memory of
// every enabled channel.

use clap::Parser;
use rigol1000z::{
    CaptureOptions, ImageFormat, Rigol1000z, TimebaseMode, WaveformMode, DEFAULT_PORT,
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "run")]
#[command(version = "1.0")]
#[command(about = "Configure a DS1000Z, then save a screenshot and its waveform memory")]
struct Args {
    /// Oscilloscope IP address or hostname
    host: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT, help = "SCPI socket port")]
    port: u16,

    #[arg(short, long, default_value = "screenshot.png", help = "Screenshot file")]
    screenshot: PathBuf,

    #[arg(short, long, default_value = "channel", help = "CSV file prefix, one file per channel")]
    output: String,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let mut osc = Rigol1000z::connect((args.host.as_str(), args.port), Some(Duration::from_secs(5)))?;
    let identity = osc.identity()?;
    println!("✓ Connected to {} ({})", identity.model, identity.serial_number);

    // Start with known state by restoring default settings
    osc.reset()?;

    osc.timebase().set_mode(TimebaseMode::Main)?;
    osc.timebase().set_scale_s_div(10e-6)?;

    for n in 1..=4 {
        let mut channel = osc.channel(n)?;
        channel.set_enabled(true)?;
        channel.set_scale_v(1.0)?;
    }

    osc.run()?;
    thread::sleep(Duration::from_millis(500));
    osc.stop()?;

    osc.get_screenshot(ImageFormat::Png, Some(&args.screenshot))?;
    println!("✓ Screenshot saved to {}", args.screenshot.display());

    let options = CaptureOptions::default().with_mode(WaveformMode::Raw);
    let enabled = osc.channels_enabled()?;
    for (source, _) in rigol1000z::Source::ANALOG
        .into_iter()
        .zip(enabled)
        .filter(|(_, on)| *on)
    {
        let path = PathBuf::from(format!("{}_{}.csv", args.output, source));
        let data = osc.get_data(source, &options, Some(&path), |p| {
            print!("\r{source}: {:5.1}%", p.fraction() * 100.0);
        })?;
        println!("\r✓ {source}: {} points saved to {}", data.len(), path.display());
    }

    // Move back to run mode when data collection is complete
    osc.run()?;
    osc.close()?;

    println!("done");
    Ok(())
}
