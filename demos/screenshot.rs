// Screenshot example
//
// Saves the oscilloscope display in the chosen image format.

use clap::{Parser, ValueEnum};
use rigol1000z::{ImageFormat, Rigol1000z, DEFAULT_PORT};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Jpeg,
    Bmp8,
    Bmp24,
    Tiff,
}

impl From<Format> for ImageFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Png => Self::Png,
            Format::Jpeg => Self::Jpeg,
            Format::Bmp8 => Self::Bmp8,
            Format::Bmp24 => Self::Bmp24,
            Format::Tiff => Self::Tiff,
        }
    }
}

#[derive(Parser)]
#[command(name = "screenshot")]
#[command(version = "1.0")]
#[command(about = "Save the DS1000Z display as an image")]
struct Args {
    /// Oscilloscope IP address or hostname
    host: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT, help = "SCPI socket port")]
    port: u16,

    #[arg(short, long, value_enum, default_value_t = Format::Png, help = "Image format")]
    format: Format,

    #[arg(short, long, help = "Output file, defaults to screenshot.<ext>")]
    output: Option<PathBuf>,

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

    let format = ImageFormat::from(args.format);
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("screenshot.{}", format.extension())));

    let mut osc = Rigol1000z::connect((args.host.as_str(), args.port), Some(Duration::from_secs(5)))?;
    let image = osc.get_screenshot(format, Some(&output))?;
    println!("✓ {} bytes saved to {}", image.len(), output.display());

    osc.close()?;
    Ok(())
}
