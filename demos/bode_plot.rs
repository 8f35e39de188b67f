// Bode plot example
//
// Channel 1 carries the input of a circuit and channel 2 its output. For each
// point the user has a setup window to change the generator frequency, then
// the statistics are reset and averaged over the measurement window.

use clap::Parser;
use rigol1000z::{MeasureItem, Rigol1000z, Source, StatisticKind, StatisticMode, DEFAULT_PORT};
use std::f64::consts::PI;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "bode_plot")]
#[command(version = "1.0")]
#[command(about = "Collect gain and phase points for a Bode plot")]
struct Args {
    /// Oscilloscope IP address or hostname
    host: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT, help = "SCPI socket port")]
    port: u16,

    #[arg(short, long, default_value_t = 10, help = "Number of frequency points")]
    num: usize,

    #[arg(long, default_value_t = 4000, help = "Time per point in milliseconds")]
    total_ms: u64,

    #[arg(long, default_value_t = 1400, help = "Part of each point reserved for changing the frequency")]
    setup_ms: u64,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

struct BodePoint {
    frequency: f64,
    gain_db: f64,
    phase_deg: f64,
}

impl BodePoint {
    fn new(vin: f64, vout: f64, delay: f64, frequency: f64) -> Self {
        Self {
            frequency,
            gain_db: 20.0 * (vout / vin).log10(),
            phase_deg: (delay * frequency * 2.0 * PI).to_degrees(),
        }
    }
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

    if args.setup_ms >= args.total_ms {
        eprintln!("Setup time must be shorter than the total time per point");
        std::process::exit(1);
    }

    let mut osc = Rigol1000z::connect((args.host.as_str(), args.port), Some(Duration::from_secs(5)))?;
    println!("ID: {:?}", osc.identity()?);

    {
        let mut measure = osc.measure();
        measure.set_counter_source(Some(Source::Ch1))?;
        measure.set_delay_sources(Source::Ch1, Source::Ch2)?;
        measure.set_statistic_display(true)?;
        measure.set_statistic_mode(StatisticMode::Difference)?;
        measure.add_statistic_item(MeasureItem::PeakToPeak, &[Source::Ch1])?;
        measure.add_statistic_item(MeasureItem::PeakToPeak, &[Source::Ch2])?;
        measure.add_statistic_item(MeasureItem::RisingDelay, &[Source::Ch1, Source::Ch2])?;
    }

    let setup = Duration::from_millis(args.setup_ms);
    let measuring = Duration::from_millis(args.total_ms - args.setup_ms);
    let mut points = Vec::with_capacity(args.num);

    for i in 1..=args.num {
        println!("[{i}/{}] Set the generator frequency", args.num);
        thread::sleep(setup);
        osc.measure().reset_statistics()?;
        thread::sleep(measuring);

        let mut measure = osc.measure();
        let vin = measure.statistic_item(StatisticKind::Average, MeasureItem::PeakToPeak, &[Source::Ch1])?;
        let vout = measure.statistic_item(StatisticKind::Average, MeasureItem::PeakToPeak, &[Source::Ch2])?;
        let delay = measure.statistic_item(
            StatisticKind::Average,
            MeasureItem::RisingDelay,
            &[Source::Ch1, Source::Ch2],
        )?;
        let frequency = measure.counter_value()?;
        log::debug!("vin={vin} vout={vout} delay={delay} f={frequency}");

        points.push(BodePoint::new(vin, vout, delay, frequency));
    }

    println!("\n{:>14} {:>10} {:>10}", "frequency/Hz", "gain/dB", "phase/°");
    for point in &points {
        println!(
            "{:>14.3} {:>10.2} {:>10.1}",
            point.frequency, point.gain_db, point.phase_deg
        );
    }

    osc.close()?;
    Ok(())
}
