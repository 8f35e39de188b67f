//! # Rigol1000z RS
//!
//! A Rust library for remote control of Rigol DS1000Z series oscilloscopes
//! (DS1054Z, DS1074Z/DS1104Z Plus and -S Plus) over SCPI.
//!
//! The instrument is reached through a [`Transport`]: a raw LAN socket on
//! port 5555 out of the box, or VISA with the `visa` feature. On top of it
//! sits the [`Rigol1000z`] facade with typed command groups for each SCPI
//! subsystem and the composite operations that need more than one command.
//!
//! ## Features
//!
//! - **Typed subsystems**: channel, acquire, calibrate, display, IEEE 488.2,
//!   measure, timebase, trigger and waveform commands with enum tokens
//! - **Full-memory capture**: chunked `:WAV:DATA?` reads with progress
//!   reporting, converted to volts and seconds
//! - **DataFrame output**: captures convert to `polars` frames and CSV
//! - **Screenshots** in PNG, JPEG, BMP or TIFF
//! - **Single session ownership**: the connection is closed exactly once
//!
//! ## Examples
//!
//! ### Connect and configure
//!
//! ```rust,no_run
//! use rigol1000z::{Rigol1000z, TimebaseMode, DEFAULT_PORT};
//! use std::time::Duration;
//!
//! let mut osc = Rigol1000z::connect(("192.168.1.50", DEFAULT_PORT), Some(Duration::from_secs(5)))?;
//! println!("Connected to {}", osc.model()?);
//!
//! osc.ieee488().reset()?;
//! osc.timebase().set_mode(TimebaseMode::Main)?;
//! osc.timebase().set_scale_s_div(10e-6)?;
//! for n in 1..=4 {
//!     let mut channel = osc.channel(n)?;
//!     channel.set_enabled(true)?;
//!     channel.set_scale_v(1.0)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Capture the full acquisition memory
//!
//! ```rust,no_run
//! use rigol1000z::{CaptureOptions, Rigol1000z, Source, WaveformMode, DEFAULT_PORT};
//! use std::path::Path;
//!
//! let mut osc = Rigol1000z::connect(("192.168.1.50", DEFAULT_PORT), None)?;
//! let options = CaptureOptions::default().with_mode(WaveformMode::Raw);
//! let data = osc.get_data(Source::Ch1, &options, Some(Path::new("ch1.csv")), |p| {
//!     println!("{}/{} points", p.retrieved, p.total);
//! })?;
//! println!("{}", data.to_dataframe()?);
//! osc.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Scripted transport
//!
//! With the `mock` feature, `mock::MockTransport` replays canned replies and
//! records every exchange, for testing code built on this crate without an
//! instrument.
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # fn main() -> Result<(), rigol1000z::ScopeError> {
//! use rigol1000z::mock::MockTransport;
//! use rigol1000z::Rigol1000z;
//!
//! let mut mock = MockTransport::new();
//! let handle = mock.handle();
//! mock.push_text("4.000000e-01");
//!
//! let mut osc = Rigol1000z::new(mock);
//! osc.channel(1)?.set_scale_v(0.4)?;
//! assert!((osc.channel(1)?.scale_v()? - 0.4).abs() < 1e-12);
//! assert_eq!(handle.writes(), vec![":chan1:scal 4.0000e-01", ":chan1:scal?"]);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "mock"))]
//! # fn main() {}
//! ```

pub mod acquire;
pub mod block;
pub mod calibrate;
pub mod capture;
pub mod channel;
pub mod display;
pub mod error;
pub mod ieee488;
pub mod measure;
pub mod menu;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod scope;
pub mod timebase;
pub mod tokens;
pub mod transport;
pub mod trigger;
pub mod waveform;

// Re-export the main types for convenience
pub use scope::Rigol1000z;

pub use error::ScopeError;

pub use transport::{SocketTransport, Transport, TransportError, DEFAULT_PORT};

#[cfg(feature = "visa")]
pub use transport::VisaTransport;

pub use capture::{CaptureOptions, CaptureProgress, WaveformData};

pub use waveform::{Preamble, PreambleError};

pub use ieee488::{Identity, ScopeModel};

pub use acquire::MemoryDepth;

pub use tokens::{
    AcquireMode, BandwidthLimit, Coupling, DisplayGrid, DisplayMode, EdgeSlope, ImageFormat,
    MeasureItem, Persistence, ScpiToken, Source, StatisticKind, StatisticMode, TimebaseMode,
    TriggerMode, TriggerSource, TriggerStatus, TriggerSweep, Units, WaveformFormat, WaveformMode,
};
