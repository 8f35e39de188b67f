use std::str::FromStr;

use crate::block;
use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::tokens::{Source, WaveformFormat, WaveformMode};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreambleError {
    #[error("Expected 10 fields, got {0}")]
    FieldCount(usize),

    #[error("Field {name} has invalid value {value:?}")]
    Field { name: &'static str, value: String },
}

/// Scaling record returned by `:WAV:PRE?`.
///
/// Needed before any sample can be turned into volts and seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Preamble {
    pub format: WaveformFormat,
    pub mode: WaveformMode,
    pub points: usize,
    /// Number of averages in average acquisition mode, 1 otherwise.
    pub count: u32,
    /// Seconds between neighbouring points.
    pub x_increment: f64,
    pub x_origin: f64,
    pub x_reference: f64,
    /// Volts per raw code.
    pub y_increment: f64,
    pub y_origin: f64,
    /// Raw code of the screen centre, 127 on the DS1000Z.
    pub y_reference: f64,
}

fn field<T: FromStr>(name: &'static str, value: &str) -> Result<T, PreambleError> {
    value.trim().parse().map_err(|_| PreambleError::Field {
        name,
        value: value.to_string(),
    })
}

impl FromStr for Preamble {
    type Err = PreambleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(',').collect();
        if fields.len() != 10 {
            return Err(PreambleError::FieldCount(fields.len()));
        }

        let format_code: u8 = field("format", fields[0])?;
        let format =
            WaveformFormat::from_preamble_code(format_code).ok_or_else(|| PreambleError::Field {
                name: "format",
                value: fields[0].to_string(),
            })?;
        let mode_code: u8 = field("type", fields[1])?;
        let mode = WaveformMode::from_preamble_code(mode_code).ok_or_else(|| PreambleError::Field {
            name: "type",
            value: fields[1].to_string(),
        })?;

        Ok(Self {
            format,
            mode,
            points: field("points", fields[2])?,
            count: field("count", fields[3])?,
            x_increment: field("xincrement", fields[4])?,
            x_origin: field("xorigin", fields[5])?,
            x_reference: field("xreference", fields[6])?,
            y_increment: field("yincrement", fields[7])?,
            y_origin: field("yorigin", fields[8])?,
            y_reference: field("yreference", fields[9])?,
        })
    }
}

impl Preamble {
    /// Physical value of a raw sample code.
    pub fn to_physical(&self, raw: f64) -> f64 {
        (raw - self.y_reference - self.y_origin) * self.y_increment
    }

    /// Time of the sample at zero-based `index`.
    pub fn time_at(&self, index: usize) -> f64 {
        (index as f64).mul_add(self.x_increment, self.x_origin)
    }
}

/// `:WAV` subsystem: selects what `:WAV:DATA?` returns and how.
pub struct Waveform<'a> {
    menu: CommandMenu<'a>,
}

impl<'a> Waveform<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, ":wav"),
        }
    }

    pub fn source(&mut self) -> Result<Source, ScopeError> {
        self.menu.ask_token(":sour?")
    }

    pub fn set_source(&mut self, source: Source) -> Result<(), ScopeError> {
        self.menu.write_token(":sour", source)
    }

    pub fn mode(&mut self) -> Result<WaveformMode, ScopeError> {
        self.menu.ask_token(":mode?")
    }

    pub fn set_mode(&mut self, mode: WaveformMode) -> Result<(), ScopeError> {
        self.menu.write_token(":mode", mode)
    }

    pub fn format(&mut self) -> Result<WaveformFormat, ScopeError> {
        self.menu.ask_token(":form?")
    }

    pub fn set_format(&mut self, format: WaveformFormat) -> Result<(), ScopeError> {
        self.menu.write_token(":form", format)
    }

    /// Seconds between points: TimeScale/100 in NORM, 1/SampleRate in RAW.
    pub fn x_increment(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":xinc?")
    }

    /// Start time of the data, on screen (NORM) or in memory (RAW).
    pub fn x_origin(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":xor?")
    }

    pub fn x_reference(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":xref?")
    }

    /// VerticalScale/25 in NORM mode.
    pub fn y_increment(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":yinc?")
    }

    pub fn y_origin(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":yor?")
    }

    pub fn y_reference(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":yref?")
    }

    /// First point (1-based) returned by the next data read.
    pub fn start(&mut self) -> Result<usize, ScopeError> {
        self.menu.ask_parse(":star?")
    }

    pub fn set_start(&mut self, point: usize) -> Result<(), ScopeError> {
        Self::check_point("start point", point)?;
        self.menu.write(&format!(":star {point}"))
    }

    /// Last point (1-based, inclusive) returned by the next data read.
    pub fn stop(&mut self) -> Result<usize, ScopeError> {
        self.menu.ask_parse(":stop?")
    }

    pub fn set_stop(&mut self, point: usize) -> Result<(), ScopeError> {
        Self::check_point("stop point", point)?;
        self.menu.write(&format!(":stop {point}"))
    }

    fn check_point(what: &'static str, point: usize) -> Result<(), ScopeError> {
        if point == 0 {
            return Err(ScopeError::InvalidArgument {
                what,
                value: "0 (points are numbered from 1)".to_string(),
            });
        }
        Ok(())
    }

    pub fn preamble(&mut self) -> Result<Preamble, ScopeError> {
        let reply = self.menu.ask(":pre?")?;
        Ok(reply.parse()?)
    }

    /// Read the current start..=stop window and return the block payload.
    pub fn data_block(&mut self, max_bytes: usize) -> Result<Vec<u8>, ScopeError> {
        let raw = self.menu.ask_raw(":data?", max_bytes)?;
        Ok(block::parse_block(&raw)?.to_vec())
    }
}
