use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::tokens::{BandwidthLimit, Coupling, Units};
use crate::transport::Transport;

/// Number of analog inputs on every DS1000Z model.
pub const CHANNEL_COUNT: u8 = 4;

const PROBE_RATIOS: [f64; 16] = [
    0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0,
];

/// Vertical scale limits are 1 mV/div to 10 V/div times the probe ratio.
const SCALE_MIN_V: f64 = 1e-3 * 0.01;
const SCALE_MAX_V: f64 = 10.0 * 1000.0;

/// Reject channel numbers outside 1..=4 before anything is sent.
pub fn check_channel(channel: u8) -> Result<(), ScopeError> {
    if (1..=CHANNEL_COUNT).contains(&channel) {
        Ok(())
    } else {
        Err(ScopeError::InvalidChannel(channel))
    }
}

/// One analog input, `:CHAN<n>`.
///
/// Nothing is cached: every getter is a device query, every setter a single
/// write.
pub struct Channel<'a> {
    menu: CommandMenu<'a>,
    channel: u8,
}

impl<'a> Channel<'a> {
    pub fn new(transport: &'a mut dyn Transport, channel: u8) -> Result<Self, ScopeError> {
        check_channel(channel)?;
        Ok(Self {
            menu: CommandMenu::new(transport, format!(":chan{channel}")),
            channel,
        })
    }

    pub fn number(&self) -> u8 {
        self.channel
    }

    pub fn bandwidth_limit_20mhz(&mut self) -> Result<bool, ScopeError> {
        Ok(self.menu.ask_token::<BandwidthLimit>(":bwl?")? == BandwidthLimit::Mhz20)
    }

    pub fn set_bandwidth_limit_20mhz(&mut self, on: bool) -> Result<(), ScopeError> {
        let limit = if on {
            BandwidthLimit::Mhz20
        } else {
            BandwidthLimit::Off
        };
        self.menu.write_token(":bwl", limit)
    }

    pub fn coupling(&mut self) -> Result<Coupling, ScopeError> {
        self.menu.ask_token(":coup?")
    }

    pub fn set_coupling(&mut self, coupling: Coupling) -> Result<(), ScopeError> {
        self.menu.write_token(":coup", coupling)
    }

    /// Whether the channel is displayed (and therefore acquired).
    pub fn enabled(&mut self) -> Result<bool, ScopeError> {
        self.menu.ask_bool(":disp?")
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ScopeError> {
        self.menu.write_bool(":disp", enabled)
    }

    pub fn invert(&mut self) -> Result<bool, ScopeError> {
        self.menu.ask_bool(":inv?")
    }

    pub fn set_invert(&mut self, invert: bool) -> Result<(), ScopeError> {
        self.menu.write_bool(":inv", invert)
    }

    pub fn offset_v(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":off?")
    }

    /// The accepted range depends on scale and probe ratio (±2 V up to
    /// ±1000 V); only the outer envelope is checked here, the instrument
    /// clamps the rest.
    pub fn set_offset_v(&mut self, volts: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("offset_v", volts, -1000.0, 1000.0)?;
        self.menu.write_nr3(":off", volts)
    }

    /// Full vertical range, 8 divisions.
    pub fn range_v(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":rang?")
    }

    pub fn set_range_v(&mut self, volts: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("range_v", volts, 8e-3, 800.0)?;
        self.menu.write_nr3(":rang", volts)
    }

    /// Zero-offset delay calibration, seconds.
    pub fn calibration_delay(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":tcal?")
    }

    pub fn set_calibration_delay(&mut self, seconds: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("calibration_delay", seconds, -100e-9, 100e-9)?;
        self.menu.write_nr3(":tcal", seconds)
    }

    /// Vertical scale in V/div.
    pub fn scale_v(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":scal?")
    }

    pub fn set_scale_v(&mut self, volts_per_div: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("scale_v", volts_per_div, SCALE_MIN_V, SCALE_MAX_V)?;
        self.menu.write_nr3(":scal", volts_per_div)
    }

    pub fn probe_ratio(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":prob?")
    }

    pub fn set_probe_ratio(&mut self, ratio: f64) -> Result<(), ScopeError> {
        if !PROBE_RATIOS.iter().any(|r| (r - ratio).abs() <= r * 1e-9) {
            return Err(ScopeError::InvalidArgument {
                what: "probe ratio",
                value: ratio.to_string(),
            });
        }
        self.menu.write_nr3(":prob", ratio)
    }

    pub fn units(&mut self) -> Result<Units, ScopeError> {
        self.menu.ask_token(":unit?")
    }

    pub fn set_units(&mut self, units: Units) -> Result<(), ScopeError> {
        self.menu.write_token(":unit", units)
    }

    /// Fine adjustment of the vertical scale.
    pub fn vernier(&mut self) -> Result<bool, ScopeError> {
        self.menu.ask_bool(":vern?")
    }

    pub fn set_vernier(&mut self, on: bool) -> Result<(), ScopeError> {
        self.menu.write_bool(":vern", on)
    }
}
