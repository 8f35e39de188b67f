//! Closed sets of device tokens.
//!
//! Each enum carries an explicit table between its variants and the SCPI
//! mnemonics the DS1000Z sends and accepts. Replies are matched without regard
//! to case; commands always use the short form listed first.

use std::fmt;

pub trait ScpiToken: Sized + Copy + 'static {
    fn as_scpi(&self) -> &'static str;

    fn from_scpi(reply: &str) -> Option<Self>;
}

macro_rules! scpi_tokens {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$( Self::$variant ),+];
        }

        impl ScpiToken for $name {
            fn as_scpi(&self) -> &'static str {
                match self {
                    $( Self::$variant => $token ),+
                }
            }

            fn from_scpi(reply: &str) -> Option<Self> {
                let reply = reply.trim();
                $(
                    if reply.eq_ignore_ascii_case($token)
                        $( || reply.eq_ignore_ascii_case($alias) )*
                    {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_scpi())
            }
        }
    };
}

scpi_tokens! {
    pub enum BandwidthLimit {
        Off => "OFF",
        Mhz20 => "20M",
    }
}

scpi_tokens! {
    pub enum Coupling {
        Ac => "AC",
        Dc => "DC",
        Ground => "GND",
    }
}

scpi_tokens! {
    pub enum Units {
        Volt => "VOLT" | "VOLTAGE",
        Watt => "WATT",
        Amp => "AMP" | "AMPERE",
        Unknown => "UNKN" | "UNKNOWN",
    }
}

scpi_tokens! {
    pub enum AcquireMode {
        Normal => "NORM" | "NORMAL",
        Average => "AVER" | "AVERAGES",
        Peak => "PEAK",
        HighResolution => "HRES" | "HRESOLUTION",
    }
}

scpi_tokens! {
    pub enum DisplayMode {
        Vectors => "VECT" | "VECTORS",
        Dots => "DOTS",
    }
}

scpi_tokens! {
    pub enum DisplayGrid {
        Full => "FULL",
        Half => "HALF",
        None => "NONE",
    }
}

scpi_tokens! {
    /// Waveform persistence time on the display.
    pub enum Persistence {
        Minimum => "MIN" | "MINIMUM",
        Ms100 => "0.1",
        Ms200 => "0.2",
        Ms500 => "0.5",
        S1 => "1",
        S5 => "5",
        S10 => "10",
        Infinite => "INF" | "INFINITE",
    }
}

scpi_tokens! {
    pub enum TimebaseMode {
        Main => "MAIN",
        Xy => "XY",
        Roll => "ROLL",
    }
}

scpi_tokens! {
    pub enum TriggerMode {
        Edge => "EDGE",
        Pulse => "PULS" | "PULSE",
        Runt => "RUNT",
        Window => "WIND" | "WINDOWS",
        Slope => "SLOP" | "SLOPE",
        NthEdge => "NEDG" | "NEDGE",
        Pattern => "PATT" | "PATTERN",
        Delay => "DEL" | "DELAY",
        Timeout => "TIM" | "TIMEOUT",
        Duration => "DUR" | "DURATION",
        SetupHold => "SHOL" | "SHOLD",
        Rs232 => "RS232",
        I2c => "IIC",
        Spi => "SPI",
    }
}

scpi_tokens! {
    pub enum TriggerSweep {
        Auto => "AUTO",
        Normal => "NORM" | "NORMAL",
        Single => "SING" | "SINGLE",
    }
}

scpi_tokens! {
    pub enum TriggerStatus {
        Triggered => "TD",
        Waiting => "WAIT",
        Running => "RUN",
        Auto => "AUTO",
        Stopped => "STOP",
    }
}

scpi_tokens! {
    pub enum EdgeSlope {
        Positive => "POS" | "POSITIVE",
        Negative => "NEG" | "NEGATIVE",
        Either => "RFAL" | "RFALL",
    }
}

scpi_tokens! {
    pub enum TriggerSource {
        Ch1 => "CHAN1" | "CHANNEL1",
        Ch2 => "CHAN2" | "CHANNEL2",
        Ch3 => "CHAN3" | "CHANNEL3",
        Ch4 => "CHAN4" | "CHANNEL4",
        AcLine => "AC",
        D0 => "D0",
        D1 => "D1",
        D2 => "D2",
        D3 => "D3",
        D4 => "D4",
        D5 => "D5",
        D6 => "D6",
        D7 => "D7",
        D8 => "D8",
        D9 => "D9",
        D10 => "D10",
        D11 => "D11",
        D12 => "D12",
        D13 => "D13",
        D14 => "D14",
        D15 => "D15",
    }
}

scpi_tokens! {
    /// Data source for waveform reads and measurements.
    pub enum Source {
        Ch1 => "CHAN1" | "CHANNEL1",
        Ch2 => "CHAN2" | "CHANNEL2",
        Ch3 => "CHAN3" | "CHANNEL3",
        Ch4 => "CHAN4" | "CHANNEL4",
        Math => "MATH",
        D0 => "D0",
        D1 => "D1",
        D2 => "D2",
        D3 => "D3",
        D4 => "D4",
        D5 => "D5",
        D6 => "D6",
        D7 => "D7",
        D8 => "D8",
        D9 => "D9",
        D10 => "D10",
        D11 => "D11",
        D12 => "D12",
        D13 => "D13",
        D14 => "D14",
        D15 => "D15",
    }
}

impl Source {
    pub const ANALOG: [Self; 4] = [Self::Ch1, Self::Ch2, Self::Ch3, Self::Ch4];

    /// Analog source for a 1-based channel number.
    pub fn channel(channel: u8) -> Option<Self> {
        Self::ANALOG.get(usize::from(channel).checked_sub(1)?).copied()
    }

    pub fn analog_channel(&self) -> Option<u8> {
        Self::ANALOG
            .iter()
            .position(|s| s == self)
            .map(|i| i as u8 + 1)
    }

    pub fn is_digital(&self) -> bool {
        !matches!(
            self,
            Self::Ch1 | Self::Ch2 | Self::Ch3 | Self::Ch4 | Self::Math
        )
    }
}

scpi_tokens! {
    pub enum WaveformMode {
        /// Points currently on screen.
        Normal => "NORM" | "NORMAL",
        Max => "MAX" | "MAXIMUM",
        /// Points in internal memory, requires the scope to be stopped.
        Raw => "RAW",
    }
}

impl WaveformMode {
    /// Value of the preamble `type` field.
    pub fn preamble_code(&self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Max => 1,
            Self::Raw => 2,
        }
    }

    pub fn from_preamble_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.preamble_code() == code)
    }
}

scpi_tokens! {
    pub enum WaveformFormat {
        Word => "WORD",
        Byte => "BYTE",
        Ascii => "ASC" | "ASCII",
    }
}

impl WaveformFormat {
    pub fn preamble_code(&self) -> u8 {
        match self {
            Self::Word => 0,
            Self::Byte => 1,
            Self::Ascii => 2,
        }
    }

    pub fn from_preamble_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.preamble_code() == code)
    }

    /// Most points the instrument returns for one `:WAV:DATA?` in this format.
    pub fn max_chunk_points(&self) -> usize {
        match self {
            Self::Word => 125_000,
            Self::Byte => 250_000,
            Self::Ascii => 15_625,
        }
    }

    /// Upper bound on payload bytes per point.
    pub fn max_bytes_per_point(&self) -> usize {
        match self {
            Self::Word => 2,
            Self::Byte => 1,
            // "-1.234567e-01," plus slack
            Self::Ascii => 16,
        }
    }
}

scpi_tokens! {
    pub enum ImageFormat {
        Jpeg => "JPEG",
        Png => "PNG",
        Bmp8 => "BMP8",
        Bmp24 => "BMP24",
        Tiff => "TIFF",
    }
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Bmp8 | Self::Bmp24 => "bmp",
            Self::Tiff => "tif",
        }
    }
}

scpi_tokens! {
    pub enum MeasureItem {
        VoltageMax => "VMAX",
        VoltageMin => "VMIN",
        PeakToPeak => "VPP",
        Top => "VTOP",
        Base => "VBAS" | "VBASE",
        Amplitude => "VAMP",
        Average => "VAVG",
        Rms => "VRMS",
        Overshoot => "OVER" | "OVERSHOOT",
        Preshoot => "PRES" | "PRESHOOT",
        Area => "MAR" | "MAREA",
        PeriodArea => "MPAR" | "MPAREA",
        Period => "PER" | "PERIOD",
        Frequency => "FREQ" | "FREQUENCY",
        RiseTime => "RTIM" | "RTIME",
        FallTime => "FTIM" | "FTIME",
        PositiveWidth => "PWID" | "PWIDTH",
        NegativeWidth => "NWID" | "NWIDTH",
        PositiveDuty => "PDUT" | "PDUTY",
        NegativeDuty => "NDUT" | "NDUTY",
        RisingDelay => "RDEL" | "RDELAY",
        FallingDelay => "FDEL" | "FDELAY",
        RisingPhase => "RPH" | "RPHASE",
        FallingPhase => "FPH" | "FPHASE",
        TimeAtMax => "TVMAX",
        TimeAtMin => "TVMIN",
        PositiveSlew => "PSLEW" | "PSLEWRATE",
        NegativeSlew => "NSLEW" | "NSLEWRATE",
        Upper => "VUP" | "VUPPER",
        Middle => "VMID",
        Lower => "VLOW" | "VLOWER",
        Variance => "VARI" | "VARIANCE",
        PeriodRms => "PVRMS",
        PositivePulses => "PPUL" | "PPULSES",
        NegativePulses => "NPUL" | "NPULSES",
        PositiveEdges => "PEDG" | "PEDGES",
        NegativeEdges => "NEDG" | "NEDGES",
    }
}

impl MeasureItem {
    /// Items measured between two sources (delay and phase).
    pub fn needs_two_sources(&self) -> bool {
        matches!(
            self,
            Self::RisingDelay | Self::FallingDelay | Self::RisingPhase | Self::FallingPhase
        )
    }
}

scpi_tokens! {
    pub enum StatisticMode {
        Difference => "DIFF" | "DIFFERENCE",
        Extremum => "EXTR" | "EXTREMUM",
    }
}

scpi_tokens! {
    pub enum StatisticKind {
        Max => "MAX" | "MAXIMUM",
        Min => "MIN" | "MINIMUM",
        Current => "CURR" | "CURRENT",
        Average => "AVER" | "AVERAGES",
        Deviation => "DEV" | "DEVIATION",
    }
}
