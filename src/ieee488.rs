use std::fmt;

use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::transport::Transport;

/// Parsed `*IDN?` reply: `RIGOL TECHNOLOGIES,DS1104Z,DS1ZA1234,00.04.04.SP3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware: String,
}

impl Identity {
    pub fn parse(reply: &str) -> Option<Self> {
        let mut fields = reply.trim().splitn(4, ',').map(str::trim);
        let identity = Self {
            manufacturer: fields.next()?.to_string(),
            model: fields.next()?.to_string(),
            serial_number: fields.next()?.to_string(),
            firmware: fields.next()?.to_string(),
        };
        Some(identity)
    }

    pub fn scope_model(&self) -> ScopeModel {
        ScopeModel::from_model_field(&self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeModel {
    Ds1054z,
    Ds1074zPlus,
    Ds1104zPlus,
    Ds1074zSPlus,
    Ds1104zSPlus,
    /// Early DS1104Z without the Plus suffix.
    Ds1104z,
    Other(String),
}

impl ScopeModel {
    pub fn from_model_field(model: &str) -> Self {
        match model.trim() {
            "DS1054Z" => Self::Ds1054z,
            "DS1074Z Plus" => Self::Ds1074zPlus,
            "DS1104Z Plus" => Self::Ds1104zPlus,
            "DS1074Z-S Plus" => Self::Ds1074zSPlus,
            "DS1104Z-S Plus" => Self::Ds1104zSPlus,
            "DS1104Z" => Self::Ds1104z,
            other => Self::Other(other.to_string()),
        }
    }

    /// Plus models carry the 16 digital inputs.
    pub fn has_digital(&self) -> bool {
        matches!(
            self,
            Self::Ds1074zPlus | Self::Ds1104zPlus | Self::Ds1074zSPlus | Self::Ds1104zSPlus
        )
    }

    /// Rated analog bandwidth in Hz.
    pub fn rated_bandwidth_hz(&self) -> Result<f64, ScopeError> {
        match self {
            Self::Ds1104zPlus | Self::Ds1104zSPlus => Ok(100e6),
            Self::Ds1074zPlus | Self::Ds1074zSPlus => Ok(70e6),
            // the non-Plus DS1104Z is a 50 MHz unit with a different badge
            Self::Ds1054z | Self::Ds1104z => Ok(50e6),
            Self::Other(model) => Err(ScopeError::UnsupportedModel(model.clone())),
        }
    }
}

impl fmt::Display for ScopeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ds1054z => "DS1054Z",
            Self::Ds1074zPlus => "DS1074Z Plus",
            Self::Ds1104zPlus => "DS1104Z Plus",
            Self::Ds1074zSPlus => "DS1074Z-S Plus",
            Self::Ds1104zSPlus => "DS1104Z-S Plus",
            Self::Ds1104z => "DS1104Z",
            Self::Other(model) => model.as_str(),
        };
        f.write_str(name)
    }
}

/// IEEE 488.2 common commands (`*CLS`, `*IDN?`, ...).
pub struct Ieee488<'a> {
    menu: CommandMenu<'a>,
}

impl<'a> Ieee488<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, "*"),
        }
    }

    /// Clear the event registers and the error queue.
    pub fn clear_status(&mut self) -> Result<(), ScopeError> {
        self.menu.write("cls")
    }

    pub fn event_enable_mask(&mut self) -> Result<u8, ScopeError> {
        self.menu.ask_parse("ese?")
    }

    pub fn set_event_enable_mask(&mut self, mask: u8) -> Result<(), ScopeError> {
        self.menu.write(&format!("ese {mask}"))
    }

    /// Reading the standard event register clears it.
    pub fn query_and_clear_event_register(&mut self) -> Result<u8, ScopeError> {
        self.menu.ask_parse("esr?")
    }

    pub fn identity(&mut self) -> Result<Identity, ScopeError> {
        let reply = self.menu.ask("idn?")?;
        Identity::parse(&reply).ok_or_else(|| ScopeError::unexpected("*idn?", &reply))
    }

    /// Blocks on the instrument side until pending operations finish.
    pub fn operation_complete(&mut self) -> Result<bool, ScopeError> {
        self.menu.ask_bool("opc?")
    }

    /// Restore factory defaults.
    pub fn reset(&mut self) -> Result<(), ScopeError> {
        self.menu.write("rst")
    }

    pub fn service_request_enable_mask(&mut self) -> Result<u8, ScopeError> {
        self.menu.ask_parse("sre?")
    }

    pub fn set_service_request_enable_mask(&mut self, mask: u8) -> Result<(), ScopeError> {
        self.menu.write(&format!("sre {mask}"))
    }

    pub fn query_status_byte(&mut self) -> Result<u8, ScopeError> {
        self.menu.ask_parse("stb?")
    }

    /// Run the self-test. Zero means every test passed.
    pub fn self_test(&mut self) -> Result<i64, ScopeError> {
        self.menu.ask_i64("tst?")
    }

    /// Hold off further commands until the current one has executed.
    pub fn wait(&mut self) -> Result<(), ScopeError> {
        self.menu.write("wai")
    }
}
