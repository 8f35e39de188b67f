use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::tokens::{EdgeSlope, TriggerMode, TriggerSource, TriggerStatus, TriggerSweep};
use crate::transport::Transport;

/// `:TRIG` subsystem.
pub struct Trigger<'a> {
    menu: CommandMenu<'a>,
}

impl<'a> Trigger<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, ":trig"),
        }
    }

    pub fn mode(&mut self) -> Result<TriggerMode, ScopeError> {
        self.menu.ask_token(":mode?")
    }

    pub fn set_mode(&mut self, mode: TriggerMode) -> Result<(), ScopeError> {
        self.menu.write_token(":mode", mode)
    }

    pub fn sweep(&mut self) -> Result<TriggerSweep, ScopeError> {
        self.menu.ask_token(":swe?")
    }

    pub fn set_sweep(&mut self, sweep: TriggerSweep) -> Result<(), ScopeError> {
        self.menu.write_token(":swe", sweep)
    }

    pub fn status(&mut self) -> Result<TriggerStatus, ScopeError> {
        self.menu.ask_token(":stat?")
    }

    pub fn holdoff_s(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":hold?")
    }

    pub fn set_holdoff_s(&mut self, seconds: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("trigger holdoff", seconds, 16e-9, 10.0)?;
        self.menu.write_nr3(":hold", seconds)
    }

    /// Edge trigger settings, `:TRIG:EDG`.
    pub fn edge(&mut self) -> TriggerEdge<'_> {
        TriggerEdge {
            menu: self.menu.branch(":edg"),
        }
    }
}

pub struct TriggerEdge<'a> {
    menu: CommandMenu<'a>,
}

impl TriggerEdge<'_> {
    pub fn source(&mut self) -> Result<TriggerSource, ScopeError> {
        self.menu.ask_token(":sour?")
    }

    pub fn set_source(&mut self, source: TriggerSource) -> Result<(), ScopeError> {
        self.menu.write_token(":sour", source)
    }

    pub fn slope(&mut self) -> Result<EdgeSlope, ScopeError> {
        self.menu.ask_token(":slop?")
    }

    pub fn set_slope(&mut self, slope: EdgeSlope) -> Result<(), ScopeError> {
        self.menu.write_token(":slop", slope)
    }

    pub fn level_v(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":lev?")
    }

    /// Limited by the instrument to ±5 divisions around the screen centre.
    pub fn set_level_v(&mut self, volts: f64) -> Result<(), ScopeError> {
        if !volts.is_finite() {
            return Err(ScopeError::InvalidArgument {
                what: "trigger level",
                value: volts.to_string(),
            });
        }
        self.menu.write_nr3(":lev", volts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_edge_trigger_setup() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.push_text("TD").push_text("RFAL");

        let mut trigger = Trigger::new(&mut mock);
        trigger.set_mode(TriggerMode::Edge).unwrap();
        trigger.set_sweep(TriggerSweep::Single).unwrap();
        assert!(trigger.set_holdoff_s(1e-9).is_err());
        assert_eq!(trigger.status().unwrap(), TriggerStatus::Triggered);

        let mut edge = trigger.edge();
        edge.set_source(TriggerSource::Ch2).unwrap();
        edge.set_level_v(1.5).unwrap();
        assert_eq!(edge.slope().unwrap(), EdgeSlope::Either);

        assert_eq!(
            handle.writes(),
            vec![
                ":trig:mode EDGE",
                ":trig:swe SING",
                ":trig:stat?",
                ":trig:edg:sour CHAN2",
                ":trig:edg:lev 1.5000e+00",
                ":trig:edg:slop?",
            ]
        );
    }
}
