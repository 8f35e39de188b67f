use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::tokens::TimebaseMode;
use crate::transport::Transport;

/// The instrument bounds offsets by scale and memory depth; only NaN and
/// infinities are caught here.
fn check_finite(what: &'static str, seconds: f64) -> Result<(), ScopeError> {
    if seconds.is_finite() {
        Ok(())
    } else {
        Err(ScopeError::InvalidArgument {
            what,
            value: seconds.to_string(),
        })
    }
}

/// Main timebase, `:TIM`.
pub struct Timebase<'a> {
    menu: CommandMenu<'a>,
}

impl<'a> Timebase<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, ":tim"),
        }
    }

    /// Horizontal scale in s/div.
    pub fn scale_s_div(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":scal?")
    }

    /// 5 ns/div to 50 s/div. YT mode below 200 ms/div, roll above.
    pub fn set_scale_s_div(&mut self, seconds: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("timebase scale", seconds, 5e-9, 50.0)?;
        self.menu.write_nr3(":scal", seconds)
    }

    pub fn mode(&mut self) -> Result<TimebaseMode, ScopeError> {
        self.menu.ask_token(":mode?")
    }

    pub fn set_mode(&mut self, mode: TimebaseMode) -> Result<(), ScopeError> {
        self.menu.write_token(":mode", mode)
    }

    /// Horizontal position of the trigger point, seconds.
    pub fn offset_s(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":offs?")
    }

    pub fn set_offset_s(&mut self, seconds: f64) -> Result<(), ScopeError> {
        check_finite("timebase offset", seconds)?;
        self.menu.write_nr3(":offs", seconds)
    }

    /// Zoomed (delayed) timebase, `:TIM:DEL`.
    pub fn delay(&mut self) -> TimebaseDelay<'_> {
        TimebaseDelay {
            menu: self.menu.branch(":del"),
        }
    }
}

pub struct TimebaseDelay<'a> {
    menu: CommandMenu<'a>,
}

impl TimebaseDelay<'_> {
    pub fn enabled(&mut self) -> Result<bool, ScopeError> {
        self.menu.ask_bool(":enab?")
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ScopeError> {
        self.menu.write_bool(":enab", enabled)
    }

    /// Offset of the zoomed window. The instrument bounds it by the main
    /// scale and offset, so only the reply tells whether it was accepted.
    pub fn offset_s(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":offs?")
    }

    pub fn set_offset_s(&mut self, seconds: f64) -> Result<(), ScopeError> {
        check_finite("delayed timebase offset", seconds)?;
        self.menu.write_nr3(":offs", seconds)
    }

    pub fn scale_s_div(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":scal?")
    }

    /// Must not exceed the main scale.
    pub fn set_scale_s_div(&mut self, seconds: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("delayed timebase scale", seconds, 5e-9, 50.0)?;
        self.menu.write_nr3(":scal", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_timebase_commands() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.push_text("ROLL").push_text("0");

        let mut timebase = Timebase::new(&mut mock);
        timebase.set_mode(TimebaseMode::Main).unwrap();
        timebase.set_scale_s_div(10e-6).unwrap();
        timebase.set_offset_s(-2e-6).unwrap();
        assert!(timebase.set_scale_s_div(100.0).is_err());
        assert!(matches!(
            timebase.set_offset_s(f64::NAN),
            Err(ScopeError::InvalidArgument { what: "timebase offset", .. })
        ));
        assert!(timebase.set_offset_s(f64::NEG_INFINITY).is_err());
        assert_eq!(timebase.mode().unwrap(), TimebaseMode::Roll);

        let mut delay = timebase.delay();
        assert!(!delay.enabled().unwrap());
        delay.set_enabled(true).unwrap();
        assert!(delay.set_offset_s(f64::INFINITY).is_err());

        assert_eq!(
            handle.writes(),
            vec![
                ":tim:mode MAIN",
                ":tim:scal 1.0000e-05",
                ":tim:offs -2.0000e-06",
                ":tim:mode?",
                ":tim:del:enab?",
                ":tim:del:enab 1",
            ]
        );
    }
}
