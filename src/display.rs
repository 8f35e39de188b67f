use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::tokens::{DisplayGrid, DisplayMode, Persistence};
use crate::transport::Transport;

/// `:DISP` subsystem.
pub struct Display<'a> {
    menu: CommandMenu<'a>,
}

impl<'a> Display<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, ":disp"),
        }
    }

    /// Clear all waveforms from the screen.
    pub fn clear(&mut self) -> Result<(), ScopeError> {
        self.menu.write(":cle")
    }

    pub fn mode(&mut self) -> Result<DisplayMode, ScopeError> {
        self.menu.ask_token(":type?")
    }

    pub fn set_mode(&mut self, mode: DisplayMode) -> Result<(), ScopeError> {
        self.menu.write_token(":type", mode)
    }

    pub fn persistence(&mut self) -> Result<Persistence, ScopeError> {
        self.menu.ask_token(":grad:time?")
    }

    pub fn set_persistence(&mut self, persistence: Persistence) -> Result<(), ScopeError> {
        self.menu.write_token(":grad:time", persistence)
    }

    /// Waveform brightness as a fraction, 0.0 to 1.0.
    pub fn brightness(&mut self) -> Result<f64, ScopeError> {
        let percent: f64 = self.menu.ask_parse(":wbr?")?;
        Ok(percent / 100.0)
    }

    pub fn set_brightness(&mut self, fraction: f64) -> Result<(), ScopeError> {
        ScopeError::check_range("brightness", fraction, 0.0, 1.0)?;
        let percent = (fraction * 100.0).round() as u32;
        self.menu.write(&format!(":wbr {percent}"))
    }

    pub fn grid(&mut self) -> Result<DisplayGrid, ScopeError> {
        self.menu.ask_token(":grid?")
    }

    pub fn set_grid(&mut self, grid: DisplayGrid) -> Result<(), ScopeError> {
        self.menu.write_token(":grid", grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_brightness_is_a_fraction() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.push_text("60");

        let mut display = Display::new(&mut mock);
        assert!((display.brightness().unwrap() - 0.6).abs() < 1e-12);
        display.set_brightness(0.25).unwrap();
        assert!(display.set_brightness(1.5).is_err());

        assert_eq!(handle.writes(), vec![":disp:wbr?", ":disp:wbr 25"]);
    }

    #[test]
    fn test_persistence_and_grid() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.push_text("INF").push_text("HALF");

        let mut display = Display::new(&mut mock);
        assert_eq!(display.persistence().unwrap(), Persistence::Infinite);
        assert_eq!(display.grid().unwrap(), DisplayGrid::Half);
        display.set_persistence(Persistence::Ms500).unwrap();
        display.set_mode(DisplayMode::Dots).unwrap();

        assert_eq!(
            handle.writes()[2..],
            [":disp:grad:time 0.5", ":disp:type DOTS"]
        );
    }
}
