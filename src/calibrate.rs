use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::transport::Transport;

/// `:CAL` self-calibration. Disconnect all inputs before starting.
pub struct Calibrate<'a> {
    menu: CommandMenu<'a>,
}

impl<'a> Calibrate<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, ":cal"),
        }
    }

    pub fn start(&mut self) -> Result<(), ScopeError> {
        log::debug!("Starting self-calibration");
        self.menu.write(":star")
    }

    pub fn quit(&mut self) -> Result<(), ScopeError> {
        self.menu.write(":quit")
    }
}
