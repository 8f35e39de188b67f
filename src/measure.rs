use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::tokens::{MeasureItem, ScpiToken, Source, StatisticKind, StatisticMode};
use crate::transport::Transport;

/// Automatic measurements, `:MEAS`.
///
/// Values the instrument cannot measure come back as `9.9E37`; they are
/// returned as-is.
pub struct Measure<'a> {
    menu: CommandMenu<'a>,
}

fn source_list(item: MeasureItem, sources: &[Source]) -> Result<String, ScopeError> {
    let expected = if item.needs_two_sources() { 2 } else { 1 };
    if sources.len() != expected {
        return Err(ScopeError::InvalidArgument {
            what: "measurement sources",
            value: format!("{item} takes {expected} source(s), got {}", sources.len()),
        });
    }
    Ok(sources
        .iter()
        .map(ScpiToken::as_scpi)
        .collect::<Vec<_>>()
        .join(","))
}

impl<'a> Measure<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, ":meas"),
        }
    }

    pub fn source(&mut self) -> Result<Source, ScopeError> {
        self.menu.ask_token(":sour?")
    }

    pub fn set_source(&mut self, source: Source) -> Result<(), ScopeError> {
        self.menu.write_token(":sour", source)
    }

    /// Measure `item` on `source` once.
    pub fn item(&mut self, item: MeasureItem, source: Source) -> Result<f64, ScopeError> {
        self.menu.ask_f64(&format!(":item? {item},{source}"))
    }

    /// Remove every measurement item from the screen.
    pub fn clear_all(&mut self) -> Result<(), ScopeError> {
        self.menu.write(":cle ALL")
    }

    pub fn set_counter_source(&mut self, source: Option<Source>) -> Result<(), ScopeError> {
        let token = source.map_or("OFF", |s| s.as_scpi());
        self.menu.write(&format!(":coun:sour {token}"))
    }

    /// Hardware frequency counter reading in Hz.
    pub fn counter_value(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":coun:val?")
    }

    /// Sources A and B used by delay and phase items.
    pub fn set_delay_sources(&mut self, a: Source, b: Source) -> Result<(), ScopeError> {
        self.menu.write_token(":set:dsa", a)?;
        self.menu.write_token(":set:dsb", b)
    }

    pub fn set_statistic_display(&mut self, on: bool) -> Result<(), ScopeError> {
        let state = if on { "ON" } else { "OFF" };
        self.menu.write(&format!(":stat:disp {state}"))
    }

    pub fn set_statistic_mode(&mut self, mode: StatisticMode) -> Result<(), ScopeError> {
        self.menu.write_token(":stat:mode", mode)
    }

    pub fn reset_statistics(&mut self) -> Result<(), ScopeError> {
        self.menu.write(":stat:res")
    }

    /// Start collecting statistics for `item`. Delay and phase items take two
    /// sources, the rest one.
    pub fn add_statistic_item(
        &mut self,
        item: MeasureItem,
        sources: &[Source],
    ) -> Result<(), ScopeError> {
        let sources = source_list(item, sources)?;
        self.menu.write(&format!(":stat:item {item},{sources}"))
    }

    pub fn statistic_item(
        &mut self,
        kind: StatisticKind,
        item: MeasureItem,
        sources: &[Source],
    ) -> Result<f64, ScopeError> {
        let sources = source_list(item, sources)?;
        self.menu
            .ask_f64(&format!(":stat:item? {kind},{item},{sources}"))
    }
}
