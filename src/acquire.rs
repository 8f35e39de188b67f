use crate::channel::CHANNEL_COUNT;
use crate::error::ScopeError;
use crate::menu::CommandMenu;
use crate::tokens::AcquireMode;
use crate::transport::Transport;

/// Acquisition memory depth in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryDepth {
    Auto,
    Points(u32),
}

impl MemoryDepth {
    /// Depths the instrument accepts for a given number of enabled channels.
    pub fn allowed_points(enabled_channels: usize) -> &'static [u32] {
        match enabled_channels {
            0 | 1 => &[12_000, 120_000, 1_200_000, 12_000_000, 24_000_000],
            2 => &[6_000, 60_000, 600_000, 6_000_000, 12_000_000],
            _ => &[3_000, 30_000, 300_000, 3_000_000, 6_000_000],
        }
    }
}

/// `:ACQ` subsystem.
pub struct Acquire<'a> {
    menu: CommandMenu<'a>,
}

impl<'a> Acquire<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            menu: CommandMenu::new(transport, ":acq"),
        }
    }

    /// Number of averages in average mode, 2 to 1024.
    pub fn averages(&mut self) -> Result<u32, ScopeError> {
        self.menu.ask_parse(":aver?")
    }

    pub fn set_averages(&mut self, averages: u32) -> Result<(), ScopeError> {
        if !(1..=10).any(|n| averages == 1 << n) {
            return Err(ScopeError::InvalidArgument {
                what: "averages",
                value: averages.to_string(),
            });
        }
        self.menu.write(&format!(":aver {averages}"))
    }

    pub fn memory_depth(&mut self) -> Result<MemoryDepth, ScopeError> {
        let reply = self.menu.ask(":mdep?")?;
        if reply.eq_ignore_ascii_case("AUTO") {
            return Ok(MemoryDepth::Auto);
        }
        reply
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| MemoryDepth::Points(v.round() as u32))
            .ok_or_else(|| ScopeError::unexpected(":acq:mdep?", &reply))
    }

    /// The valid depths depend on how many channels are on, so this queries
    /// each channel's display state first.
    pub fn set_memory_depth(&mut self, depth: MemoryDepth) -> Result<(), ScopeError> {
        let value = match depth {
            MemoryDepth::Auto => "AUTO".to_string(),
            MemoryDepth::Points(points) => {
                let enabled = self.enabled_channel_count()?;
                if !MemoryDepth::allowed_points(enabled).contains(&points) {
                    return Err(ScopeError::InvalidArgument {
                        what: "memory depth",
                        value: format!("{points} points with {enabled} channel(s) enabled"),
                    });
                }
                points.to_string()
            }
        };
        self.menu.write(&format!(":mdep {value}"))
    }

    fn enabled_channel_count(&mut self) -> Result<usize, ScopeError> {
        let mut root = self.menu.root();
        let mut count = 0;
        for channel in 1..=CHANNEL_COUNT {
            if root.ask_bool(&format!(":chan{channel}:disp?"))? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn mode(&mut self) -> Result<AcquireMode, ScopeError> {
        self.menu.ask_token(":type?")
    }

    pub fn set_mode(&mut self, mode: AcquireMode) -> Result<(), ScopeError> {
        self.menu.write_token(":type", mode)
    }

    /// Current sample rate in Sa/s.
    pub fn sample_rate(&mut self) -> Result<f64, ScopeError> {
        self.menu.ask_f64(":srat?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_memory_depth_checked_against_enabled_channels() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.push_text("1").push_text("1").push_text("0").push_text("0");
        mock.push_text("1").push_text("1").push_text("0").push_text("0");

        let mut acquire = Acquire::new(&mut mock);
        // 24M needs a single channel
        assert!(matches!(
            acquire.set_memory_depth(MemoryDepth::Points(24_000_000)),
            Err(ScopeError::InvalidArgument { .. })
        ));
        acquire
            .set_memory_depth(MemoryDepth::Points(12_000_000))
            .unwrap();
        acquire.set_memory_depth(MemoryDepth::Auto).unwrap();

        let writes = handle.writes();
        assert_eq!(writes[..4], [":chan1:disp?", ":chan2:disp?", ":chan3:disp?", ":chan4:disp?"]);
        assert_eq!(writes[8], ":acq:mdep 12000000");
        assert_eq!(writes[9], ":acq:mdep AUTO");
    }

    #[test]
    fn test_memory_depth_replies() {
        let mut mock = MockTransport::new();
        mock.push_text("AUTO").push_text("1.200000e+04").push_text("lots");

        let mut acquire = Acquire::new(&mut mock);
        assert_eq!(acquire.memory_depth().unwrap(), MemoryDepth::Auto);
        assert_eq!(acquire.memory_depth().unwrap(), MemoryDepth::Points(12_000));
        assert!(acquire.memory_depth().is_err());
    }

    #[test]
    fn test_averages_must_be_power_of_two() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        let mut acquire = Acquire::new(&mut mock);

        assert!(acquire.set_averages(3).is_err());
        assert!(acquire.set_averages(1).is_err());
        assert!(acquire.set_averages(2048).is_err());
        acquire.set_averages(1024).unwrap();
        acquire.set_mode(AcquireMode::Average).unwrap();

        assert_eq!(handle.writes(), vec![":acq:aver 1024", ":acq:type AVER"]);
    }
}
