use std::net::ToSocketAddrs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::acquire::Acquire;
use crate::block;
use crate::calibrate::Calibrate;
use crate::capture::{self, CaptureOptions, CaptureProgress, WaveformData};
use crate::channel::{Channel, CHANNEL_COUNT};
use crate::display::Display;
use crate::error::ScopeError;
use crate::ieee488::{Identity, Ieee488, ScopeModel};
use crate::measure::Measure;
use crate::timebase::Timebase;
use crate::tokens::{ImageFormat, ScpiToken, Source};
use crate::transport::{SocketTransport, Transport, TransportError};
use crate::trigger::Trigger;
use crate::waveform::Waveform;

/// A connected DS1000Z oscilloscope.
///
/// Owns the transport. Subsystems are reached through short-lived borrows
/// (`scope.channel(1)?.set_scale_v(0.5)?`), so only one command sequence can
/// be in flight. The transport is closed exactly once, by [`close`] or on drop.
///
/// [`close`]: Rigol1000z::close
pub struct Rigol1000z<T: Transport> {
    transport: T,
    closed: bool,
}

impl Rigol1000z<SocketTransport> {
    /// Connect over LAN, e.g. `Rigol1000z::connect(("192.168.1.50", DEFAULT_PORT), None)`.
    pub fn connect(
        addr: impl ToSocketAddrs,
        timeout: Option<Duration>,
    ) -> Result<Self, ScopeError> {
        Ok(Self::new(SocketTransport::connect(addr, timeout)?))
    }
}

impl<T: Transport> Rigol1000z<T> {
    /// Largest screenshot the instrument sends, block framing included.
    pub const SCREENSHOT_MAX_BYTES: usize = 3_850_780;
    pub const AUTOSCALE_MAX_POLLS: usize = 50;
    pub const AUTOSCALE_POLL_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(transport: T) -> Self {
        Self {
            transport,
            closed: false,
        }
    }

    // Subsystems

    pub fn channel(&mut self, channel: u8) -> Result<Channel<'_>, ScopeError> {
        Channel::new(&mut self.transport, channel)
    }

    pub fn acquire(&mut self) -> Acquire<'_> {
        Acquire::new(&mut self.transport)
    }

    pub fn calibrate(&mut self) -> Calibrate<'_> {
        Calibrate::new(&mut self.transport)
    }

    pub fn display(&mut self) -> Display<'_> {
        Display::new(&mut self.transport)
    }

    pub fn ieee488(&mut self) -> Ieee488<'_> {
        Ieee488::new(&mut self.transport)
    }

    pub fn measure(&mut self) -> Measure<'_> {
        Measure::new(&mut self.transport)
    }

    pub fn timebase(&mut self) -> Timebase<'_> {
        Timebase::new(&mut self.transport)
    }

    pub fn trigger(&mut self) -> Trigger<'_> {
        Trigger::new(&mut self.transport)
    }

    pub fn waveform(&mut self) -> Waveform<'_> {
        Waveform::new(&mut self.transport)
    }

    // Top-level commands

    pub fn run(&mut self) -> Result<(), ScopeError> {
        self.write(":run")
    }

    pub fn stop(&mut self) -> Result<(), ScopeError> {
        self.write(":stop")
    }

    /// Arm a single acquisition.
    pub fn single(&mut self) -> Result<(), ScopeError> {
        self.write(":sing")
    }

    pub fn force_trigger(&mut self) -> Result<(), ScopeError> {
        self.write(":tfor")
    }

    /// Clear all waveforms from the screen.
    pub fn clear(&mut self) -> Result<(), ScopeError> {
        self.write(":clear")
    }

    pub fn reset(&mut self) -> Result<(), ScopeError> {
        self.ieee488().reset()
    }

    /// Autoscale and wait until the instrument reports completion.
    pub fn autoscale(&mut self) -> Result<(), ScopeError> {
        self.autoscale_with(Self::AUTOSCALE_MAX_POLLS, Self::AUTOSCALE_POLL_INTERVAL)
    }

    #[tracing::instrument(skip(self))]
    pub fn autoscale_with(&mut self, max_polls: usize, interval: Duration) -> Result<(), ScopeError> {
        self.write(":aut")?;
        for poll in 1..=max_polls {
            if self.ieee488().operation_complete()? {
                log::debug!("Autoscale complete after {poll} poll(s)");
                return Ok(());
            }
            thread::sleep(interval);
        }
        Err(ScopeError::OperationIncomplete { polls: max_polls })
    }

    // Information

    /// Display state of channels 1 to 4.
    pub fn channels_enabled(&mut self) -> Result<Vec<bool>, ScopeError> {
        (1..=CHANNEL_COUNT)
            .map(|n| self.channel(n)?.enabled())
            .collect()
    }

    pub fn identity(&mut self) -> Result<Identity, ScopeError> {
        self.ieee488().identity()
    }

    pub fn model(&mut self) -> Result<ScopeModel, ScopeError> {
        Ok(self.identity()?.scope_model())
    }

    pub fn has_digital(&mut self) -> Result<bool, ScopeError> {
        Ok(self.model()?.has_digital())
    }

    pub fn rated_bandwidth_hz(&mut self) -> Result<f64, ScopeError> {
        self.model()?.rated_bandwidth_hz()
    }

    // Data

    /// Grab the display as an image. The payload is also written to `path`
    /// when one is given.
    ///
    /// JPEG takes a few seconds to render, so the transport timeout is
    /// lifted for the duration and put back afterwards.
    #[tracing::instrument(skip(self, path))]
    pub fn get_screenshot(
        &mut self,
        format: ImageFormat,
        path: Option<&Path>,
    ) -> Result<Vec<u8>, ScopeError> {
        let previous = self.transport.timeout();
        self.transport.set_timeout(None)?;
        let command = format!(":disp:data? on,off,{}", format.as_scpi());
        let reply = self
            .transport
            .query_raw(&command, Self::SCREENSHOT_MAX_BYTES);
        let restored = self.transport.set_timeout(previous);

        let image = block::parse_block(&reply?)?.to_vec();
        restored?;
        log::info!("Screenshot: {} bytes of {}", image.len(), format);

        if let Some(path) = path {
            std::fs::write(path, &image)?;
        }
        Ok(image)
    }

    /// Capture every point of `source` (see [`capture::capture`]) and save
    /// it as CSV when `path` is given. No file is touched if the capture
    /// fails.
    pub fn get_data(
        &mut self,
        source: Source,
        options: &CaptureOptions,
        path: Option<&Path>,
        mut progress: impl FnMut(&CaptureProgress),
    ) -> Result<WaveformData, ScopeError> {
        let data = capture::capture(&mut self.transport, source, options, &mut progress)?;
        if let Some(path) = path {
            data.write_csv(path)?;
        }
        Ok(data)
    }

    /// Capture each enabled analog channel in turn.
    pub fn get_data_enabled(
        &mut self,
        options: &CaptureOptions,
        mut progress: impl FnMut(Source, &CaptureProgress),
    ) -> Result<Vec<WaveformData>, ScopeError> {
        let enabled = self.channels_enabled()?;
        let mut captures = Vec::new();
        for (source, _) in Source::ANALOG.into_iter().zip(enabled).filter(|(_, on)| *on) {
            captures.push(self.get_data(source, options, None, |p| progress(source, p))?);
        }
        Ok(captures)
    }

    // Raw access

    pub fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        Ok(self.transport.write(command)?)
    }

    pub fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        Ok(self.transport.query(command)?)
    }

    pub fn query_raw(&mut self, command: &str, max_bytes: usize) -> Result<Vec<u8>, ScopeError> {
        Ok(self.transport.query_raw(command, max_bytes)?)
    }

    /// Close the connection and report how it went. Dropping closes too, but
    /// only logs failures.
    pub fn close(mut self) -> Result<(), ScopeError> {
        Ok(self.close_transport()?)
    }

    fn close_transport(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        log::debug!("Closing oscilloscope session");
        self.transport.close()
    }
}

impl<T: Transport> Drop for Rigol1000z<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close_transport() {
            log::warn!("Failed to close oscilloscope session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::block::encode_block;
    use crate::capture::tests::byte_scope;
    use crate::mock::{Exchange, MockTransport};

    #[test]
    fn test_drop_after_error_closes_once() {
        let mock = MockTransport::new();
        let handle = mock.handle();

        let result = (|| -> Result<String, ScopeError> {
            let mut scope = Rigol1000z::new(mock);
            scope.run()?;
            // nothing queued, the read times out
            scope.query("*idn?")
        })();

        assert!(matches!(
            result,
            Err(ScopeError::Transport(TransportError::Timeout))
        ));
        assert_eq!(handle.close_count(), 1);
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_drop_during_panic_closes_once() {
        let mock = MockTransport::new();
        let handle = mock.handle();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut scope = Rigol1000z::new(mock);
            scope.stop().unwrap();
            panic!("caller bug");
        }));

        assert!(outcome.is_err());
        assert_eq!(handle.close_count(), 1);
    }

    #[test]
    fn test_close_then_drop_closes_once() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        Rigol1000z::new(mock).close().unwrap();
        assert_eq!(handle.close_count(), 1);
        assert_eq!(handle.log(), vec![Exchange::Close]);
    }

    #[test]
    fn test_top_level_commands() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.push_text("1").push_text("0").push_text("1").push_text("0");

        let mut scope = Rigol1000z::new(mock);
        scope.run().unwrap();
        scope.single().unwrap();
        scope.force_trigger().unwrap();
        scope.clear().unwrap();
        scope.reset().unwrap();
        assert_eq!(scope.channels_enabled().unwrap(), vec![true, false, true, false]);
        assert!(matches!(scope.channel(5), Err(ScopeError::InvalidChannel(5))));

        assert_eq!(
            handle.writes()[..5],
            [":run", ":sing", ":tfor", ":clear", "*rst"]
        );
    }

    #[test]
    fn test_autoscale_polls_until_complete() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.push_text("0").push_text("0").push_text("1");

        let mut scope = Rigol1000z::new(mock);
        scope.autoscale_with(5, Duration::ZERO).unwrap();
        assert_eq!(handle.writes(), vec![":aut", "*opc?", "*opc?", "*opc?"]);
    }

    #[test]
    fn test_autoscale_gives_up() {
        let mock = MockTransport::new().with_responder(|_| Some(b"0".to_vec()));
        let mut scope = Rigol1000z::new(mock);
        assert!(matches!(
            scope.autoscale_with(3, Duration::ZERO),
            Err(ScopeError::OperationIncomplete { polls: 3 })
        ));
    }

    #[test]
    fn test_model_queries() {
        let mock = MockTransport::new().with_responder(|_| {
            Some(b"RIGOL TECHNOLOGIES,DS1074Z Plus,DS1ZC000000001,00.04.04.SP4".to_vec())
        });
        let mut scope = Rigol1000z::new(mock);
        assert_eq!(scope.model().unwrap(), ScopeModel::Ds1074zPlus);
        assert!(scope.has_digital().unwrap());
        assert!((scope.rated_bandwidth_hz().unwrap() - 70e6).abs() < 1.0);
    }

    #[test]
    fn test_screenshot_restores_timeout() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.set_timeout(Some(Duration::from_secs(2))).unwrap();
        mock.push_raw(encode_block(b"\x89PNG fake image"));
        handle.clear_log();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.png");
        let mut scope = Rigol1000z::new(mock);
        let image = scope
            .get_screenshot(ImageFormat::Png, Some(&path))
            .unwrap();

        assert_eq!(image, b"\x89PNG fake image");
        assert_eq!(std::fs::read(&path).unwrap(), image);
        assert_eq!(
            handle.log(),
            vec![
                Exchange::SetTimeout(None),
                Exchange::Write(":disp:data? on,off,PNG".to_string()),
                Exchange::ReadRaw(Rigol1000z::<MockTransport>::SCREENSHOT_MAX_BYTES),
                Exchange::SetTimeout(Some(Duration::from_secs(2))),
            ]
        );
    }

    #[test]
    fn test_screenshot_restores_timeout_on_failure() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.set_timeout(Some(Duration::from_secs(2))).unwrap();
        mock.push_raw(b"PNG without a header".to_vec());

        let mut scope = Rigol1000z::new(mock);
        assert!(matches!(
            scope.get_screenshot(ImageFormat::Jpeg, None),
            Err(ScopeError::Block(block::BlockError::MissingHash))
        ));
        assert_eq!(
            handle.log().last(),
            Some(&Exchange::SetTimeout(Some(Duration::from_secs(2))))
        );
    }

    #[test]
    fn test_failed_capture_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch1.csv");

        let mut scope = Rigol1000z::new(byte_scope(10, 1));
        let options = CaptureOptions::default().with_chunk_points(5);
        assert!(matches!(
            scope.get_data(Source::Ch1, &options, Some(&path), |_| {}),
            Err(ScopeError::LengthMismatch { .. })
        ));
        assert!(!path.exists());

        let mut scope = Rigol1000z::new(byte_scope(10, 0));
        let data = scope
            .get_data(Source::Ch1, &options, Some(&path), |_| {})
            .unwrap();
        assert_eq!(data.len(), 10);
        assert!(path.exists());
    }

    #[test]
    fn test_capture_of_enabled_channels() {
        let mut mock = byte_scope(4, 0);
        mock.push_text("0").push_text("1").push_text("0").push_text("1");
        let handle = mock.handle();

        let mut scope = Rigol1000z::new(mock);
        let mut seen = Vec::new();
        let captures = scope
            .get_data_enabled(&CaptureOptions::default(), |source, _| seen.push(source))
            .unwrap();

        assert_eq!(
            captures.iter().map(|c| c.source).collect::<Vec<_>>(),
            vec![Source::Ch2, Source::Ch4]
        );
        assert_eq!(seen, vec![Source::Ch2, Source::Ch4]);
        assert!(handle.writes().contains(&":wav:sour CHAN4".to_string()));
    }
}
