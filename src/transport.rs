use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::block::{self, BlockError};

/// Raw SCPI socket port of the DS1000Z LAN interface.
pub const DEFAULT_PORT: u16 = 5555;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out waiting for a reply")]
    Timeout,

    #[error("Connection closed by the instrument")]
    ConnectionClosed,

    #[error("Reply is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Reply of {actual} bytes exceeds the {limit} byte read limit")]
    ResponseTooLarge { limit: usize, actual: usize },

    #[error("Malformed block framing: {0}")]
    Framing(#[from] BlockError),

    #[error("Transport is closed")]
    Closed,
}

impl TransportError {
    fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout,
            ErrorKind::UnexpectedEof => Self::ConnectionClosed,
            _ => Self::Io(err),
        }
    }
}

/// Synchronous request/response connection to an instrument.
///
/// This is the only boundary the rest of the crate talks to. Implementations
/// are expected to surface failures as-is; nothing above this layer retries.
pub trait Transport {
    /// Send one command line. The implementation appends the terminator.
    fn write(&mut self, command: &str) -> Result<(), TransportError>;

    /// Read one reply line with the terminator stripped.
    fn read_text(&mut self) -> Result<String, TransportError>;

    /// Read one complete raw message, at most `max_bytes` long.
    fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError>;

    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// `None` blocks until the instrument answers.
    fn set_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Write a command and read back its text reply.
    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.write(command)?;
        self.read_text()
    }

    /// Write a command and read back its raw reply.
    fn query_raw(&mut self, command: &str, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        self.write(command)?;
        self.read_raw(max_bytes)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn read_text(&mut self) -> Result<String, TransportError> {
        (**self).read_text()
    }

    fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read_raw(max_bytes)
    }

    fn timeout(&self) -> Option<Duration> {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        (**self).set_timeout(timeout)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}

/// Read a single `\n` terminated line, without the terminator.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut line = Vec::new();
    let n = reader
        .read_until(b'\n', &mut line)
        .map_err(TransportError::from_io)?;
    if n == 0 {
        return Err(TransportError::ConnectionClosed);
    }
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    Ok(line)
}

/// Read one raw message off a byte stream.
///
/// Definite-length blocks are framed by their header, so payload bytes that
/// happen to be `\n` do not end the message. Anything else is read as a line.
fn read_message<R: BufRead>(reader: &mut R, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
    let first = reader.fill_buf().map_err(TransportError::from_io)?;
    if first.is_empty() {
        return Err(TransportError::ConnectionClosed);
    }
    if first[0] != b'#' {
        let line = read_line(reader)?;
        if line.len() > max_bytes {
            return Err(TransportError::ResponseTooLarge {
                limit: max_bytes,
                actual: line.len(),
            });
        }
        return Ok(line);
    }

    let mut message = vec![0u8; 2];
    reader
        .read_exact(&mut message)
        .map_err(TransportError::from_io)?;
    let digits = block::header_digit_count(&message)?;
    message.resize(2 + digits, 0);
    reader
        .read_exact(&mut message[2..])
        .map_err(TransportError::from_io)?;
    let header = block::parse_header(&message)?;

    // payload plus the trailing newline
    let total = header.header_len + header.payload_len + 1;
    if total > max_bytes {
        return Err(TransportError::ResponseTooLarge {
            limit: max_bytes,
            actual: total,
        });
    }
    message.resize(total, 0);
    reader
        .read_exact(&mut message[header.header_len..])
        .map_err(TransportError::from_io)?;
    Ok(message)
}

/// SCPI over a raw TCP socket.
pub struct SocketTransport {
    reader: BufReader<TcpStream>,
    timeout: Option<Duration>,
    closed: bool,
}

impl SocketTransport {
    /// Connect to `addr`, e.g. `("192.168.1.50", DEFAULT_PORT)`.
    pub fn connect(
        addr: impl ToSocketAddrs,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        log::debug!("Connected to {}", stream.peer_addr()?);

        Ok(Self {
            reader: BufReader::new(stream),
            timeout,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

impl Transport for SocketTransport {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        self.ensure_open()?;
        log::trace!("> {}", command);
        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{command}\n").as_bytes())
            .map_err(TransportError::from_io)?;
        Ok(())
    }

    fn read_text(&mut self) -> Result<String, TransportError> {
        self.ensure_open()?;
        let reply = String::from_utf8(read_line(&mut self.reader)?)?;
        log::trace!("< {}", reply);
        Ok(reply)
    }

    fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        let message = read_message(&mut self.reader, max_bytes)?;
        log::trace!("< [{} bytes]", message.len());
        Ok(message)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        let stream = self.reader.get_ref();
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        self.timeout = timeout;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        log::debug!("Closing socket connection");
        match self.reader.get_ref().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// `VI_TMO_INFINITE`, the VISA timeout attribute value for "wait forever".
const VISA_TMO_INFINITE: u32 = u32::MAX;

/// VISA timeout attribute value in milliseconds. Sub-millisecond waits round
/// up so only `Duration::ZERO` becomes an immediate timeout.
#[cfg_attr(not(feature = "visa"), allow(dead_code))]
fn visa_timeout_ms(timeout: Option<Duration>) -> u32 {
    match timeout {
        None => VISA_TMO_INFINITE,
        Some(timeout) => u32::try_from(timeout.as_nanos().div_ceil(1_000_000))
            .map_or(VISA_TMO_INFINITE - 1, |ms| ms.min(VISA_TMO_INFINITE - 1)),
    }
}

#[cfg(feature = "visa")]
pub use visa::VisaTransport;

#[cfg(feature = "visa")]
mod visa {
    use std::ffi::CString;
    use std::io::{BufReader, ErrorKind, Write};
    use std::time::Duration;

    use visa_rs::attribute::{AttrTmoValue, HasAttribute};
    use visa_rs::flags::AccessMode;
    use visa_rs::{DefaultRM, Instrument, TIMEOUT_IMMEDIATE};

    use super::{read_line, read_message, visa_timeout_ms, Transport, TransportError};

    /// SCPI through a VISA resource (USB-TMC, VXI-11, HiSLIP ...).
    pub struct VisaTransport {
        reader: BufReader<Instrument>,
        timeout: Option<Duration>,
        // Keeps the session manager alive as long as the instrument.
        _rm: DefaultRM,
    }

    impl VisaTransport {
        /// Open a resource string such as `USB0::0x1AB1::0x04CE::DS1ZA000000000::INSTR`.
        ///
        /// `timeout` is written to the session's `VI_ATTR_TMO_VALUE`; `None`
        /// waits forever.
        pub fn open(resource: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
            let rm = DefaultRM::new().map_err(std::io::Error::from)?;
            let name = CString::new(resource)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            let instrument = rm
                .open(&name.into(), AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)
                .map_err(std::io::Error::from)?;
            log::debug!("Opened VISA resource {}", resource);

            let mut transport = Self {
                reader: BufReader::new(instrument),
                timeout: None,
                _rm: rm,
            };
            transport.set_timeout(timeout)?;
            Ok(transport)
        }
    }

    impl Transport for VisaTransport {
        fn write(&mut self, command: &str) -> Result<(), TransportError> {
            log::trace!("> {}", command);
            self.reader
                .get_mut()
                .write_all(format!("{command}\n").as_bytes())?;
            Ok(())
        }

        fn read_text(&mut self) -> Result<String, TransportError> {
            let reply = String::from_utf8(read_line(&mut self.reader)?)?;
            log::trace!("< {}", reply);
            Ok(reply)
        }

        fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
            read_message(&mut self.reader, max_bytes)
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }

        fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
            let ms = visa_timeout_ms(timeout);
            let value = AttrTmoValue::new_checked(ms).ok_or_else(|| {
                std::io::Error::new(ErrorKind::InvalidInput, format!("VISA timeout {ms} ms"))
            })?;
            self.reader
                .get_ref()
                .set_attr(value)
                .map_err(std::io::Error::from)?;
            log::debug!("VISA timeout set to {ms} ms");
            self.timeout = timeout;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_line_strips_terminator() {
        let mut reader = Cursor::new(b"RIGOL TECHNOLOGIES,DS1104Z\r\n1\n".to_vec());
        assert_eq!(read_line(&mut reader).unwrap(), b"RIGOL TECHNOLOGIES,DS1104Z");
        assert_eq!(read_line(&mut reader).unwrap(), b"1");
        assert!(matches!(
            read_line(&mut reader),
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_read_message_keeps_newlines_inside_block() {
        let mut reader = Cursor::new(b"#14\n\n\n\n\n1.0\n".to_vec());
        let message = read_message(&mut reader, 64).unwrap();
        assert_eq!(message, b"#14\n\n\n\n\n");
        // the next message starts cleanly after the block terminator
        assert_eq!(read_line(&mut reader).unwrap(), b"1.0");
    }

    #[test]
    fn test_read_message_enforces_limit() {
        let mut reader = Cursor::new(b"#210abcdefghij\n".to_vec());
        assert!(matches!(
            read_message(&mut reader, 8),
            Err(TransportError::ResponseTooLarge { limit: 8, actual: 15 })
        ));
    }

    #[test]
    fn test_read_message_plain_line() {
        let mut reader = Cursor::new(b"0,1,1200\n".to_vec());
        assert_eq!(read_message(&mut reader, 64).unwrap(), b"0,1,1200");
    }

    #[test]
    fn test_read_message_bad_header() {
        let mut reader = Cursor::new(b"#x123\n".to_vec());
        assert!(matches!(
            read_message(&mut reader, 64),
            Err(TransportError::Framing(_))
        ));
    }

    #[test]
    fn test_visa_timeout_values() {
        assert_eq!(visa_timeout_ms(None), VISA_TMO_INFINITE);
        assert_eq!(visa_timeout_ms(Some(Duration::from_secs(2))), 2000);
        assert_eq!(visa_timeout_ms(Some(Duration::ZERO)), 0);
        assert_eq!(visa_timeout_ms(Some(Duration::from_micros(1))), 1);
        // a finite wait never turns into "forever"
        assert_eq!(
            visa_timeout_ms(Some(Duration::from_secs(u64::MAX))),
            VISA_TMO_INFINITE - 1
        );
    }

    #[test]
    fn test_socket_session() {
        use std::net::TcpListener;
        use std::thread;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let instrument = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut received = Vec::new();

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            received.push(line.clone());
            writer
                .write_all(b"RIGOL TECHNOLOGIES,DS1054Z,DS1ZA000000001,00.04.04.SP4\n")
                .unwrap();

            line.clear();
            reader.read_line(&mut line).unwrap();
            received.push(line.clone());
            writer.write_all(b"#15\n1\n2\n\n").unwrap();

            // left unanswered, then the client hangs up
            line.clear();
            reader.read_line(&mut line).unwrap();
            received.push(line.clone());
            line.clear();
            let eof = reader.read_line(&mut line).unwrap();
            (received, eof)
        });

        let mut transport = SocketTransport::connect(addr, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(
            transport.query("*IDN?").unwrap(),
            "RIGOL TECHNOLOGIES,DS1054Z,DS1ZA000000001,00.04.04.SP4"
        );
        assert_eq!(
            transport.query_raw(":WAV:DATA?", 64).unwrap(),
            b"#15\n1\n2\n\n"
        );

        transport.set_timeout(Some(Duration::from_millis(50))).unwrap();
        assert_eq!(transport.timeout(), Some(Duration::from_millis(50)));
        assert!(matches!(
            transport.query("*OPC?"),
            Err(TransportError::Timeout)
        ));

        transport.close().unwrap();
        transport.close().unwrap();
        assert!(matches!(
            transport.write(":RUN"),
            Err(TransportError::Closed)
        ));

        let (received, eof) = instrument.join().unwrap();
        assert_eq!(received, vec!["*IDN?\n", ":WAV:DATA?\n", "*OPC?\n"]);
        assert_eq!(eof, 0);
    }
}
