use crate::block::BlockError;
use crate::transport::TransportError;
use crate::waveform::PreambleError;

/// Error returned by every command, capture and facade operation.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Unexpected reply {reply:?} to {command}")]
    UnexpectedReply { command: String, reply: String },

    #[error("Malformed data block: {0}")]
    Block(#[from] BlockError),

    #[error("Malformed waveform preamble: {0}")]
    Preamble(#[from] PreambleError),

    #[error("Retrieved {actual} points but the preamble declares {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Requested {requested} data but the instrument reports {reported}")]
    FormatMismatch {
        requested: &'static str,
        reported: &'static str,
    },

    #[error("{what} = {value} is outside {min}..={max}")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },

    #[error("Channel {0} does not exist, valid channels are 1 to 4")]
    InvalidChannel(u8),

    #[error("Operation did not complete after {polls} polls")]
    OperationIncomplete { polls: usize },

    #[error("Unsupported oscilloscope model {0}")]
    UnsupportedModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build or write waveform data: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl ScopeError {
    pub(crate) fn unexpected(command: &str, reply: &str) -> Self {
        Self::UnexpectedReply {
            command: command.to_string(),
            reply: reply.to_string(),
        }
    }

    pub(crate) fn check_range(
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), Self> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                what,
                value,
                min,
                max,
            })
        }
    }
}
