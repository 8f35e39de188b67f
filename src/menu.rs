use std::str::FromStr;

use crate::error::ScopeError;
use crate::tokens::ScpiToken;
use crate::transport::Transport;

/// A branch of the SCPI command tree, e.g. `:CHAN2` or `:WAV`.
///
/// Every subsystem object is a thin typed wrapper around one of these. The
/// menu borrows the session transport for as long as the subsystem object
/// lives, so at most one command sequence is in flight at a time.
pub struct CommandMenu<'a> {
    transport: &'a mut dyn Transport,
    prefix: String,
}

impl<'a> CommandMenu<'a> {
    pub fn new(transport: &'a mut dyn Transport, prefix: impl Into<String>) -> Self {
        Self {
            transport,
            prefix: prefix.into(),
        }
    }

    /// A sub-branch sharing the same transport, e.g. `:TIM` -> `:TIM:DEL`.
    pub fn branch(&mut self, suffix: &str) -> CommandMenu<'_> {
        let prefix = format!("{}{}", self.prefix, suffix);
        self.branch_from(&prefix)
    }

    /// A menu at the top of the command tree on the same transport.
    pub fn root(&mut self) -> CommandMenu<'_> {
        self.branch_from("")
    }

    fn branch_from(&mut self, prefix: &str) -> CommandMenu<'_> {
        CommandMenu {
            transport: &mut *self.transport,
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full(&self, command: &str) -> String {
        format!("{}{}", self.prefix, command)
    }

    pub fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        let full = self.full(command);
        self.transport.write(&full)?;
        Ok(())
    }

    /// Send a query and return the trimmed reply.
    pub fn ask(&mut self, command: &str) -> Result<String, ScopeError> {
        let full = self.full(command);
        let reply = self.transport.query(&full)?;
        Ok(reply.trim().to_string())
    }

    pub fn ask_raw(&mut self, command: &str, max_bytes: usize) -> Result<Vec<u8>, ScopeError> {
        let full = self.full(command);
        Ok(self.transport.query_raw(&full, max_bytes)?)
    }

    /// Query and parse with `FromStr`, reporting the command on failure.
    pub fn ask_parse<V: FromStr>(&mut self, command: &str) -> Result<V, ScopeError> {
        let reply = self.ask(command)?;
        reply
            .parse()
            .map_err(|_| ScopeError::unexpected(&self.full(command), &reply))
    }

    pub fn ask_f64(&mut self, command: &str) -> Result<f64, ScopeError> {
        self.ask_parse(command)
    }

    /// Integers are sometimes reported in NR3 form (`1.200000e+03`).
    pub fn ask_i64(&mut self, command: &str) -> Result<i64, ScopeError> {
        let reply = self.ask(command)?;
        parse_integer(&reply).ok_or_else(|| ScopeError::unexpected(&self.full(command), &reply))
    }

    pub fn ask_bool(&mut self, command: &str) -> Result<bool, ScopeError> {
        let reply = self.ask(command)?;
        match reply.to_ascii_uppercase().as_str() {
            "1" | "ON" => Ok(true),
            "0" | "OFF" => Ok(false),
            _ => Err(ScopeError::unexpected(&self.full(command), &reply)),
        }
    }

    pub fn ask_token<E: ScpiToken>(&mut self, command: &str) -> Result<E, ScopeError> {
        let reply = self.ask(command)?;
        E::from_scpi(&reply).ok_or_else(|| ScopeError::unexpected(&self.full(command), &reply))
    }

    pub fn write_bool(&mut self, command: &str, value: bool) -> Result<(), ScopeError> {
        self.write(&format!("{} {}", command, u8::from(value)))
    }

    pub fn write_token<E: ScpiToken>(&mut self, command: &str, value: E) -> Result<(), ScopeError> {
        self.write(&format!("{} {}", command, value.as_scpi()))
    }

    pub fn write_nr3(&mut self, command: &str, value: f64) -> Result<(), ScopeError> {
        self.write(&format!("{} {}", command, nr3(value, 4)))
    }
}

/// Format as an SCPI NR3 number, `1.2500e-03`.
pub fn nr3(value: f64, precision: usize) -> String {
    let formatted = format!("{value:.precision$e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        // inf / NaN have no exponent
        None => formatted,
    }
}

fn parse_integer(reply: &str) -> Option<i64> {
    if let Ok(v) = reply.parse::<i64>() {
        return Some(v);
    }
    let v: f64 = reply.parse().ok()?;
    // 2^63 itself is already out of range
    let limit = 2f64.powi(63);
    (v.fract() == 0.0 && (-limit..limit).contains(&v)).then_some(v as i64)
}
