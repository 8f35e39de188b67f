//! Scripted in-memory transport for tests. Compiled for this crate's own
//! tests and, for downstream crates, behind the `mock` feature.
//!
//! Replies are taken from queues first; when a queue is empty the optional
//! responder is asked, with the full list of commands written so far.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::transport::{Transport, TransportError};

/// One interaction seen by the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Write(String),
    ReadText,
    ReadRaw(usize),
    SetTimeout(Option<Duration>),
    Close,
}

type Responder = Box<dyn FnMut(&[String]) -> Option<Vec<u8>>>;

#[derive(Default)]
struct MockState {
    log: Vec<Exchange>,
    writes: Vec<String>,
    text_replies: VecDeque<String>,
    raw_replies: VecDeque<Vec<u8>>,
    responder: Option<Responder>,
    timeout: Option<Duration>,
    close_count: usize,
}

impl MockState {
    fn next_reply(&mut self, queued: Option<Vec<u8>>) -> Result<Vec<u8>, TransportError> {
        if let Some(reply) = queued {
            return Ok(reply);
        }
        let writes = &self.writes;
        self.responder
            .as_mut()
            .and_then(|respond| respond(writes))
            .ok_or(TransportError::Timeout)
    }
}

pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

/// Inspection handle that outlives the transport it was taken from.
#[derive(Clone)]
pub struct MockHandle {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::default())),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Rc::clone(&self.state),
        }
    }

    pub fn push_text(&mut self, reply: &str) -> &mut Self {
        self.state
            .borrow_mut()
            .text_replies
            .push_back(reply.to_string());
        self
    }

    pub fn push_raw(&mut self, reply: impl Into<Vec<u8>>) -> &mut Self {
        self.state.borrow_mut().raw_replies.push_back(reply.into());
        self
    }

    /// Answer reads the queues cannot, given every command written so far.
    pub fn with_responder(
        self,
        responder: impl FnMut(&[String]) -> Option<Vec<u8>> + 'static,
    ) -> Self {
        self.state.borrow_mut().responder = Some(Box::new(responder));
        self
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if state.close_count > 0 {
            return Err(TransportError::Closed);
        }
        state.log.push(Exchange::Write(command.to_string()));
        state.writes.push(command.to_string());
        Ok(())
    }

    fn read_text(&mut self) -> Result<String, TransportError> {
        let mut state = self.state.borrow_mut();
        state.log.push(Exchange::ReadText);
        let queued = state.text_replies.pop_front().map(String::into_bytes);
        let reply = state.next_reply(queued)?;
        Ok(String::from_utf8(reply)?.trim_end().to_string())
    }

    fn read_raw(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.borrow_mut();
        state.log.push(Exchange::ReadRaw(max_bytes));
        let queued = state.raw_replies.pop_front();
        let reply = state.next_reply(queued)?;
        if reply.len() > max_bytes {
            return Err(TransportError::ResponseTooLarge {
                limit: max_bytes,
                actual: reply.len(),
            });
        }
        Ok(reply)
    }

    fn timeout(&self) -> Option<Duration> {
        self.state.borrow().timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.log.push(Exchange::SetTimeout(timeout));
        state.timeout = timeout;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.log.push(Exchange::Close);
        state.close_count += 1;
        Ok(())
    }
}

impl MockHandle {
    pub fn log(&self) -> Vec<Exchange> {
        self.state.borrow().log.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.borrow().writes.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.borrow().close_count
    }

    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.log.clear();
        state.writes.clear();
    }
}
