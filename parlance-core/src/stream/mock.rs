// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! Scripted in-memory transport for tests. Reads drain a fixed byte script
//! and then report end-of-stream; writes are recorded. Clones share state, so
//! a test can keep a handle after moving the transport into the negotiator.

use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use super::transport::Transport;

#[derive(Debug, Default)]
struct MockState {
    incoming: Vec<u8>,
    position: usize,
    written: Vec<u8>,
    closed: bool,
    max_read: Option<usize>,
}

/// In-memory transport for testing.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a transport that will yield `incoming` and then end-of-stream.
    pub fn new(incoming: impl Into<Vec<u8>>) -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                incoming: incoming.into(),
                ..Default::default()
            })),
        }
    }

    /// Limits each read to at most `n` bytes, to exercise partial frames.
    pub fn with_max_read(self, n: usize) -> Self {
        self.state.lock().max_read = Some(n.max(1));
        self
    }

    /// Returns everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    /// Returns everything written so far, lossily decoded.
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().written).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(0);
        }
        let remaining = state.incoming.len() - state.position;
        let mut n = remaining.min(buf.len());
        if let Some(max) = state.max_read {
            n = n.min(max);
        }
        let start = state.position;
        buf[..n].copy_from_slice(&state.incoming[start..start + n]);
        state.position += n;
        Ok(n)
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"));
        }
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn close(&mut self) -> io::Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
