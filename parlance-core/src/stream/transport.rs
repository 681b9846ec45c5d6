// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Trait
//!
//! Platform-agnostic abstraction for the duplex byte stream a session runs
//! over, and the plain-or-TLS wrapper the negotiator upgrades in place.
//!
//! # Cancellation
//!
//! Negotiation blocks on reads. Closing the transport from another thread
//! (for a TCP socket, via a `try_clone` handle) unblocks a pending read with an
//! end-of-stream condition.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use rustls::{ClientConnection, StreamOwned};

/// A duplex byte stream.
///
/// Deadlines are the transport's concern; set them before negotiating.
pub trait Transport: Read + Write + Send {
    /// Closes both directions of the stream.
    ///
    /// Safe to call more than once.
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// A transport that may have been upgraded to TLS.
pub enum SecureStream<T: Transport> {
    /// Plaintext stream.
    Plain(T),
    /// TLS session over the original transport.
    Tls(Box<StreamOwned<ClientConnection, T>>),
}

impl<T: Transport> SecureStream<T> {
    /// Wraps a fresh, unencrypted transport.
    pub fn plain(transport: T) -> Self {
        SecureStream::Plain(transport)
    }

    /// Returns true if TLS is active.
    pub fn is_secure(&self) -> bool {
        matches!(self, SecureStream::Tls(_))
    }

    /// Returns the underlying transport.
    pub fn get_ref(&self) -> &T {
        match self {
            SecureStream::Plain(t) => t,
            SecureStream::Tls(tls) => tls.get_ref(),
        }
    }

    /// Returns the TLS connection state, if TLS is active.
    pub fn tls_connection(&self) -> Option<&ClientConnection> {
        match self {
            SecureStream::Plain(_) => None,
            SecureStream::Tls(tls) => Some(&tls.conn),
        }
    }

    /// Sends a TLS close_notify (if applicable) and closes the transport.
    pub fn close(&mut self) -> io::Result<()> {
        match self {
            SecureStream::Plain(t) => t.close(),
            SecureStream::Tls(tls) => {
                tls.conn.send_close_notify();
                // Best effort: the peer may already be gone.
                let _ = tls.flush();
                tls.sock.close()
            }
        }
    }
}

impl<T: Transport> Read for SecureStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SecureStream::Plain(t) => t.read(buf),
            SecureStream::Tls(tls) => tls.read(buf),
        }
    }
}

impl<T: Transport> Write for SecureStream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SecureStream::Plain(t) => t.write(buf),
            SecureStream::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SecureStream::Plain(t) => t.flush(),
            SecureStream::Tls(tls) => tls.flush(),
        }
    }
}

impl<T: Transport> std::fmt::Debug for SecureStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecureStream::Plain(_) => f.write_str("SecureStream::Plain"),
            SecureStream::Tls(_) => f.write_str("SecureStream::Tls"),
        }
    }
}
