// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! XML Stream Framing
//!
//! Splits an XMPP byte stream into frames: the opening `<stream:stream>`
//! header, complete top-level elements, and the closing tag. Bytes are buffered
//! until a whole frame is available, then parsed into a small [`Element`] tree
//! with prefixes resolved against the stream header's declarations.

use std::io::Read;

use quick_xml::errors::{IllFormedError, SyntaxError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::{Phase, StreamError, StreamResult};

pub const NS_STREAM: &str = "http://etherx.jabber.org/streams";
pub const NS_CLIENT: &str = "jabber:client";
pub const NS_TLS: &str = "urn:ietf:params:xml:ns:xmpp-tls";
pub const NS_SASL: &str = "urn:ietf:params:xml:ns:xmpp-sasl";
pub const NS_BIND: &str = "urn:ietf:params:xml:ns:xmpp-bind";
pub const NS_STREAM_ERRORS: &str = "urn:ietf:params:xml:ns:xmpp-streams";

/// Largest frame accepted before the stream is treated as malformed.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const READ_CHUNK: usize = 4096;

/// The request sent to begin a STARTTLS upgrade.
pub const STARTTLS_REQUEST: &str = "<starttls xmlns='urn:ietf:params:xml:ns:xmpp-tls'/>";

/// Renders the opening stream header addressed to `domain`.
pub fn stream_header(domain: &str) -> String {
    format!(
        "<?xml version='1.0'?><stream:stream to='{}' xmlns='{}' xmlns:stream='{}' version='1.0'>\n",
        quick_xml::escape::escape(domain),
        NS_CLIENT,
        NS_STREAM
    )
}

/// Renders a SASL `<auth/>` element carrying an already-encoded payload.
pub fn sasl_auth(mechanism: &str, payload_b64: &str) -> String {
    format!(
        "<auth xmlns='{}' mechanism='{}'>{}</auth>",
        NS_SASL,
        quick_xml::escape::escape(mechanism),
        payload_b64
    )
}

/// Renders a resource-binding IQ.
pub fn bind_request(id: &str, resource: Option<&str>) -> String {
    let resource = match resource {
        Some(r) => format!("<resource>{}</resource>", quick_xml::escape::escape(r)),
        None => String::new(),
    };
    format!(
        "<iq type='set' id='{}'><bind xmlns='{}'>{}</bind></iq>",
        quick_xml::escape::escape(id),
        NS_BIND,
        resource
    )
}

/// A parsed element with its namespace resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Local name, without prefix.
    pub name: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Attributes other than namespace declarations, in document order.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated, unescaped character data.
    pub text: String,
}

impl Element {
    /// Returns true if this element has the given local name and namespace.
    pub fn is(&self, name: &str, namespace: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first child with the given name and namespace.
    pub fn child(&self, name: &str, namespace: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(name, namespace))
    }

    /// Returns the first child with the given local name, any namespace.
    pub fn child_named(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// The server's opening stream header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamHeader {
    pub attrs: Vec<(String, String)>,
    scope: Scope,
}

impl StreamHeader {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the stream id assigned by the server.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }
}

/// One unit read off the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    StreamOpen(StreamHeader),
    Element(Element),
    StreamClose,
}

/// Prefix to namespace bindings in effect; `""` is the default namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Scope(Vec<(String, String)>);

impl Scope {
    fn resolve(&self, prefix: &str) -> Option<String> {
        self.0
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.clone())
    }
}

/// Buffers stream bytes and yields complete frames.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
    scope: Scope,
    partial: Partial,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads until one complete frame is available.
    ///
    /// A clean close by the peer is reported as [`StreamError::EndOfStream`],
    /// even if a partial frame was buffered. Malformed XML is a
    /// [`StreamError::Protocol`] error.
    pub fn read_frame<R: Read>(&mut self, source: &mut R, phase: Phase) -> StreamResult<Frame> {
        loop {
            if let Some((frame, used)) = parse_frame(&self.buf, &self.scope, &mut self.partial)
                .map_err(|detail| StreamError::protocol(phase, detail))?
            {
                self.buf.drain(..used);
                self.partial = Partial::default();
                if let Frame::StreamOpen(header) = &frame {
                    self.scope = header.scope.clone();
                }
                return Ok(frame);
            }

            if self.buf.len() > MAX_FRAME_SIZE {
                return Err(StreamError::protocol(phase, "frame exceeds maximum size"));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = match source.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::io(phase, e)),
            };
            if n == 0 {
                return Err(StreamError::EndOfStream(phase));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Returns true if non-whitespace bytes are buffered but not yet consumed.
    pub fn has_pending_data(&self) -> bool {
        self.buf.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Forgets buffered bytes and namespace scope, for a stream restart.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scope = Scope::default();
        self.partial = Partial::default();
    }
}

#[derive(Debug)]
struct Open {
    element: Element,
    qname: String,
    raw_text: String,
    scope: Scope,
}

/// Progress through a frame that is not complete yet.
#[derive(Debug, Default)]
struct Partial {
    /// Elements opened but not yet closed, outermost first.
    stack: Vec<Open>,
    /// Bytes at the front of the buffer already folded into `stack`.
    consumed: usize,
}

/// Attempts to parse one frame from the front of `buf`, resuming after the
/// bytes `partial` already accounts for.
///
/// Returns `Ok(None)` when more bytes are needed; `partial` then records how
/// far parsing got. Returned frame lengths count from the start of `buf`.
fn parse_frame(
    buf: &[u8],
    base: &Scope,
    partial: &mut Partial,
) -> Result<Option<(Frame, usize)>, String> {
    let start = partial.consumed;
    let mut reader = Reader::from_reader(&buf[start..]);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    loop {
        let event = reader.read_event();
        let position = start + reader.buffer_position() as usize;

        match event {
            Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::Comment(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Start(e)) => {
                let parent = partial.stack.last().map(|o| &o.scope).unwrap_or(base);
                let (qname, element, scope) = open_element(&e, parent)?;

                if partial.stack.is_empty() && element.name == "stream" {
                    let header = StreamHeader {
                        attrs: element.attrs,
                        scope,
                    };
                    return Ok(Some((Frame::StreamOpen(header), position)));
                }

                partial.stack.push(Open {
                    element,
                    qname,
                    raw_text: String::new(),
                    scope,
                });
            }
            Ok(Event::Empty(e)) => {
                let parent = partial.stack.last().map(|o| &o.scope).unwrap_or(base);
                let (_, element, _) = open_element(&e, parent)?;
                match partial.stack.last_mut() {
                    Some(open) => open.element.children.push(element),
                    None => return Ok(Some((Frame::Element(element), position))),
                }
            }
            Ok(Event::Text(t)) => {
                let text = match std::str::from_utf8(&t) {
                    Ok(text) => text,
                    // A multi-byte character split across reads.
                    Err(e) if e.error_len().is_none() && position == buf.len() => return Ok(None),
                    Err(e) => return Err(e.to_string()),
                };
                if let Some(open) = partial.stack.last_mut() {
                    open.raw_text.push_str(text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(open) = partial.stack.last_mut() {
                    let text = std::str::from_utf8(&c).map_err(|e| e.to_string())?;
                    open.element.text.push_str(text);
                }
            }
            Ok(Event::End(e)) => {
                let qname = utf8(e.name().as_ref())?;
                let Some(mut open) = partial.stack.pop() else {
                    if local_name(&qname) == "stream" {
                        return Ok(Some((Frame::StreamClose, position)));
                    }
                    return Err(format!("unexpected closing tag </{}>", qname));
                };
                if open.qname != qname {
                    return Err(format!(
                        "mismatched closing tag: expected </{}>, found </{}>",
                        open.qname, qname
                    ));
                }

                let text = quick_xml::escape::unescape(&open.raw_text).map_err(|e| e.to_string())?;
                open.element.text.push_str(&text);

                match partial.stack.last_mut() {
                    Some(parent) => parent.element.children.push(open.element),
                    None => return Ok(Some((Frame::Element(open.element), position))),
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(quick_xml::Error::Syntax(e))
                if cut_off(&e, start + reader.error_position() as usize, buf.len()) =>
            {
                return Ok(None)
            }
            Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(_))) => return Ok(None),
            Err(e) => return Err(e.to_string()),
        }

        partial.consumed = position;
    }
}

/// Returns true if a syntax error at `at` only means the markup there is not
/// complete within `len` bytes.
fn cut_off(err: &SyntaxError, at: usize, len: usize) -> bool {
    match err {
        // `<!` with nothing after it yet.
        SyntaxError::InvalidBangMarkup => at + 2 >= len,
        // Unclosed markup is only reported on reaching the end of input.
        _ => true,
    }
}

/// Builds an element from a start tag, returning its qualified name and scope.
fn open_element(e: &BytesStart<'_>, parent: &Scope) -> Result<(String, Element, Scope), String> {
    let qname = utf8(e.name().as_ref())?;
    let mut scope = parent.clone();
    let mut attrs = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();

        if key == "xmlns" {
            scope.0.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.0.push((prefix.to_string(), value));
        } else {
            attrs.push((key, value));
        }
    }

    let (prefix, name) = match qname.split_once(':') {
        Some((prefix, name)) => (prefix, name),
        None => ("", qname.as_str()),
    };
    let element = Element {
        name: name.to_string(),
        namespace: scope.resolve(prefix),
        attrs,
        children: Vec::new(),
        text: String::new(),
    };

    Ok((qname.clone(), element, scope))
}

fn local_name(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

fn utf8(bytes: &[u8]) -> Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}
