// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Addresses
//!
//! A [`Jid`] is a contact address of the form `local@domain/resource`. The
//! bare part ([`BareJid`]) identifies the account and is the unit of trust and
//! roster membership; the [`Resource`] names one connected client instance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JidError {
    #[error("address is empty")]
    Empty,

    #[error("address has an empty domain: {0}")]
    EmptyDomain(String),

    #[error("address has an empty local part: {0}")]
    EmptyLocal(String),
}

/// The account-level part of an address, `local@domain` or just `domain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BareJid(String);

impl BareJid {
    /// Parses a bare address. Any resource suffix is dropped.
    pub fn parse(s: &str) -> Result<Self, JidError> {
        Jid::parse(s).map(|jid| jid.bare)
    }

    /// Returns the local part, if any.
    pub fn local(&self) -> Option<&str> {
        self.0.split_once('@').map(|(local, _)| local)
    }

    /// Returns the domain part.
    pub fn domain(&self) -> &str {
        match self.0.split_once('@') {
            Some((_, domain)) => domain,
            None => &self.0,
        }
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Attaches a resource, producing a full address.
    pub fn with_resource(&self, resource: Resource) -> Jid {
        Jid {
            bare: self.clone(),
            resource: Some(resource),
        }
    }
}

impl fmt::Display for BareJid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BareJid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BareJid::parse(s)
    }
}

impl TryFrom<String> for BareJid {
    type Error = JidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        BareJid::parse(&s)
    }
}

impl From<BareJid> for String {
    fn from(jid: BareJid) -> Self {
        jid.0
    }
}

/// A client-instance suffix. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource(String);

impl Resource {
    /// Creates a resource, returning `None` for an empty string.
    pub fn new(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        if s.is_empty() {
            None
        } else {
            Some(Resource(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contact address with an optional resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Jid {
    bare: BareJid,
    resource: Option<Resource>,
}

impl Jid {
    /// Parses `local@domain/resource`.
    ///
    /// The resource is everything after the first `/`; a trailing `/` with
    /// nothing after it yields no resource.
    pub fn parse(s: &str) -> Result<Self, JidError> {
        if s.is_empty() {
            return Err(JidError::Empty);
        }

        let (bare, resource) = match s.split_once('/') {
            Some((bare, resource)) => (bare, Resource::new(resource)),
            None => (s, None),
        };

        let domain = match bare.split_once('@') {
            Some((local, domain)) => {
                if local.is_empty() {
                    return Err(JidError::EmptyLocal(s.to_string()));
                }
                domain
            }
            None => bare,
        };
        if domain.is_empty() {
            return Err(JidError::EmptyDomain(s.to_string()));
        }

        Ok(Jid {
            bare: BareJid(bare.to_string()),
            resource,
        })
    }

    pub fn bare(&self) -> &BareJid {
        &self.bare
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Splits the address into its bare part and resource.
    pub fn into_parts(self) -> (BareJid, Option<Resource>) {
        (self.bare, self.resource)
    }
}

impl AsRef<BareJid> for BareJid {
    fn as_ref(&self) -> &BareJid {
        self
    }
}

impl AsRef<BareJid> for Jid {
    fn as_ref(&self) -> &BareJid {
        &self.bare
    }
}

/// An address a contact is reached at, with or without a resource.
pub trait Address: AsRef<BareJid> {
    fn resource(&self) -> Option<&Resource> {
        None
    }
}

impl Address for BareJid {}

impl Address for Jid {
    fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }
}

impl<A: Address + ?Sized> Address for &A {
    fn resource(&self) -> Option<&Resource> {
        (**self).resource()
    }
}

impl From<BareJid> for Jid {
    fn from(bare: BareJid) -> Self {
        Jid {
            bare,
            resource: None,
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "{}/{}", self.bare, resource),
            None => write!(f, "{}", self.bare),
        }
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Jid::parse(s)
    }
}
