//! Core domain types for the Foothold object graph.
//!
//! A directory snapshot is a population of [`Object`]s (users, groups,
//! computers, OUs and so on) identified by dense [`ObjectId`] handles and
//! connected by typed control edges (see [`crate::edges`]).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Integer probability in `0..=100` that an edge kind is exploitable for a
/// given ordered pair of objects.
pub type Probability = u8;

/// The maximum (certain) probability.
pub const MAX_PROBABILITY: Probability = 100;

// ── Object identity ───────────────────────────────────────────────

/// Dense handle for an object: an index into the owning store's arena.
///
/// Node identity everywhere in the engine is by handle, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The directory class of an object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    User,
    Group,
    Computer,
    ServiceAccount,
    OrganizationalUnit,
    Container,
    GroupPolicy,
    CertificateTemplate,
    Domain,
    Trust,
    Other,
}

// ── Security identifiers ──────────────────────────────────────────

/// Subauthority value that marks a SID as a domain account
/// (the `21` in `S-1-5-21-...`). Cross-domain detection keys off this.
const DOMAIN_ACCOUNT_SUBAUTHORITY: u32 = 21;

/// A Windows security identifier.
///
/// Stored structurally (revision, identifier authority, subauthorities) and
/// serialized in the usual `S-1-5-21-...` string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sid {
    revision: u8,
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    pub fn new(authority: u64, sub_authorities: Vec<u32>) -> Self {
        Self {
            revision: 1,
            authority,
            sub_authorities,
        }
    }

    /// `S-1-1-0`, the Everyone pseudo-principal.
    pub fn everyone() -> Self {
        Self::new(1, vec![0])
    }

    /// `S-1-5-11`, the Authenticated Users pseudo-principal.
    pub fn authenticated_users() -> Self {
        Self::new(5, vec![11])
    }

    /// Positional component accessor: 0 is the revision, 1 the identifier
    /// authority, 2.. the subauthorities.
    pub fn component(&self, index: usize) -> Option<u64> {
        match index {
            0 => Some(u64::from(self.revision)),
            1 => Some(self.authority),
            n => self.sub_authorities.get(n - 2).map(|&v| u64::from(v)),
        }
    }

    /// Whether this SID names a domain account (`S-1-5-21-...`).
    ///
    /// Two objects in different domains carrying the *same* domain-account
    /// SID are replicas of one principal across a forest; the engine treats
    /// such pairs as always traversable.
    pub fn is_domain_account(&self) -> bool {
        self.component(2) == Some(u64::from(DOMAIN_ACCOUNT_SUBAUTHORITY))
    }

    /// The relative identifier: the final subauthority, if any.
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-{}", self.revision, self.authority)?;
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for Sid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidSid {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.split('-');
        if parts.next().map(str::to_ascii_uppercase).as_deref() != Some("S") {
            return Err(invalid("must start with 'S-'"));
        }
        let revision = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| invalid("missing revision"))?;
        let authority = parts
            .next()
            .and_then(|p| p.parse::<u64>().ok())
            .ok_or_else(|| invalid("missing identifier authority"))?;
        let sub_authorities = parts
            .map(|p| p.parse::<u32>().map_err(|_| invalid("bad subauthority")))
            .collect::<Result<Vec<u32>, _>>()?;

        Ok(Self {
            revision,
            authority,
            sub_authorities,
        })
    }
}

impl TryFrom<String> for Sid {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Sid> for String {
    fn from(sid: Sid) -> Self {
        sid.to_string()
    }
}

// ── Objects ───────────────────────────────────────────────────────

/// A directory object: the engine's read-only view of one principal,
/// group, computer, OU, policy, etc.
///
/// Attributes are an open string-keyed map; integer-valued attributes
/// (admin counts, password ages, tier levels) are what the degree-cap
/// tiebreak sorts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub guid: Uuid,
    pub name: String,
    pub object_type: ObjectType,
    pub sid: Option<Sid>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Object {
    pub fn new(name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            object_type,
            sid: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_sid(mut self, sid: Sid) -> Self {
        self.sid = Some(sid);
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn sid(&self) -> Option<&Sid> {
        self.sid.as_ref()
    }

    /// Integer attribute lookup. JSON numbers and numeric strings both
    /// qualify; everything else is absent.
    pub fn attr_int(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)?.as_str()
    }
}
