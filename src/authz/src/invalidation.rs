//! Operation-log entries observed by the invalidation listener

use crate::error::{AuthzError, Result};
use crate::types::{Document, Namespace};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Kind of write recorded in the operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    Insert,
    Update,
    Delete,
    Command,
    Noop,
}

impl OpType {
    /// One-letter oplog code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "i",
            Self::Update => "u",
            Self::Delete => "d",
            Self::Command => "c",
            Self::Noop => "n",
        }
    }
}

impl FromStr for OpType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "i" => Ok(Self::Insert),
            "u" => Ok(Self::Update),
            "d" => Ok(Self::Delete),
            "c" => Ok(Self::Command),
            "n" => Ok(Self::Noop),
            other => Err(AuthzError::BadValue(format!("Unknown oplog op type: {}", other))),
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed write
#[derive(Debug, Clone, PartialEq)]
pub struct OplogEntry {
    pub op: OpType,
    pub ns: Namespace,
    /// Inserted document, update modifier, deleted key or command body
    pub o: Document,
    /// Target of an update
    pub o2: Option<Document>,
}

impl OplogEntry {
    pub fn insert(ns: Namespace, doc: Document) -> Self {
        Self {
            op: OpType::Insert,
            ns,
            o: doc,
            o2: None,
        }
    }

    pub fn update(ns: Namespace, update: Document, target: Document) -> Self {
        Self {
            op: OpType::Update,
            ns,
            o: update,
            o2: Some(target),
        }
    }

    pub fn delete(ns: Namespace, key: Document) -> Self {
        Self {
            op: OpType::Delete,
            ns,
            o: key,
            o2: None,
        }
    }

    pub fn command(ns: Namespace, body: Document) -> Self {
        Self {
            op: OpType::Command,
            ns,
            o: body,
            o2: None,
        }
    }

    pub fn noop(ns: Namespace) -> Self {
        Self {
            op: OpType::Noop,
            ns,
            o: Document::new(),
            o2: None,
        }
    }

    /// `_id` of the document this entry touched
    ///
    /// Updates carry it in `o2`, everything else in `o`.
    pub fn document_id(&self) -> Option<&Value> {
        let source = match self.op {
            OpType::Update => self.o2.as_ref()?,
            _ => &self.o,
        };
        source.get("_id")
    }

    /// Whether this write can change what the authorization state reads
    pub fn applies_to_authz_data(&self) -> bool {
        match self.op {
            OpType::Insert | OpType::Update | OpType::Delete => self.ns.is_authz_namespace(),
            OpType::Command => self.ns.is_admin_command() || self.ns.is_authz_namespace(),
            OpType::Noop => false,
        }
    }

    /// Whether this write creates the first user or role document
    pub fn creates_privilege_document(&self) -> bool {
        self.op == OpType::Insert && (self.ns.is_users() || self.ns.is_roles())
    }
}
