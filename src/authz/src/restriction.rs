//! Authentication restrictions
//!
//! Restrictions nest three levels deep:
//!
//! - [`RestrictionSet`]: one `{clientSource, serverAddress}` entry. Every
//!   list present must admit the connection.
//! - [`RestrictionDocument`]: the array stored on one user or role. Every
//!   set must hold.
//! - [`RestrictionDocuments`]: documents accumulated across a role closure.
//!   Any one document holding is enough; an empty list is unrestricted.

use crate::error::{AuthzError, Result};
use ipnet::IpNet;
use serde_json::{Map, Value};
use std::net::IpAddr;

const CLIENT_SOURCE: &str = "clientSource";
const SERVER_ADDRESS: &str = "serverAddress";

/// Address constraints from one restriction entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionSet {
    client_source: Option<Vec<IpNet>>,
    server_address: Option<Vec<IpNet>>,
}

impl RestrictionSet {
    pub fn new(client_source: Option<Vec<IpNet>>, server_address: Option<Vec<IpNet>>) -> Self {
        Self {
            client_source,
            server_address,
        }
    }

    /// Parse `{clientSource: [...], serverAddress: [...]}`
    pub fn parse(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            AuthzError::BadValue(format!("Authentication restriction must be a document, got {}", value))
        })?;

        let mut set = Self::default();
        for (field, addresses) in obj {
            match field.as_str() {
                CLIENT_SOURCE => set.client_source = Some(parse_address_list(field, addresses)?),
                SERVER_ADDRESS => set.server_address = Some(parse_address_list(field, addresses)?),
                other => {
                    return Err(AuthzError::BadValue(format!(
                        "Unknown field in authentication restriction: {}",
                        other
                    )))
                }
            }
        }
        Ok(set)
    }

    pub fn is_satisfied_by(&self, client: IpAddr, server: IpAddr) -> bool {
        let admits = |nets: &Option<Vec<IpNet>>, addr: IpAddr| match nets {
            Some(nets) => nets.iter().any(|net| net.contains(&addr)),
            None => true,
        };
        admits(&self.client_source, client) && admits(&self.server_address, server)
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(nets) = &self.client_source {
            obj.insert(CLIENT_SOURCE.to_string(), address_list_value(nets));
        }
        if let Some(nets) = &self.server_address {
            obj.insert(SERVER_ADDRESS.to_string(), address_list_value(nets));
        }
        Value::Object(obj)
    }
}

fn parse_address_list(field: &str, value: &Value) -> Result<Vec<IpNet>> {
    let entries = value.as_array().ok_or_else(|| {
        AuthzError::BadValue(format!("'{}' must be an array of addresses, got {}", field, value))
    })?;

    entries
        .iter()
        .map(|entry| {
            let text = entry.as_str().ok_or_else(|| {
                AuthzError::BadValue(format!("'{}' entries must be strings, got {}", field, entry))
            })?;
            parse_address(text)
        })
        .collect()
}

fn parse_address(text: &str) -> Result<IpNet> {
    if let Ok(net) = text.parse::<IpNet>() {
        return Ok(net);
    }
    let invalid = || AuthzError::BadValue(format!("Invalid address or CIDR range: {}", text));
    let addr = text.parse::<IpAddr>().map_err(|_| invalid())?;
    let host_prefix = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, host_prefix).map_err(|_| invalid())
}

fn address_list_value(nets: &[IpNet]) -> Value {
    Value::Array(
        nets.iter()
            .map(|net| {
                if net.prefix_len() == net.max_prefix_len() {
                    Value::String(net.addr().to_string())
                } else {
                    Value::String(net.to_string())
                }
            })
            .collect(),
    )
}

/// One stored `authenticationRestrictions` array; all sets must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionDocument {
    sets: Vec<RestrictionSet>,
}

impl RestrictionDocument {
    pub fn new(sets: Vec<RestrictionSet>) -> Self {
        Self { sets }
    }

    /// Parse an `authenticationRestrictions` array
    pub fn parse(value: &Value) -> Result<Self> {
        let entries = value.as_array().ok_or_else(|| {
            AuthzError::UnsupportedFormat(format!(
                "'authenticationRestrictions' must be an array, got {}",
                value
            ))
        })?;
        let sets = entries.iter().map(RestrictionSet::parse).collect::<Result<Vec<_>>>()?;
        Ok(Self { sets })
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets(&self) -> &[RestrictionSet] {
        &self.sets
    }

    pub fn is_satisfied_by(&self, client: IpAddr, server: IpAddr) -> bool {
        self.sets.iter().all(|set| set.is_satisfied_by(client, server))
    }

    pub fn validate(&self, client: IpAddr, server: IpAddr) -> Result<()> {
        if self.is_satisfied_by(client, server) {
            Ok(())
        } else {
            Err(AuthzError::AuthenticationRestrictionUnmet(format!(
                "client {} / server {} rejected by {}",
                client,
                server,
                self.to_value()
            )))
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.sets.iter().map(RestrictionSet::to_value).collect())
    }
}

/// Restriction documents accumulated across roles; any one must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionDocuments {
    documents: Vec<RestrictionDocument>,
}

impl RestrictionDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one more alternative
    pub fn push(&mut self, document: RestrictionDocument) {
        self.documents.push(document);
    }

    pub fn extend(&mut self, other: RestrictionDocuments) {
        self.documents.extend(other.documents);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestrictionDocument> {
        self.documents.iter()
    }

    pub fn is_satisfied_by(&self, client: IpAddr, server: IpAddr) -> bool {
        self.documents.is_empty() || self.documents.iter().any(|doc| doc.is_satisfied_by(client, server))
    }

    pub fn validate(&self, client: IpAddr, server: IpAddr) -> Result<()> {
        if self.is_satisfied_by(client, server) {
            Ok(())
        } else {
            Err(AuthzError::AuthenticationRestrictionUnmet(format!(
                "client {} / server {} matched none of {} restriction documents",
                client,
                server,
                self.documents.len()
            )))
        }
    }

    /// Array of restriction arrays
    pub fn to_value(&self) -> Value {
        Value::Array(self.documents.iter().map(RestrictionDocument::to_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_set_parse_and_check() {
        let set = RestrictionSet::parse(&json!({
            "clientSource": ["10.0.0.0/8", "192.168.1.7"],
            "serverAddress": ["127.0.0.1"]
        }))
        .unwrap();

        assert!(set.is_satisfied_by(ip("10.1.2.3"), ip("127.0.0.1")));
        assert!(set.is_satisfied_by(ip("192.168.1.7"), ip("127.0.0.1")));
        assert!(!set.is_satisfied_by(ip("192.168.1.8"), ip("127.0.0.1")));
        assert!(!set.is_satisfied_by(ip("10.1.2.3"), ip("127.0.0.2")));
    }

    #[test]
    fn test_set_parse_errors() {
        assert!(RestrictionSet::parse(&json!({"clientSource": "10.0.0.1"})).is_err());
        assert!(RestrictionSet::parse(&json!({"clientSource": ["not-an-ip"]})).is_err());
        assert!(RestrictionSet::parse(&json!({"port": [27017]})).is_err());
        assert!(RestrictionSet::parse(&json!(["10.0.0.1"])).is_err());
    }

    #[test]
    fn test_document_requires_all_sets() {
        let doc = RestrictionDocument::parse(&json!([
            {"clientSource": ["10.0.0.0/8"]},
            {"serverAddress": ["127.0.0.1"]}
        ]))
        .unwrap();

        assert!(doc.is_satisfied_by(ip("10.0.0.5"), ip("127.0.0.1")));
        assert!(!doc.is_satisfied_by(ip("10.0.0.5"), ip("127.0.0.9")));
        assert!(doc.validate(ip("11.0.0.5"), ip("127.0.0.1")).is_err());
    }

    #[test]
    fn test_documents_any_of() {
        let mut docs = RestrictionDocuments::new();
        assert!(docs.is_satisfied_by(ip("1.2.3.4"), ip("127.0.0.1")));

        docs.push(RestrictionDocument::parse(&json!([{"clientSource": ["10.0.0.0/8"]}])).unwrap());
        docs.push(RestrictionDocument::parse(&json!([{"clientSource": ["172.16.0.0/12"]}])).unwrap());

        assert!(docs.is_satisfied_by(ip("10.9.9.9"), ip("127.0.0.1")));
        assert!(docs.is_satisfied_by(ip("172.16.4.4"), ip("127.0.0.1")));
        assert!(!docs.is_satisfied_by(ip("8.8.8.8"), ip("127.0.0.1")));
        assert!(docs.validate(ip("8.8.8.8"), ip("127.0.0.1")).is_err());
    }

    #[test]
    fn test_serialization_keeps_host_addresses_bare() {
        let doc = RestrictionDocument::parse(&json!([
            {"clientSource": ["10.0.0.0/8", "192.168.1.7"]}
        ]))
        .unwrap();
        assert_eq!(doc.to_value(), json!([{"clientSource": ["10.0.0.0/8", "192.168.1.7"]}]));
    }
}
