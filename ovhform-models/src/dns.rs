//! DNS zone records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Presence;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    #[default]
    A,
    Aaaa,
    Caa,
    Cname,
    Dkim,
    Dmarc,
    Dname,
    Loc,
    Mx,
    Naptr,
    Ns,
    Ptr,
    Spf,
    Srv,
    Sshfp,
    Tlsa,
    Txt,
}

impl DnsRecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Caa => "CAA",
            Self::Cname => "CNAME",
            Self::Dkim => "DKIM",
            Self::Dmarc => "DMARC",
            Self::Dname => "DNAME",
            Self::Loc => "LOC",
            Self::Mx => "MX",
            Self::Naptr => "NAPTR",
            Self::Ns => "NS",
            Self::Ptr => "PTR",
            Self::Spf => "SPF",
            Self::Srv => "SRV",
            Self::Sshfp => "SSHFP",
            Self::Tlsa => "TLSA",
            Self::Txt => "TXT",
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired record. `(domain, sub_name, record_type)` does not identify a
/// single record: several records may share it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DnsRecordDesc {
    /// Zone name
    pub domain: String,
    /// Sub-domain part; empty for the apex
    #[serde(alias = "name")]
    pub sub_name: String,
    #[serde(default)]
    pub record_type: DnsRecordType,
    pub target: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub state: Presence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecord {
    pub id: u64,
    pub field_type: String,
    #[serde(default)]
    pub sub_domain: String,
    pub target: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub zone: Option<String>,
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IN {} {}", self.sub_domain, self.field_type, self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub field_type: DnsRecordType,
    pub sub_domain: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_renders_as_zone_line() {
        let record: DnsRecord = serde_json::from_str(
            r#"{"id": 42, "fieldType": "MX", "subDomain": "mail", "target": "10 mx1.example.com.", "ttl": 0, "zone": "example.com"}"#,
        )
        .unwrap();
        assert_eq!(record.to_string(), "mail IN MX 10 mx1.example.com.");
    }

    #[test]
    fn test_record_type_spelling() {
        let parsed: DnsRecordType = serde_json::from_str("\"AAAA\"").unwrap();
        assert_eq!(parsed, DnsRecordType::Aaaa);
        assert_eq!(DnsRecordType::Sshfp.to_string(), "SSHFP");
    }
}
