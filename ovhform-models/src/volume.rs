//! Block storage volumes

use serde::{Deserialize, Serialize};

/// Status a volume reports while a detach is still in flight.
pub const VOLUME_DETACHING: &str = "detaching";

// ============================================================================
// Desired state
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VolumeState {
    #[default]
    Present,
    Absent,
    Attach,
    Detach,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum VolumeType {
    #[default]
    #[serde(rename = "classic")]
    Classic,
    #[serde(rename = "high-speed")]
    HighSpeed,
    #[serde(rename = "high-speed-gen2")]
    HighSpeedGen2,
}

impl VolumeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::HighSpeed => "high-speed",
            Self::HighSpeedGen2 => "high-speed-gen2",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeDesc {
    /// Project the volume lives in
    pub service_name: String,
    /// Volume name (correlation key)
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub region: String,
    /// Size in GB; required to create or upsize
    #[serde(default)]
    pub size_gb: Option<u32>,
    #[serde(default)]
    pub volume_type: VolumeType,
    /// Image to make the volume bootable from (best-effort lookup)
    #[serde(default)]
    pub image_name: Option<String>,
    /// Snapshot to create the volume from (best-effort lookup)
    #[serde(default)]
    pub snapshot_name: Option<String>,
    /// Instance the volume should be attached to (`attach` only)
    #[serde(default, alias = "instance_name")]
    pub attached_instance_name: Option<String>,
    /// Allow growing an existing volume to `size_gb`
    #[serde(default)]
    pub upsize: bool,
    #[serde(default)]
    pub state: VolumeState,
}

// ============================================================================
// Remote records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u32,
    /// Ids of the instances the volume is attached to
    #[serde(default)]
    pub attached_to: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Volume {
    pub fn is_detaching(&self) -> bool {
        self.status == VOLUME_DETACHING
    }
}

/// Body of a volume creation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub size: u32,
    pub region: String,
    #[serde(rename = "type")]
    pub volume_type: VolumeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_type_wire_names() {
        let parsed: VolumeType = serde_json::from_str("\"high-speed-gen2\"").unwrap();
        assert_eq!(parsed, VolumeType::HighSpeedGen2);
        assert_eq!(VolumeType::HighSpeed.as_str(), "high-speed");
    }

    #[test]
    fn test_create_request_skips_unresolved_sources() {
        let request = CreateVolumeRequest {
            name: "data".to_string(),
            description: None,
            size: 10,
            region: "GRA11".to_string(),
            volume_type: VolumeType::Classic,
            image_id: None,
            snapshot_id: Some("snap-1".to_string()),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "data",
                "size": 10,
                "region": "GRA11",
                "type": "classic",
                "snapshotId": "snap-1",
            })
        );
    }

    #[test]
    fn test_remote_volume_tolerates_missing_fields() {
        let volume: Volume =
            serde_json::from_str(r#"{"id": "v1", "name": "data", "bootable": false}"#).unwrap();
        assert!(volume.attached_to.is_empty());
        assert!(!volume.is_detaching());
    }
}
