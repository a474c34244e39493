//! Wire types exchanged with the provisioning service.

use serde::{Deserialize, Serialize};

/// Body of `POST {endpoint}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionRequest {
    #[serde(rename = "AssignmentName")]
    pub assignment_name: String,
    #[serde(rename = "CourseName")]
    pub course_name: String,
    #[serde(rename = "NetIDs")]
    pub net_ids: Vec<String>,
    #[serde(rename = "Image")]
    pub image: String,
}

/// Successful provisioning outcome.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvisionResult {
    #[serde(rename = "baseURL")]
    pub base_url: String,
}

/// Body of `POST {endpoint}/delete`. One request per participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeprovisionRequest {
    #[serde(rename = "AssignmentName")]
    pub assignment_name: String,
    #[serde(rename = "CourseName")]
    pub course_name: String,
    /// The provisioner reads the single participant under the `NetIDs` key.
    #[serde(rename = "NetIDs")]
    pub net_id: String,
}
