//! API wire models.

use serde::{Deserialize, Serialize};

/// Response body for a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Opaque task identifier for the streaming endpoint.
    pub task_id: String,
    /// Chapter titles in segmentation order.
    pub chapters: Vec<String>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
