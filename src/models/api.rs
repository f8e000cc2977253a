use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobSpec;
use crate::services::store::{JobEntry, StoreCounts};

/// Request to start a batch for a session.
#[derive(Debug, Deserialize, Validate)]
pub struct StartRunRequest {
    #[garde(length(min = 1, max = 64), inner(length(min = 1, max = 100)))]
    pub jobs: Vec<String>,
}

/// Response after uploading a source photo.
#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
    pub content_type: &'static str,
    pub created_at: DateTime<Utc>,
}

/// Response after a batch or retry was accepted.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub session_id: Uuid,
    pub jobs: Vec<String>,
    pub message: String,
}

/// Current state of every job in a session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub running: bool,
    pub settled: bool,
    pub counts: CountsView,
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Serialize)]
pub struct CountsView {
    pub pending: usize,
    pub done: usize,
    pub error: usize,
}

impl From<StoreCounts> for CountsView {
    fn from(counts: StoreCounts) -> Self {
        Self {
            pending: counts.pending,
            done: counts.done,
            error: counts.failed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobView {
    pub name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobView {
    pub fn from_entry(session_id: Uuid, entry: &JobEntry) -> Self {
        Self {
            name: entry.name.clone(),
            status: entry.status.label(),
            image_url: entry.status.image().map(|_| {
                format!(
                    "/api/v1/sessions/{}/jobs/{}/image",
                    session_id,
                    encode_path_segment(&entry.name)
                )
            }),
            error: entry.status.error().map(str::to_string),
        }
    }
}

/// Catalog listing grouped by category.
#[derive(Debug, Serialize)]
pub struct StyleCategoryView {
    pub category: String,
    pub styles: Vec<&'static JobSpec>,
}

/// Percent-encode everything outside the unreserved URL set.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}
