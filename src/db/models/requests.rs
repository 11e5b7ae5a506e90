// src/db/models/requests.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::history::{HistoryEntry, HistoryLedger};
use super::user::Role;

/// Lifecycle state of a service request.
///
/// ```text
/// SentToInspector -> Rejected | SentToContractor
/// SentToContractor | Pending -> Pending | AwaitingFinalPhoto
/// AwaitingFinalPhoto -> Completed
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    SentToInspector,
    Rejected,
    SentToContractor,
    Pending,
    AwaitingFinalPhoto,
    Completed,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::SentToInspector,
        Status::Rejected,
        Status::SentToContractor,
        Status::Pending,
        Status::AwaitingFinalPhoto,
        Status::Completed,
    ];

    /// No role may move a request out of a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Rejected | Status::Completed)
    }

    /// Statuses where the request waits on the worker.
    pub fn is_awaiting(self) -> bool {
        matches!(self, Status::AwaitingFinalPhoto)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::SentToInspector => "sent_to_inspector",
            Status::Rejected => "rejected",
            Status::SentToContractor => "sent_to_contractor",
            Status::Pending => "pending",
            Status::AwaitingFinalPhoto => "awaiting_final_photo",
            Status::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single service order, from the worker's first photo to completion.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct ServiceRequest {
    pub id: i32,
    pub requester_id: i32,
    pub requester_name: String,
    pub initial_photo: String,
    pub final_photo: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    pub status: Status,
    #[schema(value_type = Vec<HistoryEntry>)]
    pub history: HistoryLedger,
    /// Bumped on every accepted transition; used for optimistic concurrency.
    pub version: u64,
}

impl ServiceRequest {
    /// Builds a fresh request in `SentToInspector` with its history seeded.
    pub fn open(id: i32, submission: NewServiceRequest, now: DateTime<Utc>) -> Self {
        let history = HistoryLedger::seed(HistoryEntry {
            status: Status::SentToInspector,
            actor: submission.requester_name.clone(),
            timestamp: now,
        });

        Self {
            id,
            requester_id: submission.requester_id,
            requester_name: submission.requester_name,
            initial_photo: submission.initial_photo,
            final_photo: None,
            latitude: submission.latitude,
            longitude: submission.longitude,
            address: submission.address,
            created_at: now,
            note: submission.note,
            status: Status::SentToInspector,
            history,
            version: 1,
        }
    }

    /// Records an already-authorized transition.
    pub(crate) fn record_transition(
        &mut self,
        status: Status,
        actor: &str,
        final_photo: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        if final_photo.is_some() {
            self.final_photo = final_photo;
        }
        self.history.append(HistoryEntry {
            status,
            actor: actor.to_string(),
            timestamp: now,
        });
        self.version += 1;
    }
}

/// Validated input for creating a request.
#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    pub requester_id: i32,
    pub requester_name: String,
    pub initial_photo: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub note: Option<String>,
}

/// A transition as requested by an actor whose role the caller already resolved.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub status: Status,
    pub actor_name: String,
    pub actor_role: Role,
    pub final_photo: Option<String>,
    pub expected_version: Option<u64>,
}

/// Body of `POST /requests`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    /// Site photo as a data URL or bare base64 string.
    pub photo: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Resolved server-side when absent.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body of `PATCH /requests/{id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatus {
    pub status: Status,
    #[serde(default)]
    pub final_photo: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}
