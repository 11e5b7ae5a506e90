//! Per-role dashboards. Display logic only: nothing here restricts reads.

use crate::db::models::requests::{ServiceRequest, Status};
use crate::db::models::user::Role;

/// The user looking at the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub id: i32,
    pub role: Role,
}

pub fn is_visible(viewer: &Viewer, request: &ServiceRequest) -> bool {
    match viewer.role {
        Role::Worker => request.requester_id == viewer.id,
        Role::Inspector => {
            matches!(request.status, Status::SentToInspector | Status::Completed)
                || request.status.is_awaiting()
        }
        Role::Contractor => matches!(
            request.status,
            Status::SentToContractor
                | Status::Pending
                | Status::AwaitingFinalPhoto
                | Status::Completed
        ),
    }
}

/// Filters `requests` down to what `viewer` sees, newest first.
pub fn visible_requests(viewer: &Viewer, requests: Vec<ServiceRequest>) -> Vec<ServiceRequest> {
    let mut visible: Vec<ServiceRequest> = requests
        .into_iter()
        .filter(|request| is_visible(viewer, request))
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    visible
}
