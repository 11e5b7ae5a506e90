//! Who may move a request from which status to which.
//!
//! The policy is the `POLICY` table below; everything else reads it. Adding an
//! edge to the workflow means adding a row here and nothing else.

use crate::db::models::requests::Status;
use crate::db::models::user::Role;

/// `(role, from) -> allowed targets`. Pairs not listed allow nothing.
const POLICY: &[(Role, Status, &[Status])] = &[
    (
        Role::Inspector,
        Status::SentToInspector,
        &[Status::SentToContractor, Status::Rejected],
    ),
    (
        Role::Contractor,
        Status::SentToContractor,
        &[Status::AwaitingFinalPhoto, Status::Pending],
    ),
    (
        Role::Contractor,
        Status::Pending,
        &[Status::AwaitingFinalPhoto, Status::Pending],
    ),
    (Role::Worker, Status::AwaitingFinalPhoto, &[Status::Completed]),
];

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionDenied {
    #[error("request is {0}; no further transitions are allowed")]
    Terminal(Status),

    #[error("{role} cannot act on a request that is {from}")]
    RoleCannotAct { role: Role, from: Status },

    #[error("{role} cannot move a request from {from} to {to}")]
    TargetNotAllowed { role: Role, from: Status, to: Status },

    #[error("completing a request requires a final photo")]
    FinalPhotoMissing,

    #[error("a final photo is only accepted when completing a request, not for {0}")]
    UnexpectedFinalPhoto(Status),
}

impl TransitionDenied {
    /// Payload problems are reported as validation failures rather than as
    /// authorization failures.
    pub fn is_payload_problem(&self) -> bool {
        matches!(
            self,
            TransitionDenied::FinalPhotoMissing | TransitionDenied::UnexpectedFinalPhoto(_)
        )
    }
}

/// Targets `role` may choose while a request sits in `from`.
pub fn allowed_targets(role: Role, from: Status) -> &'static [Status] {
    POLICY
        .iter()
        .find(|(r, f, _)| *r == role && *f == from)
        .map(|(_, _, targets)| *targets)
        .unwrap_or(&[])
}

/// Graph check only; see [`authorize`] for the payload rules.
pub fn can_transition(from: Status, role: Role, to: Status) -> bool {
    allowed_targets(role, from).contains(&to)
}

/// Full decision for a requested transition, including the final photo rule.
pub fn authorize(
    from: Status,
    role: Role,
    to: Status,
    final_photo_present: bool,
) -> Result<(), TransitionDenied> {
    if from.is_terminal() {
        return Err(TransitionDenied::Terminal(from));
    }

    let targets = allowed_targets(role, from);
    if targets.is_empty() {
        return Err(TransitionDenied::RoleCannotAct { role, from });
    }
    if !targets.contains(&to) {
        return Err(TransitionDenied::TargetNotAllowed { role, from, to });
    }

    match (to, final_photo_present) {
        (Status::Completed, false) => Err(TransitionDenied::FinalPhotoMissing),
        (Status::Completed, true) => Ok(()),
        (other, true) => Err(TransitionDenied::UnexpectedFinalPhoto(other)),
        (_, false) => Ok(()),
    }
}
