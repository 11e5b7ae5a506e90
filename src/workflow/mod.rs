pub mod transitions;
pub mod visibility;

pub use transitions::{allowed_targets, authorize, can_transition, TransitionDenied};
pub use visibility::{visible_requests, Viewer};
