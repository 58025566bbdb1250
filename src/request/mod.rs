//! Requests: the unit of change proposed for a push.
//!
//! A request carries its lifecycle state explicitly; which section of a
//! push it shows up in is always derived from that field.

mod lifecycle;
mod model;
mod state;
mod validation;

pub use lifecycle::RequestTransition;
pub use model::{L10N_ONLY_TAG, L10N_TAG, PushId, Request, RequestFields, RequestId, TagSet};
pub use state::RequestState;
pub use validation::{RequestForm, parse_review_id, parse_watchers};
