//! Pushes: release cycles and the sections their requests move through.

mod aggregate;
mod model;
mod sections;

pub use aggregate::{PushAction, check_stage_env};
pub use model::{Push, PushEdit, PushStatus};
pub use sections::{InvolvedUser, SectionBoard, SectionCounts, format_involved, recipients};
