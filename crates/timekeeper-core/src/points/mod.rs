mod point;
mod store;

pub use point::{
    clean_label, validate_time, NotificationPoint, PointDraft, PointPatch, Urgency,
    MAX_LABEL_CHARS, MAX_POINT_MS, MIN_POINT_MS,
};
pub use store::PointStore;
