pub mod event;
pub mod persistence;
pub mod project;

pub use event::{Event, EventId, EventParams};
pub use persistence::{EventSnapshot, PatternSnapshot};
pub use project::PatternStore;
