//! Durable message and attachment storage.

mod model;
mod repository;

pub(crate) use model::format_display_timestamp;
pub use model::{
    AttachmentContent, AttachmentEntry, AttachmentId, InsertOutcome, MessageId, MessageRecord,
    NewMessage, StoreStats,
};
pub use repository::MessageStore;
