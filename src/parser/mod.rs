pub mod date;
pub mod message;
pub mod subject;

pub use message::{extract, Attachment, Extraction};
