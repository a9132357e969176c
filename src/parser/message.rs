use chrono::Local;

use crate::gmail::Message;
use crate::parser::{date, subject};
use crate::store::Note;

/// One PDF attachment reference, consumed by the download/upload step.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub size: u64,
    pub message_id: String,
}

/// A message reduced to its dashboard note plus the attachments backing it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub note: Note,
    pub attachments: Vec<Attachment>,
}

/// Reduce one Gmail message to a note stub and its PDF attachments.
/// Degrades instead of failing: a missing header or payload produces
/// placeholder values and an empty attachment list, never an error.
pub fn extract(msg: &Message) -> Extraction {
    let subject_raw = header(msg, "Subject").unwrap_or_default();
    let date_raw = header(msg, "Date").unwrap_or_default();
    let parsed = date::parse(&date_raw);

    let note = Note {
        title: subject::clean(&subject_raw),
        date: date::display(parsed),
        date_iso: Some(date::iso(parsed)),
        url: None,
        source_id: Some(msg.id.clone()),
        added_at: Some(Local::now()),
    };

    let attachments = msg
        .payload
        .as_ref()
        .map(|p| p.parts.as_slice())
        .unwrap_or_default()
        .iter()
        .filter(|part| part.filename.ends_with(".pdf"))
        .filter_map(|part| {
            let body = part.body.as_ref()?;
            Some(Attachment {
                id: body.attachment_id.clone()?,
                filename: part.filename.clone(),
                size: body.size,
                message_id: msg.id.clone(),
            })
        })
        .collect();

    Extraction { note, attachments }
}

fn header(msg: &Message, name: &str) -> Option<String> {
    msg.payload
        .as_ref()?
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}
