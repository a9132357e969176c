use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

use crate::store::Note;

/// Most notes shown in the dashboard grid; the count field still reports
/// the full store size.
pub const GRID_LIMIT: usize = 6;

static GRID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(<div id="rocketbook-container">)(.*?)(</div>\s*</div>\s*</div>\s*<footer>)"#)
        .unwrap()
});
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<div class="kpi-value" id="rocketbook-count">)(\d+)(</div>)"#).unwrap()
});
static UPDATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<span id="last-updated">)(.*?)(</span>)"#).unwrap()
});

/// The three spans of the template this binary owns. Everything outside
/// them is hand-maintained and must survive a patch byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Grid,
    Count,
    Timestamp,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Region::Grid => "note grid",
            Region::Count => "note count",
            Region::Timestamp => "last-updated timestamp",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("document is missing the {0} region")]
    RegionNotFound(Region),
}

/// Patch all three regions of the dashboard document. All or nothing: if
/// any region's markers are missing the document is returned untouched as
/// an error, so a drifted template never gets half-patched.
pub fn render(doc: &str, notes: &[Note], now: NaiveDateTime) -> Result<String, PatchError> {
    let grid = if notes.is_empty() {
        empty_state_html()
    } else {
        grid_html(notes)
    };
    let doc = splice(doc, &GRID_RE, &format!("\n{grid}\n"), Region::Grid)?;
    let doc = splice(&doc, &COUNT_RE, &notes.len().to_string(), Region::Count)?;
    let stamp = now.format("%d/%m/%Y %H:%M").to_string();
    splice(&doc, &UPDATED_RE, &stamp, Region::Timestamp)
}

/// Replace the inner span of the first match, keeping both markers verbatim.
fn splice(doc: &str, re: &Regex, replacement: &str, region: Region) -> Result<String, PatchError> {
    let caps = re.captures(doc).ok_or(PatchError::RegionNotFound(region))?;
    let inner = caps.get(2).unwrap();
    let mut out = String::with_capacity(doc.len() + replacement.len());
    out.push_str(&doc[..inner.start()]);
    out.push_str(replacement);
    out.push_str(&doc[inner.end()..]);
    Ok(out)
}

fn grid_html(notes: &[Note]) -> String {
    let items: Vec<String> = notes
        .iter()
        .take(GRID_LIMIT)
        .map(|note| {
            let url = note.url.as_deref().unwrap_or("#");
            format!(
                r#"            <a href="{url}" target="_blank" class="rocketbook-item">
                <div class="rocketbook-thumb">📝</div>
                <div class="rocketbook-info">
                    <div class="rocketbook-title">{title}</div>
                    <div class="rocketbook-date">{date}</div>
                </div>
            </a>"#,
                url = url,
                title = note.title,
                date = note.date,
            )
        })
        .collect();
    format!(
        "            <div class=\"rocketbook-grid\">\n{}\n            </div>",
        items.join("\n")
    )
}

fn empty_state_html() -> String {
    r#"            <div class="rocketbook-empty">
                <div class="rocketbook-empty-icon">📭</div>
                <div>No recent scans</div>
                <div style="font-size: 0.8rem; margin-top: 8px;">Notes sent via Rocketbook will appear here</div>
            </div>"#
        .to_string()
}
