use std::sync::LazyLock;

use regex::Regex;

/// Title assigned when cleaning strips the subject down to nothing.
pub const UNTITLED: &str = "untitled note";

static REPLY_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(Fwd:|Re:|FW:|RE:)\s*").unwrap());
static BRAND_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*-\s*Rocketbook\s*$").unwrap());
static BRAND_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Rocketbook\s*-\s*").unwrap());

/// Reduce an email subject to a dashboard title: strip one leading
/// reply/forward marker, then the Rocketbook branding the app appends or
/// prepends. Each rule fires at most once and only at the anchored end;
/// the words are left alone anywhere else in the subject.
pub fn clean(subject: &str) -> String {
    let subject = REPLY_PREFIX_RE.replace(subject, "");
    let subject = BRAND_SUFFIX_RE.replace(&subject, "");
    let subject = BRAND_PREFIX_RE.replace(&subject, "");
    let subject = subject.trim();
    if subject.is_empty() {
        UNTITLED.to_string()
    } else {
        subject.to_string()
    }
}
