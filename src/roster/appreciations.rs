use std::collections::BTreeMap;

use tracing::debug;

use crate::roster::normalize::normalize_name;
use crate::roster::StudentRow;

/// Parses `NAME: comment` lines into comments keyed by normalized name.
/// Lines that do not split into exactly two parts on `:` are ignored.
pub fn parse_appreciations(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.split(':').collect();
        let [name, comment] = parts.as_slice() else {
            continue;
        };
        let key = normalize_name(name);
        let comment = comment.trim();
        if key.is_empty() || comment.is_empty() {
            continue;
        }
        out.insert(key, comment.to_string());
    }
    out
}

/// Fills each row's appreciation from `comments`; returns how many rows matched.
pub fn attach_appreciations(
    rows: &mut [StudentRow],
    comments: &BTreeMap<String, String>,
) -> usize {
    let mut matched = 0;
    for row in rows.iter_mut() {
        if let Some(comment) = comments.get(&normalize_name(&row.identity.name)) {
            row.appreciation = Some(comment.clone());
            matched += 1;
        }
    }
    debug!(matched, total = rows.len(), "appreciations attached");
    matched
}
