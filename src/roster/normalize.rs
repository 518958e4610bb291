use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strips diacritics: decomposes to NFD and drops every combining mark, so
/// precomposed and decomposed spellings fold the same way.
pub fn fold_accents(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparison key for student names: accents folded, upper-cased, inner
/// whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    fold_accents(name)
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comparison key for CSV headers: `ABS justifiées` and `ABSjustifiees` match.
pub fn normalize_header(header: &str) -> String {
    fold_accents(header)
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect()
}

/// `Élodie Martin` becomes `elodie_martin_bulletin`.
pub fn report_file_stem(name: &str) -> String {
    let folded = fold_accents(name).to_lowercase();
    let cleaned: String = folded
        .chars()
        .map(|c| {
            if c.is_whitespace()
                || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '_'
            } else {
                c
            }
        })
        .collect();
    let joined = cleaned
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        return "student_bulletin".to_string();
    }
    format!("{joined}_bulletin")
}
