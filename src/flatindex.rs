//! Parser for the flat key-value index format used by the candidate
//! registration index and the precomputed metadata index.
//!
//! One assignment per line: `<key>=<value>`. Lines starting with `#` or `!`
//! are comments; blank lines are ignored. Keys and values are trimmed. A
//! line with no `=` is a packaging error.

use crate::errors::ResolutionError;

/// Parse the full index text into `(key, value)` pairs in file order.
/// Repeated keys are returned as separate pairs; merge semantics belong to
/// the caller.
pub(crate) fn parse(text: &str, source: &str) -> Result<Vec<(String, String)>, ResolutionError> {
    let mut pairs = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ResolutionError::invalid_index(
                source,
                number + 1,
                "expected '<key>=<value>'",
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ResolutionError::invalid_index(source, number + 1, "empty key"));
        }
        pairs.push((key.to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}

/// Split a comma-separated value into trimmed, non-empty entries.
pub(crate) fn split_values(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments_skipping_comments_and_blanks() {
        let text = "\
# registration index
core=A,B

! legacy comment style
extra = C ,D
";
        let pairs = parse(text, "test").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("core".to_string(), "A,B".to_string()),
                ("extra".to_string(), "C ,D".to_string()),
            ]
        );
    }

    #[test]
    fn allows_empty_values() {
        let pairs = parse("marker.Processed=", "test").unwrap();
        assert_eq!(pairs, vec![("marker.Processed".to_string(), String::new())]);
    }

    #[test]
    fn rejects_lines_without_assignment() {
        let err = parse("core=A\nnot-an-assignment\n", "test").unwrap_err();
        match err {
            ResolutionError::InvalidIndex { origin, line, .. } => {
                assert_eq!(origin, "test");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_empty_keys() {
        assert!(parse("=A", "test").is_err());
    }

    #[test]
    fn split_values_trims_and_drops_empties() {
        let values: Vec<String> = split_values(" A , ,B,").collect();
        assert_eq!(values, vec!["A", "B"]);
    }
}
