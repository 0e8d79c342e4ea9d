//! Build an argv from a command template and a displayed table row.

/// Expand `{N}` placeholders in `template` with column `N` (0-based) of
/// `row`, then split into an argv.
///
/// Returns an empty argv if any placeholder is out of range. A template
/// without placeholders is split as-is.
pub fn expand_row_command(row: &str, template: &str) -> Vec<String> {
    let columns: Vec<&str> = row.split_whitespace().collect();

    template
        .split_whitespace()
        .map(|token| match placeholder(token) {
            Some(index) => columns.get(index).map(|c| c.to_string()),
            None => Some(token.to_string()),
        })
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

fn placeholder(token: &str) -> Option<usize> {
    token.strip_prefix('{')?.strip_suffix('}')?.parse().ok()
}
