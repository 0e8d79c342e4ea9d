//! Parser for `ls -la` output from inside a container.

use crate::types::{DirectoryItem, ItemKind};

/// Parse `ls -la` output for the directory `parent`.
///
/// The `total` line, blank lines, `.` and `..` are dropped, as are lines
/// too short to be an entry. Directory paths end with `/`. Symlinks are
/// listed as files under their own name.
pub fn parse_directory_items(output: &str, parent: &str) -> Vec<DirectoryItem> {
    let base = parent.trim_end_matches('/');

    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_total_line(line))
        .filter_map(parse_entry)
        .filter(|(name, _)| *name != "." && *name != "..")
        .map(|(name, kind)| {
            let path = match kind {
                ItemKind::Dir => format!("{base}/{name}/"),
                ItemKind::File => format!("{base}/{name}"),
            };
            DirectoryItem {
                name: name.to_string(),
                path,
                kind,
            }
        })
        .collect()
}

fn is_total_line(line: &str) -> bool {
    line.split_whitespace().next() == Some("total")
}

/// Split one entry into its name and kind.
///
/// Columns: mode, links, owner, group, size, month, day, time, name.
/// Device files print `major, minor` in place of the size.
fn parse_entry(line: &str) -> Option<(&str, ItemKind)> {
    let mut fields = Fields(line);
    let mode = fields.next()?;
    let size = fields.nth(3)?;
    if size.ends_with(',') {
        fields.next()?;
    }
    fields.nth(2)?;
    let name = fields.rest()?;

    let name = match mode.chars().next()? {
        'l' => name.split_once(" -> ").map_or(name, |(link, _)| link),
        _ => name,
    };
    let kind = if mode.starts_with('d') {
        ItemKind::Dir
    } else {
        ItemKind::File
    };
    Some((name, kind))
}

/// Whitespace-separated fields that keep the unsplit remainder available.
struct Fields<'a>(&'a str);

impl<'a> Fields<'a> {
    fn rest(&self) -> Option<&'a str> {
        let rest = self.0.trim();
        (!rest.is_empty()).then_some(rest)
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.0.trim_start();
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.0 = &rest[end..];
        Some(&rest[..end])
    }
}
