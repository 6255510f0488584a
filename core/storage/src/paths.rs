//! Slash-separated path helpers shared by the adapters.

/// Join a parent path and a child name, skipping empty segments.
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        collapse_separators(&format!("{}/{}", parent, child))
    }
}

/// Split a path into its parent directory and leaf name.
///
/// A path without separators is a root-level leaf: `("", path)`.
pub fn parent_and_leaf(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, leaf)) => (parent, leaf),
        None => ("", trimmed),
    }
}

/// Collapse duplicate separators: `a//b` becomes `a/b`.
pub fn collapse_separators(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_was_separator = false;
    for ch in path.chars() {
        if ch == '/' {
            if !previous_was_separator {
                collapsed.push(ch);
            }
            previous_was_separator = true;
        } else {
            collapsed.push(ch);
            previous_was_separator = false;
        }
    }
    collapsed
}
