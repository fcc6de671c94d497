// Path helpers for display strings.
//
// Paths arrive from the assistant backend as plain strings that may use
// either separator, so these work on `&str` rather than `std::path::Path`.

/// Returns the last component of `path`, accepting both `/` and `\`.
///
/// Trailing separators are ignored; a path with no components yields itself.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return path;
    }
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::file_name;

    #[test]
    fn extracts_last_component() {
        assert_eq!(file_name("/home/me/notes/a.md"), "a.md");
        assert_eq!(file_name("a.md"), "a.md");
        assert_eq!(file_name("C:\\docs\\draft.md"), "draft.md");
    }

    #[test]
    fn ignores_trailing_separators() {
        assert_eq!(file_name("/home/me/notes/"), "notes");
    }

    #[test]
    fn degenerate_inputs_are_returned_unchanged() {
        assert_eq!(file_name(""), "");
        assert_eq!(file_name("/"), "/");
    }
}
