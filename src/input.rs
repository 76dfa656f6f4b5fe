//! Turning pasted text into target and comment lists.

/// One target per non-blank line.
pub fn parse_targets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Comments separated by blank lines; a comment may span several lines.
///
/// Text with no paragraph breaks is a single comment.
pub fn parse_comments(text: &str) -> Vec<String> {
    let mut comments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                comments.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        comments.push(current.join("\n"));
    }

    comments
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect()
}
