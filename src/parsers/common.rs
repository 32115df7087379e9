/// Discourse rejects topic titles longer than this.
pub const MAX_TITLE_LEN: usize = 255;

/// Derive a Discourse topic `(title, body)` from a chat message text.
///
/// The title is the first non-empty line of `text`, falling back to the
/// first line (or the whole text) when every line is blank. A title longer
/// than [`MAX_TITLE_LEN`] characters is cut to 252 and suffixed with `...`.
/// The body is the (possibly trimmed) title, a blank line, and the full
/// original text — truncation never drops message content.
pub fn make_title_and_body(text: &str) -> (String, String) {
    if text.is_empty() {
        return (String::new(), String::new());
    }

    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .or_else(|| text.lines().next())
        .unwrap_or(text);

    let title = if first_line.chars().count() <= MAX_TITLE_LEN {
        first_line.to_string()
    } else {
        let mut trimmed: String = first_line.chars().take(MAX_TITLE_LEN - 3).collect();
        trimmed.push_str("...");
        trimmed
    };

    let body = format!("{title}\n\n{text}");
    (title, body)
}

/// Parent space of a thread resource name:
/// `spaces/AAA/threads/TTT` → `spaces/AAA`.
pub fn space_of_thread(thread_name: &str) -> String {
    thread_name
        .split('/')
        .take(2)
        .collect::<Vec<_>>()
        .join("/")
}

/// Last path segment of a resource name (`users/123456` → `123456`).
pub fn resource_suffix(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::{make_title_and_body, resource_suffix, space_of_thread};

    #[test]
    fn title_from_first_non_empty_line() {
        let text = "\n\nTitle line\nThis is the body\nMore body";
        let (title, body) = make_title_and_body(text);
        assert_eq!(title, "Title line");
        assert!(body.starts_with("Title line\n\n"));
        assert!(body.contains("This is the body"));
    }

    #[test]
    fn title_truncation_long_first_line() {
        let long_line = "A".repeat(300);
        let text = format!("{long_line}\nrest of message");
        let (title, body) = make_title_and_body(&text);
        assert_eq!(title.chars().count(), 255);
        assert!(title.ends_with("..."));
        assert!(body.starts_with(&format!("{title}\n\n")));
        assert!(body.contains("rest of message"));
    }

    #[test]
    fn empty_text_returns_empty_title_and_body() {
        let (title, body) = make_title_and_body("");
        assert_eq!(title, "");
        assert_eq!(body, "");
    }

    #[test]
    fn whitespace_only_lines() {
        let text = "\n   \n\t\n";
        let (title, body) = make_title_and_body(text);
        assert_eq!(title, "");
        assert_eq!(body, format!("\n\n{text}"));
    }

    #[test]
    fn single_line_without_newline() {
        let (title, body) = make_title_and_body("hello world");
        assert_eq!(title, "hello world");
        assert_eq!(body, "hello world\n\nhello world");
    }

    #[test]
    fn space_of_thread_takes_first_two_segments() {
        assert_eq!(
            space_of_thread("spaces/AAA/threads/TTT"),
            "spaces/AAA"
        );
        assert_eq!(space_of_thread("spaces/AAA"), "spaces/AAA");
    }

    #[test]
    fn resource_suffix_takes_last_segment() {
        assert_eq!(resource_suffix("users/123456789"), "123456789");
        assert_eq!(resource_suffix("plain"), "plain");
    }
}
