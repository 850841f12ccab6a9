/// Text processing utilities
pub mod text {
    /// Largest prefix of `text` no longer than `max_bytes` that ends on a
    /// char boundary.
    pub fn truncate_to_char_boundary(text: &str, max_bytes: usize) -> &str {
        if text.len() <= max_bytes {
            return text;
        }
        let mut end = max_bytes;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }

    /// Truncate text to a maximum length, trying to break at sentence boundaries
    pub fn smart_truncate(text: &str, max_length: usize) -> String {
        if text.len() <= max_length {
            return text.to_string();
        }

        let truncated = truncate_to_char_boundary(text, max_length);
        if let Some(last_sentence) = truncated.rfind('.') {
            truncated[..last_sentence + 1].to_string()
        } else if let Some(last_space) = truncated.rfind(' ') {
            format!("{}...", &truncated[..last_space])
        } else {
            format!("{}...", truncated)
        }
    }

    /// Collapse runs of whitespace into single spaces
    pub fn normalize_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Extract clean text content from HTML
    pub fn strip_html(html: &str) -> String {
        let stripped = html
            .chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => (text, false),
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0;

        normalize_whitespace(
            &stripped
                .replace("&nbsp;", " ")
                .replace("&amp;", "&")
                .replace("&quot;", "\"")
                .replace("&#39;", "'")
                .replace("&lt;", "<")
                .replace("&gt;", ">"),
        )
    }

    /// Strip markdown code fences a model may wrap around JSON
    pub fn strip_code_fences(response: &str) -> &str {
        response
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```JSON")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Extract domain from URL, without a leading `www.`
    pub fn extract_domain(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        url.domain()
            .map(|d| d.trim_start_matches("www.").to_string())
    }
}
