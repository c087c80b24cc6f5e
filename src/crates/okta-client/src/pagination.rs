//! Link header pagination
//!
//! The management API paginates with `Link` headers; a response may carry
//! several, each possibly holding multiple comma-separated entries. Only
//! `rel="next"` drives pagination.

/// Extract the `rel="next"` URL from a set of Link header values
pub fn next_link(header_values: &[String]) -> Option<String> {
    for value in header_values {
        for entry in split_entries(value) {
            if let Some(url) = parse_entry(&entry) {
                return Some(url);
            }
        }
    }
    None
}

/// Split one Link header value into entries.
///
/// Commas inside `<...>` URL brackets do not separate entries.
fn split_entries(value: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;

    for ch in value.chars() {
        match ch {
            '<' => {
                in_brackets = true;
                current.push(ch);
            }
            '>' => {
                in_brackets = false;
                current.push(ch);
            }
            ',' if !in_brackets => {
                if !current.trim().is_empty() {
                    entries.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        entries.push(current.trim().to_string());
    }
    entries
}

/// Parse `<url>; rel="next"` into the URL, if the entry is a next link
fn parse_entry(entry: &str) -> Option<String> {
    let mut parts = entry.split(';');
    let url_part = parts.next()?.trim();
    let url = url_part.strip_prefix('<')?.strip_suffix('>')?;

    for param in parts {
        let param = param.trim();
        if param.eq_ignore_ascii_case("rel=\"next\"") || param.eq_ignore_ascii_case("rel=next") {
            return Some(url.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_next_from_single_header() {
        let headers = vec![
            "<https://org.okta.com/api/v1/users?after=abc&limit=100>; rel=\"next\"".to_string(),
        ];
        assert_eq!(
            next_link(&headers).unwrap(),
            "https://org.okta.com/api/v1/users?after=abc&limit=100"
        );
    }

    #[test]
    fn extracts_next_from_multi_valued_header() {
        let headers = vec![
            "<https://org.okta.com/api/v1/users?limit=100>; rel=\"self\", \
             <https://org.okta.com/api/v1/users?after=xyz&limit=100>; rel=\"next\""
                .to_string(),
        ];
        assert_eq!(
            next_link(&headers).unwrap(),
            "https://org.okta.com/api/v1/users?after=xyz&limit=100"
        );
    }

    #[test]
    fn extracts_next_from_separate_headers() {
        let headers = vec![
            "<https://org.okta.com/api/v1/users?limit=100>; rel=\"self\"".to_string(),
            "<https://org.okta.com/api/v1/users?after=def&limit=100>; rel=\"next\"".to_string(),
        ];
        assert_eq!(
            next_link(&headers).unwrap(),
            "https://org.okta.com/api/v1/users?after=def&limit=100"
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let headers = vec![
            "<https://org.okta.com/api/v1/users?limit=100>; rel=\"self\"".to_string(),
        ];
        assert!(next_link(&headers).is_none());
        assert!(next_link(&[]).is_none());
    }
}
