//! Mutation safety filter
//!
//! Runs before the parser so even malformed mutating queries are rejected
//! as unsafe rather than as syntax errors. Keywords inside string literals
//! do not count.

use crate::error::{GraphError, Result};
use regex::Regex;
use std::sync::OnceLock;

const FORBIDDEN: [&str; 10] = [
    "CREATE", "DELETE", "DETACH", "MERGE", "SET", "REMOVE", "DROP", "ALTER", "CALL", "LOAD",
];

fn forbidden_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternatives = FORBIDDEN.join("|");
        Regex::new(&format!(r"(?i)\b({})\b", alternatives)).unwrap()
    })
}

/// Reject queries containing mutating keywords
pub fn check(text: &str) -> Result<()> {
    let stripped = strip_string_literals(text);
    if let Some(found) = forbidden_pattern().find(&stripped) {
        return Err(GraphError::UnsafeQuery(format!(
            "mutating keyword {} is not permitted",
            found.as_str().to_uppercase()
        )));
    }
    Ok(())
}

/// Blank out single- and double-quoted literal contents, preserving offsets
fn strip_string_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    let mut in_quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        match in_quote {
            Some(quote) => {
                if ch == '\\' {
                    // Skip the escaped character
                    out.push(' ');
                    if chars.next().is_some() {
                        out.push(' ');
                    }
                } else if ch == quote {
                    in_quote = None;
                    out.push(ch);
                } else {
                    out.push(' ');
                }
            }
            None => {
                if ch == '\'' || ch == '"' {
                    in_quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_queries_pass() {
        check("MATCH (p:Person) RETURN p.email").unwrap();
        check("MATCH (p:Person)-[:MEMBER_OF]->(t:Team) WHERE t.name = 'Eng' RETURN p.login")
            .unwrap();
    }

    #[test]
    fn mutating_keywords_are_rejected() {
        for query in [
            "MATCH (p:Person) DELETE p",
            "CREATE (p:Person {id: 'x'})",
            "MATCH (p:Person) SET p.status = 'active'",
            "MERGE (t:Team {id: 't1'})",
            "MATCH (p) DETACH DELETE p",
            "DROP INDEX person_email",
            "CALL db.labels()",
        ] {
            let err = check(query).unwrap_err();
            assert!(matches!(err, GraphError::UnsafeQuery(_)), "query: {}", query);
        }
    }

    #[test]
    fn keywords_are_matched_on_word_boundaries() {
        // "offset" contains "set"; "recreated" contains "create"
        check("MATCH (p:Person) WHERE p.department = 'offset' RETURN p.email").unwrap();
        check("MATCH (a:Application) WHERE a.label CONTAINS 'recreated' RETURN a.id").unwrap();
    }

    #[test]
    fn keywords_inside_string_literals_are_ignored() {
        check("MATCH (t:Team) WHERE t.name = 'DELETE squad' RETURN t.id").unwrap();
        check("MATCH (t:Team) WHERE t.name = \"create\" RETURN t.id").unwrap();
    }

    #[test]
    fn case_is_ignored() {
        assert!(check("match (p:Person) delete p").is_err());
        assert!(check("Match (p) Set p.x = 1").is_err());
    }
}
