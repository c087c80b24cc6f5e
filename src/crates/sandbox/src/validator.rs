//! Static validation of probe programs
//!
//! Runs before any process is spawned. The checks are deliberately
//! pessimistic: a program that merely looks like it mutates, evaluates
//! code, or leaves the configured upstream host is rejected.

use crate::error::{Result, SandboxError};
use regex::Regex;
use std::sync::OnceLock;

/// Module allowlist for `import` / `from ... import`
///
/// `urllib` is present only for `urllib.parse`; `urllib.request` is caught
/// by the forbidden-construct list. `okta_client` is the project's shared
/// GET-only wrapper.
const ALLOWED_IMPORTS: [&str; 9] = [
    "json",
    "re",
    "time",
    "math",
    "datetime",
    "itertools",
    "collections",
    "urllib",
    "okta_client",
];

/// Constructs that end validation immediately
const FORBIDDEN_CONSTRUCTS: [(&str, &str); 14] = [
    ("subprocess", "subprocess spawning"),
    ("os.system", "shell execution"),
    ("os.popen", "shell execution"),
    ("eval(", "dynamic code evaluation"),
    ("exec(", "dynamic code evaluation"),
    ("compile(", "dynamic code evaluation"),
    ("__import__", "dynamic imports"),
    ("globals(", "frame introspection"),
    ("locals(", "frame introspection"),
    ("sys._getframe", "frame introspection"),
    ("inspect.", "frame introspection"),
    ("socket", "raw network access"),
    ("urllib.request", "raw network access"),
    ("shutil", "filesystem manipulation"),
];

/// Destructive client verbs; only GET is permitted
const FORBIDDEN_VERBS: [&str; 5] = [".post(", ".put(", ".delete(", ".patch(", ".head("];

/// Host and scratch-area context the validator checks against
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// The only host programs may address
    pub base_url: String,

    /// Directory writes are confined to
    pub scratch_dir: String,
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:import\s+([A-Za-z_][\w.]*)|from\s+([A-Za-z_][\w.]*)\s+import)")
            .unwrap()
    })
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s'"\)]+"#).unwrap())
}

fn open_write_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // open(<first arg>, "<mode containing w/a/+/x>"
    PATTERN.get_or_init(|| {
        Regex::new(r#"open\s*\(\s*([^,)]+)\s*,\s*['"]([^'"]*)['"]"#).unwrap()
    })
}

/// Validate a probe program against the context.
///
/// Returns the reason on rejection so the agent can rewrite.
pub fn validate_program(program: &str, context: &ValidationContext) -> Result<()> {
    for (needle, why) in FORBIDDEN_CONSTRUCTS {
        if program.contains(needle) {
            return Err(SandboxError::UnsafeProgram(format!(
                "{} is not permitted ({})",
                needle.trim_end_matches('('),
                why
            )));
        }
    }

    for verb in FORBIDDEN_VERBS {
        if program.contains(verb) {
            return Err(SandboxError::UnsafeProgram(format!(
                "only GET requests are permitted; found '{}'",
                verb.trim_start_matches('.').trim_end_matches('(')
            )));
        }
    }

    for capture in import_pattern().captures_iter(program) {
        let module = capture
            .get(1)
            .or_else(|| capture.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let root = module.split('.').next().unwrap_or(module);
        if !ALLOWED_IMPORTS.contains(&root) {
            return Err(SandboxError::UnsafeProgram(format!(
                "import of '{}' is outside the allowlist",
                module
            )));
        }
    }

    for url in url_pattern().find_iter(program) {
        if !url.as_str().starts_with(&context.base_url) {
            return Err(SandboxError::UnsafeProgram(format!(
                "network access to '{}' is outside the upstream base URL",
                url.as_str()
            )));
        }
    }

    for capture in open_write_pattern().captures_iter(program) {
        let mode = &capture[2];
        if mode.contains('w') || mode.contains('a') || mode.contains('+') || mode.contains('x') {
            let target = capture[1].trim();
            let literal = target
                .strip_prefix('\'')
                .and_then(|t| t.strip_suffix('\''))
                .or_else(|| target.strip_prefix('"').and_then(|t| t.strip_suffix('"')));
            let in_scratch = literal.is_some_and(|path| path.starts_with(&context.scratch_dir));
            if !in_scratch {
                return Err(SandboxError::UnsafeProgram(format!(
                    "write to {} is outside the scratch area",
                    target
                )));
            }
        }
    }

    Ok(())
}
