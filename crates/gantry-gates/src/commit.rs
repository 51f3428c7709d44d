//! Conventional commit message checks
//!
//! A message header must look like `type(scope)!: subject`, for example
//! `feat(rest): add hello endpoint`. Merge, revert and fixup/squash commits
//! generated by git are accepted as-is.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Commit types accepted in the header
pub const COMMIT_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

/// Longest header accepted, in characters
pub const MAX_HEADER_LENGTH: usize = 100;

/// Parsed conventional commit header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    pub kind: String,
    pub scope: Option<String>,
    pub breaking: bool,
    pub subject: String,
}

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[a-z]+)(?:\((?P<scope>[^()\s]+)\))?(?P<breaking>!)?: (?P<subject>\S.*)$").unwrap()
});

static GENERATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(Merge (branch|pull request|remote-tracking branch) |Revert "|fixup! |squash! )"#).unwrap()
});

/// Parse the header line; `None` if it is not a conventional header
pub fn parse_header(header: &str) -> Option<CommitHeader> {
    let captures = HEADER.captures(header.trim_end())?;
    Some(CommitHeader {
        kind: captures["kind"].to_string(),
        scope: captures.name("scope").map(|m| m.as_str().to_string()),
        breaking: captures.name("breaking").is_some(),
        subject: captures["subject"].to_string(),
    })
}

/// Check a full commit message.
///
/// Comment lines (starting with `#`) are ignored, as git strips them.
///
/// # Errors
///
/// Returns `Error::CommitMessage` listing every problem found.
pub fn validate_commit_message(message: &str) -> Result<()> {
    let lines: Vec<&str> = message
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect();
    let Some(header_index) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return Err(Error::CommitMessage {
            problems: vec!["message is empty".to_string()],
        });
    };
    let header = lines[header_index];

    if GENERATED.is_match(header) {
        return Ok(());
    }

    let mut problems = Vec::new();
    match parse_header(header) {
        Some(parsed) => {
            if !COMMIT_TYPES.contains(&parsed.kind.as_str()) {
                problems.push(format!(
                    "unknown type '{}', expected one of: {}",
                    parsed.kind,
                    COMMIT_TYPES.join(", ")
                ));
            }
        }
        None => problems.push(format!(
            "header '{header}' does not match 'type(scope): subject'"
        )),
    }

    let length = header.chars().count();
    if length > MAX_HEADER_LENGTH {
        problems.push(format!(
            "header is {length} characters, at most {MAX_HEADER_LENGTH} allowed"
        ));
    }

    if let Some(second) = lines.get(header_index + 1) {
        if !second.trim().is_empty() {
            problems.push("second line must be blank".to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::CommitMessage { problems })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_full_header() {
        let header = parse_header("feat(rest)!: drop legacy endpoint").unwrap();
        assert_eq!(
            header,
            CommitHeader {
                kind: "feat".to_string(),
                scope: Some("rest".to_string()),
                breaking: true,
                subject: "drop legacy endpoint".to_string(),
            }
        );
    }

    #[rstest]
    #[case("feat: add hello endpoint")]
    #[case("fix(service): handle empty name\n\nBody text here.")]
    #[case("chore(deps)!: bump spring boot")]
    #[case("# Please enter the commit message\ndocs: update readme")]
    #[case("Merge branch 'main' into feature")]
    #[case("Revert \"feat: add hello endpoint\"")]
    #[case("fixup! feat: add hello endpoint")]
    fn accepts_valid_messages(#[case] message: &str) {
        assert!(validate_commit_message(message).is_ok(), "{message}");
    }

    #[rstest]
    #[case("", "empty")]
    #[case("added stuff", "does not match")]
    #[case("feature: add hello", "unknown type")]
    #[case("feat:missing space", "does not match")]
    #[case("feat: subject\nbody without blank line", "second line")]
    fn rejects_invalid_messages(#[case] message: &str, #[case] expected: &str) {
        let err = validate_commit_message(message).unwrap_err();
        assert!(err.to_string().contains(expected), "{err}");
    }

    #[test]
    fn rejects_long_header() {
        let message = format!("feat: {}", "x".repeat(MAX_HEADER_LENGTH));
        let err = validate_commit_message(&message).unwrap_err();
        assert!(err.to_string().contains("at most 100"), "{err}");
    }
}
