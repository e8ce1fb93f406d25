//! Directory-backed mention scanner.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};

use crate::workflow::{domain::MemberId, ports::MentionScanner};

/// Token grammar: `@{name}` for names with spaces, otherwise `@name`
/// terminated by whitespace or punctuation.
const MENTION_PATTERN: &str = r"@\{([^}]+)\}|@([^\s@{}，。！？,.!?]+)";

/// Mention scanner backed by a static name → member directory.
///
/// The surrounding application supplies the directory of active member
/// names; unknown names scan to nothing.
#[derive(Debug, Clone)]
pub struct DirectoryMentionScanner {
    members: HashMap<String, MemberId>,
    pattern: Regex,
}

impl DirectoryMentionScanner {
    /// Creates a scanner over the given member directory.
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = (String, MemberId)>) -> Self {
        #[expect(
            clippy::expect_used,
            reason = "the mention pattern is a compile-time literal"
        )]
        let pattern = Regex::new(MENTION_PATTERN).expect("mention pattern compiles");
        Self {
            members: members.into_iter().collect(),
            pattern,
        }
    }
}

impl MentionScanner for DirectoryMentionScanner {
    fn mentions(&self, text: &str) -> BTreeSet<MemberId> {
        self.pattern
            .captures_iter(text)
            .filter_map(|captures| {
                let name = captures.get(1).or_else(|| captures.get(2))?;
                self.members.get(name.as_str().trim()).copied()
            })
            .collect()
    }
}
