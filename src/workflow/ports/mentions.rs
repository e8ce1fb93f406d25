//! Mention scanning port.

use crate::workflow::domain::MemberId;
use std::collections::BTreeSet;

/// Resolves `@name` tokens in free text to member identifiers.
///
/// Consumed when processing review feedback and task descriptions; the
/// adapter owns the token grammar and the member directory.
pub trait MentionScanner: Send + Sync {
    /// Returns the set of members referenced by mention tokens in `text`.
    ///
    /// Unresolvable names are silently dropped.
    fn mentions(&self, text: &str) -> BTreeSet<MemberId>;
}
