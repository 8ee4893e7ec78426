// entity.rs
//!
//! The S-expression entity representation and its comparison semantics are
//! an external collaborator: the caller owns the actual entity objects and
//! their comparison logic. This module only defines the trait seam the
//! walker consumes, plus a reference implementation usable by callers that
//! just want literal-string or regex comparisons without building a full
//! entity graph.

/// Operation codes recognized on a path/filepath entity. The walker only
/// special-cases `Equals` and `PatternMatch`; every other code is handled
/// generically through [`Entity::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationCode {
    Equals,
    NotEqual,
    CaseInsensitiveEquals,
    CaseInsensitiveNotEqual,
    PatternMatch,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    BitwiseAnd,
    BitwiseOr,
    Subset,
    Superset,
}

/// Result of comparing an entity against a candidate string. `Error`
/// corresponds to `MatchError` in the walker's error model: it does not
/// abort the walk, it marks that one candidate as non-matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    True,
    False,
    Error,
}

impl CompareResult {
    pub fn is_true(self) -> bool {
        matches!(self, CompareResult::True)
    }
}

/// The trait seam for the OVAL entity representation. Implementors own
/// whatever internal string/operation storage the caller's object model
/// uses; the walker only needs these three operations.
pub trait Entity {
    /// The operation code carried by this entity.
    fn operation(&self) -> OperationCode;

    /// The literal string value, when the entity carries exactly one
    /// (used for `Equals` root-path extraction and `PatternMatch` source
    /// text).
    fn string_value(&self) -> &str;

    /// Compare this entity's value(s) against `candidate` per
    /// [`Entity::operation`]'s semantics. Implementations that cannot
    /// evaluate a comparison (internal failure in the S-expression engine)
    /// return `CompareResult::Error` rather than panicking.
    fn compare(&self, candidate: &str) -> CompareResult;
}

/// A minimal reference [`Entity`] implementation covering the comparisons
/// the walker itself relies on (`Equals`, `PatternMatch`, and
/// case-sensitivity variants). Callers with a full OVAL object graph
/// should implement [`Entity`] directly over their own type instead of
/// going through this one.
#[derive(Debug, Clone)]
pub struct StringEntity {
    operation: OperationCode,
    value: String,
}

impl StringEntity {
    pub fn new(operation: OperationCode, value: impl Into<String>) -> Self {
        Self {
            operation,
            value: value.into(),
        }
    }

    pub fn equals(value: impl Into<String>) -> Self {
        Self::new(OperationCode::Equals, value)
    }

    pub fn pattern_match(pattern: impl Into<String>) -> Self {
        Self::new(OperationCode::PatternMatch, pattern)
    }
}

impl Entity for StringEntity {
    fn operation(&self) -> OperationCode {
        self.operation
    }

    fn string_value(&self) -> &str {
        &self.value
    }

    fn compare(&self, candidate: &str) -> CompareResult {
        let result = match self.operation {
            OperationCode::Equals => candidate == self.value,
            OperationCode::NotEqual => candidate != self.value,
            OperationCode::CaseInsensitiveEquals => {
                candidate.eq_ignore_ascii_case(&self.value)
            }
            OperationCode::CaseInsensitiveNotEqual => {
                !candidate.eq_ignore_ascii_case(&self.value)
            }
            OperationCode::PatternMatch => match regex::Regex::new(&self.value) {
                Ok(re) => re.is_match(candidate),
                Err(_) => return CompareResult::Error,
            },
            OperationCode::GreaterThan => candidate > self.value.as_str(),
            OperationCode::LessThan => candidate < self.value.as_str(),
            OperationCode::GreaterThanOrEqual => candidate >= self.value.as_str(),
            OperationCode::LessThanOrEqual => candidate <= self.value.as_str(),
            OperationCode::BitwiseAnd
            | OperationCode::BitwiseOr
            | OperationCode::Subset
            | OperationCode::Superset => return CompareResult::Error,
        };
        if result {
            CompareResult::True
        } else {
            CompareResult::False
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_matches_exact_string() {
        let e = StringEntity::equals("/a/b");
        assert_eq!(e.compare("/a/b"), CompareResult::True);
        assert_eq!(e.compare("/a/c"), CompareResult::False);
    }

    #[test]
    fn pattern_match_uses_regex_semantics() {
        let e = StringEntity::pattern_match(r"^/etc/.*\.conf$");
        assert_eq!(e.compare("/etc/a.conf"), CompareResult::True);
        assert_eq!(e.compare("/var/a.conf"), CompareResult::False);
    }

    #[test]
    fn malformed_pattern_reports_error_not_panic() {
        let e = StringEntity::pattern_match("(unclosed");
        assert_eq!(e.compare("anything"), CompareResult::Error);
    }
}
