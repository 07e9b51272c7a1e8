//! Read/modify classification of statements.

/// Leading keywords that mark a statement as modifying.
const MODIFYING_KEYWORDS: &[&str] = &["insert", "update", "delete", "drop", "create", "alter"];

/// How a statement will be treated by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementClass {
    ReadOnly,
    Modifying,
}

impl StatementClass {
    pub fn is_modifying(self) -> bool {
        self == StatementClass::Modifying
    }
}

/// Classify a statement.
///
/// A statement is modifying only when the caller did not declare it
/// read-only and its first keyword is one of [`MODIFYING_KEYWORDS`].
/// Anything declared read-only is treated as read-only regardless of text;
/// such statements run in a transaction that is rolled back.
pub fn classify(statement: &str, declared_read_only: bool) -> StatementClass {
    if declared_read_only {
        return StatementClass::ReadOnly;
    }

    let first = statement
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or("");

    if MODIFYING_KEYWORDS
        .iter()
        .any(|kw| first.eq_ignore_ascii_case(kw))
    {
        StatementClass::Modifying
    } else {
        StatementClass::ReadOnly
    }
}
