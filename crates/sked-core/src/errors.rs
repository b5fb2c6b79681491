/// Errors raised while parsing dates and repeat rules or computing the
/// next occurrence. All of them are local validation failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("empty repeat rule")]
    EmptyRule,
    #[error("invalid date format: {0}")]
    InvalidDate(String),
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
    #[error("unsupported rule format: {0}")]
    UnsupportedRule(String),
    #[error("date out of supported range")]
    OutOfRange,
}

impl RuleError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::EmptyRule => "empty_rule",
            Self::InvalidDate(_) => "invalid_date",
            Self::InvalidInterval(_) => "invalid_interval",
            Self::UnsupportedRule(_) => "unsupported_rule",
            Self::OutOfRange => "out_of_range",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_offending_input() {
        let err = RuleError::InvalidDate("2024-01-01".into());
        assert_eq!(err.to_string(), "invalid date format: 2024-01-01");

        let err = RuleError::UnsupportedRule("w 1".into());
        assert!(err.to_string().contains("w 1"));
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(RuleError::EmptyRule.error_kind(), "empty_rule");
        assert_eq!(RuleError::InvalidInterval("0".into()).error_kind(), "invalid_interval");
        assert_eq!(RuleError::OutOfRange.error_kind(), "out_of_range");
    }
}
