#[derive(Debug, Clone, PartialEq)]
pub enum BacktestError {
    InvalidInput(String),
    InvalidParameters(String),
}

impl std::fmt::Display for BacktestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BacktestError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            BacktestError::InvalidParameters(msg) => write!(f, "invalid parameters: {msg}"),
        }
    }
}

impl std::error::Error for BacktestError {}

#[cfg(test)]
mod tests {
    use super::BacktestError;

    #[test]
    fn display_prefixes_kind() {
        let err = BacktestError::InvalidInput("need at least 2 rows".to_string());
        assert_eq!(err.to_string(), "invalid input: need at least 2 rows");
        let err = BacktestError::InvalidParameters("slippage must be >= 0".to_string());
        assert!(err.to_string().starts_with("invalid parameters"));
    }
}
