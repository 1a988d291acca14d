use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Invalid template for {statement}: {details}")]
    InvalidTemplate { statement: String, details: String },

    #[error("Invalid rule set: {0}")]
    InvalidRuleSet(String),

    #[error("Malformed raw table: {0}")]
    MalformedTable(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StatementError>;
