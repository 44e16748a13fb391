use serde::{Deserialize, Serialize};

// =============================================================================
// Remote Validation Types
// =============================================================================

/// Structured rejection returned by the remote validator.
///
/// `index` is a raw character offset into the document as it was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub index: i64,
}

/// Error body of a 422 response: `{"case": "parserError", "fields": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "case", content = "fields", rename_all = "camelCase")]
pub enum ApiError {
    ParserError(ParserError),
}

/// Result of one remote validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Success,
    /// 422 with a parser-error payload.
    StructuredFailure(ParserError),
    /// Any other non-success status.
    TransportFailure { status: u16 },
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_wire_format() {
        let body = json!({
            "case": "parserError",
            "fields": {"message": "unexpected token", "line": 1, "column": 1, "index": 1}
        });
        let ApiError::ParserError(err) = serde_json::from_value(body).unwrap();
        assert_eq!(err.message, "unexpected token");
        assert_eq!(err.index, 1);
    }

    #[test]
    fn test_unknown_case_is_rejected() {
        let body = json!({"case": "budgetExceeded", "fields": {}});
        assert!(serde_json::from_value::<ApiError>(body).is_err());
    }
}
