use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodedErrorKind {
    /// A required input file or setting is missing or malformed.
    Input,
    /// An external tool (git) is unavailable or failed.
    External,
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn input(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Input,
        }
    }

    pub fn external(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::External,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                kind: self.kind,
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub kind: CodedErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};
    use serde_json::json;

    #[test]
    fn coded_error_is_found_through_context_layers() {
        let result: anyhow::Result<()> = Err(anyhow!(CodedError::input(
            "TABLE_NOT_FOUND",
            "table videos.csv does not exist"
        )));
        let error = result
            .context("failed to load table")
            .context("generation aborted")
            .expect_err("error");

        let coded = find_coded_error(&error).expect("coded error in chain");
        assert_eq!(coded.code, "TABLE_NOT_FOUND");
        assert_eq!(coded.kind, CodedErrorKind::Input);
    }

    #[test]
    fn envelope_serializes_details_only_when_present() {
        let plain = CodedError::external("GIT_NOT_FOUND", "git is not on PATH");
        let text = serde_json::to_string(&plain.envelope()).expect("serialize");
        assert!(text.contains("\"code\":\"GIT_NOT_FOUND\""));
        assert!(text.contains("\"kind\":\"external\""));
        assert!(!text.contains("details"));

        let detailed = plain.with_details(json!({ "command": "git --version" }));
        let text = serde_json::to_string(&detailed.envelope()).expect("serialize");
        assert!(text.contains("git --version"));
    }
}
