//! Application error taxonomy.
//!
//! Operational errors are [`AppError`] values keyed by [`ErrorCategory`] and
//! [`ErrorSeverity`]. Anything else that reaches the handler is wrapped as an
//! unclassified, non-operational error.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{LogLevel, LogValue};

/// Which constructor produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Validation,
    Authentication,
    Authorization,
    BusinessLogic,
    ExternalService,
    Generic,
    Unclassified,
}

impl ErrorKind {
    /// Name reported to the monitoring endpoint.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::Authorization => "AuthorizationError",
            ErrorKind::BusinessLogic => "BusinessLogicError",
            ErrorKind::ExternalService => "ExternalServiceError",
            ErrorKind::Generic => "AppError",
            ErrorKind::Unclassified => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Network,
    Validation,
    Authentication,
    Authorization,
    BusinessLogic,
    System,
    ExternalService,
    UserInput,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Network => "NETWORK",
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::Authentication => "AUTHENTICATION",
            ErrorCategory::Authorization => "AUTHORIZATION",
            ErrorCategory::BusinessLogic => "BUSINESS_LOGIC",
            ErrorCategory::System => "SYSTEM",
            ErrorCategory::ExternalService => "EXTERNAL_SERVICE",
            ErrorCategory::UserInput => "USER_INPUT",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorSeverity::Low => "LOW",
            ErrorSeverity::Medium => "MEDIUM",
            ErrorSeverity::High => "HIGH",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    /// Level the handler logs an error of this severity at.
    pub fn log_level(self) -> LogLevel {
        match self {
            ErrorSeverity::Critical | ErrorSeverity::High => LogLevel::Error,
            ErrorSeverity::Medium => LogLevel::Warn,
            ErrorSeverity::Low => LogLevel::Info,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and when an error was raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMetadata {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    pub additional_data: LogValue,
}

impl ErrorMetadata {
    fn capture() -> Self {
        let backtrace = Backtrace::capture();
        let stack_trace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            timestamp: Utc::now(),
            url: None,
            user_agent: None,
            stack_trace,
            additional_data: LogValue::empty_record(),
        }
    }
}

/// A classified, operational application error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub status_code: u16,
    pub is_operational: bool,
    pub context: Option<String>,
    pub metadata: ErrorMetadata,
}

impl AppError {
    fn build(
        kind: ErrorKind,
        message: impl Into<String>,
        category: ErrorCategory,
        severity: ErrorSeverity,
        status_code: u16,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            category,
            severity,
            status_code,
            is_operational: true,
            context: None,
            metadata: ErrorMetadata::capture(),
        }
    }

    /// Generic application error: SYSTEM, MEDIUM, 500.
    pub fn new(message: impl Into<String>) -> Self {
        Self::build(
            ErrorKind::Generic,
            message,
            ErrorCategory::System,
            ErrorSeverity::Medium,
            500,
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::build(
            ErrorKind::Network,
            message,
            ErrorCategory::Network,
            ErrorSeverity::Medium,
            503,
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::build(
            ErrorKind::Validation,
            message,
            ErrorCategory::Validation,
            ErrorSeverity::Low,
            400,
        )
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::build(
            ErrorKind::Authentication,
            message,
            ErrorCategory::Authentication,
            ErrorSeverity::High,
            401,
        )
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::build(
            ErrorKind::Authorization,
            message,
            ErrorCategory::Authorization,
            ErrorSeverity::High,
            403,
        )
    }

    pub fn business_logic(message: impl Into<String>) -> Self {
        Self::build(
            ErrorKind::BusinessLogic,
            message,
            ErrorCategory::BusinessLogic,
            ErrorSeverity::Medium,
            422,
        )
    }

    /// Failure of a third-party service; the service name lands in
    /// additional data.
    pub fn external_service(service: &str, message: impl Into<String>) -> Self {
        Self::build(
            ErrorKind::ExternalService,
            message,
            ErrorCategory::ExternalService,
            ErrorSeverity::High,
            502,
        )
        .with_data("service", service.into())
    }

    /// Wrap a foreign error. The source chain is kept under `causes`.
    pub fn unclassified(error: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(LogValue::from(cause.to_string()));
            source = cause.source();
        }

        let mut app = Self::build(
            ErrorKind::Unclassified,
            error.to_string(),
            ErrorCategory::System,
            ErrorSeverity::High,
            500,
        );
        app.is_operational = false;
        if !causes.is_empty() {
            app.metadata.additional_data.insert("causes", LogValue::Array(causes));
        }
        app
    }

    /// Wrap a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };

        let mut app = Self::build(
            ErrorKind::Unclassified,
            message,
            ErrorCategory::System,
            ErrorSeverity::High,
            500,
        );
        app.is_operational = false;
        app.with_data("panic", true.into())
    }

    /// Recover the `AppError` behind a trait object, or wrap it as
    /// unclassified.
    pub fn classify(error: &(dyn StdError + 'static)) -> Self {
        match error.downcast_ref::<AppError>() {
            Some(app) => app.clone(),
            None => Self::unclassified(error),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: LogValue) -> Self {
        self.metadata.additional_data.insert(key, value);
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Payload for the monitoring endpoint's `error` field.
    pub fn report(&self) -> ErrorReport<'_> {
        ErrorReport {
            message: &self.message,
            name: self.name(),
            category: self.category,
            severity: self.severity,
            status_code: self.status_code,
            is_operational: self.is_operational,
            context: self.context.as_deref(),
            timestamp: self.metadata.timestamp,
            url: self.metadata.url.as_deref(),
            user_agent: self.metadata.user_agent.as_deref(),
            stack: self.metadata.stack_trace.as_deref(),
            additional_data: &self.metadata.additional_data,
        }
    }

    /// Structured data attached to the log entry for this error.
    pub fn log_data(&self) -> LogValue {
        let mut data = LogValue::record([
            ("name", LogValue::from(self.name())),
            ("category", self.category.as_str().into()),
            ("severity", self.severity.as_str().into()),
            ("statusCode", self.status_code.into()),
            ("isOperational", self.is_operational.into()),
        ]);
        if let Some(stack) = &self.metadata.stack_trace {
            data.insert("stack", stack.as_str().into());
        }
        if self.metadata.additional_data != LogValue::empty_record() {
            data.insert("additionalData", self.metadata.additional_data.clone());
        }
        data
    }
}

/// Serialized view of an [`AppError`] sent to the monitoring endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport<'a> {
    pub message: &'a str,
    pub name: &'static str,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub status_code: u16,
    pub is_operational: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<&'a str>,
    pub additional_data: &'a LogValue,
}
