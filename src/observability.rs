//! Observability module for correlation and tracing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID for tracking one invocation across submit and confirm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Trace, span and correlation ids for one operation of an invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub correlation_id: CorrelationId,
    pub parent_span_id: Option<String>,
    /// Operation name, e.g. `submit` or `track`
    pub operation: String,
    pub started_at: DateTime<Utc>,
}

impl TraceContext {
    pub fn new(operation: &str) -> Self {
        Self::with_correlation(operation, CorrelationId::new())
    }

    /// Root context bound to an existing correlation id
    pub fn with_correlation(operation: &str, correlation_id: CorrelationId) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id,
            parent_span_id: None,
            operation: operation.to_string(),
            started_at: Utc::now(),
        }
    }

    /// Create a child span context
    pub fn child_span(&self, operation: &str) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: self.correlation_id.clone(),
            parent_span_id: Some(self.span_id.clone()),
            operation: operation.to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Milliseconds since this span started
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new("default")
    }
}
