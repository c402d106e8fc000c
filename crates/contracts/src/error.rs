//! Layered error definitions
//!
//! Categorized by source: config / delivery

use std::fmt;

use thiserror::Error;

/// Configuration and IO error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single delivery attempt, or an aggregate of several.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The backend rejected the record or could not be reached
    #[error("handler '{handler}' transport error: {message}")]
    Transport {
        handler: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The record could not be encoded for the backend
    #[error("handler '{handler}' encode error: {source}")]
    Encode {
        handler: String,
        #[source]
        source: serde_json::Error,
    },

    /// The delivery context was cancelled while the handler was waiting
    #[error("handler '{handler}' cancelled")]
    Cancelled { handler: String },

    /// The delivery context deadline passed while the handler was waiting
    #[error("handler '{handler}' deadline exceeded")]
    DeadlineExceeded { handler: String },

    /// The handler task panicked
    #[error("handler '{handler}' panicked: {message}")]
    Panicked { handler: String, message: String },

    /// One or more child failures of a composed handler
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl DeliveryError {
    /// Create transport error without an underlying cause
    pub fn transport(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            handler: handler.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create transport error wrapping the underlying cause
    pub fn transport_with_source<E>(handler: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            handler: handler.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create encode error
    pub fn encode(handler: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            handler: handler.into(),
            source,
        }
    }

    /// Name of the handler that failed, `None` for aggregates
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::Transport { handler, .. }
            | Self::Encode { handler, .. }
            | Self::Cancelled { handler }
            | Self::DeadlineExceeded { handler }
            | Self::Panicked { handler, .. } => Some(handler),
            Self::Aggregate(_) => None,
        }
    }

    /// Number of leaf failures carried by this error
    pub fn failure_count(&self) -> usize {
        match self {
            Self::Aggregate(agg) => agg.len(),
            _ => 1,
        }
    }

    /// Leaf failures in report order
    pub fn constituents(&self) -> Vec<&DeliveryError> {
        match self {
            Self::Aggregate(agg) => agg.iter().collect(),
            other => vec![other],
        }
    }
}

/// Ordered collection of child delivery failures.
///
/// Nested aggregates are flattened on insertion, so an aggregate only ever
/// holds leaf failures.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<DeliveryError>,
}

impl AggregateError {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure, flattening nested aggregates
    pub fn push(&mut self, error: DeliveryError) {
        match error {
            DeliveryError::Aggregate(inner) => self.errors.extend(inner.errors),
            leaf => self.errors.push(leaf),
        }
    }

    /// Number of constituent failures
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Constituent failures in order
    pub fn errors(&self) -> &[DeliveryError] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeliveryError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<DeliveryError> {
        self.errors
    }

    /// `Ok(())` when empty, otherwise the aggregate as a [`DeliveryError`]
    pub fn into_result(self) -> Result<(), DeliveryError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DeliveryError::Aggregate(self))
        }
    }
}

impl FromIterator<DeliveryError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = DeliveryError>>(iter: I) -> Self {
        let mut agg = Self::new();
        for error in iter {
            agg.push(error);
        }
        agg
    }
}

impl IntoIterator for AggregateError {
    type Item = DeliveryError;
    type IntoIter = std::vec::IntoIter<DeliveryError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a DeliveryError;
    type IntoIter = std::slice::Iter<'a, DeliveryError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_display_joins_lines() {
        let agg: AggregateError = vec![
            DeliveryError::transport("queue", "a"),
            DeliveryError::transport("bus", "b"),
        ]
        .into_iter()
        .collect();

        let text = agg.to_string();
        assert_eq!(
            text,
            "handler 'queue' transport error: a\nhandler 'bus' transport error: b"
        );
    }

    #[test]
    fn test_aggregate_flattens_nested() {
        let inner: AggregateError = vec![
            DeliveryError::transport("b", "x"),
            DeliveryError::transport("c", "y"),
        ]
        .into_iter()
        .collect();

        let mut outer = AggregateError::new();
        outer.push(DeliveryError::transport("a", "w"));
        outer.push(DeliveryError::Aggregate(inner));

        let handlers: Vec<_> = outer.iter().filter_map(|e| e.handler()).collect();
        assert_eq!(handlers, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_aggregate_is_ok() {
        assert!(AggregateError::new().into_result().is_ok());
    }

    #[test]
    fn test_failure_count() {
        let leaf = DeliveryError::Cancelled {
            handler: "h".to_string(),
        };
        assert_eq!(leaf.failure_count(), 1);
        assert_eq!(leaf.constituents().len(), 1);

        let agg = AggregateError::from_iter([
            DeliveryError::transport("a", "1"),
            DeliveryError::transport("b", "2"),
        ])
        .into_result()
        .unwrap_err();
        assert_eq!(agg.failure_count(), 2);
        assert!(agg.handler().is_none());
    }

    #[test]
    fn test_aggregate_source_is_first() {
        use std::error::Error;

        let agg = AggregateError::from_iter([
            DeliveryError::transport("first", "1"),
            DeliveryError::transport("second", "2"),
        ]);
        let source = agg.source().unwrap();
        assert!(source.to_string().contains("first"));
    }
}
