use crate::OPERATION_NAME_ATTRIBUTE_KEY;

/// A custom attribute attached to every HTTP metric produced by the
/// middleware.
///
/// The variant set is closed: either a predefined attribute whose value is
/// resolved from the request at interception time, or a completely
/// caller-defined key/value pair. Key and value lengths are validated against
/// the backend's limits when the middleware is built, not here, so that
/// configuration errors are reported once with full context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TraceAttribute {
    /// Attaches the GraphQL operation name under `key`.
    ///
    /// The value is resolved from the operation-name header attached by the
    /// GraphQL client layer, so it only carries meaning on GraphQL-style
    /// exchanges; the generic processor skips it. This is useful to filter
    /// backend dashboards by operation.
    OperationName { key: String },
    /// A caller-defined attribute, recorded verbatim on every exchange.
    Custom { key: String, value: String },
}

impl TraceAttribute {
    /// Operation-name attribute under the default `"Operation Name"` key.
    pub fn operation_name() -> Self {
        TraceAttribute::OperationName {
            key: OPERATION_NAME_ATTRIBUTE_KEY.to_string(),
        }
    }

    /// Operation-name attribute under a caller-chosen key.
    pub fn operation_name_as(key: impl Into<String>) -> Self {
        TraceAttribute::OperationName { key: key.into() }
    }

    pub fn custom(key: impl Into<String>, value: impl Into<String>) -> Self {
        TraceAttribute::Custom {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            TraceAttribute::OperationName { key } => key,
            TraceAttribute::Custom { key, .. } => key,
        }
    }
}
