use thiserror::Error;

/// Configuration errors raised while building the middleware.
///
/// These are fatal and synchronous: no middleware instance exists until the
/// configuration passes the backend's limits. Transport errors are never
/// wrapped here; they surface to the request caller unchanged.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "number of custom trace attributes can't exceed {limit}; defined attributes: {keys}"
    )]
    TooManyAttributes { limit: usize, keys: String },
    #[error("custom trace attribute `{key}` key can't exceed {limit} characters")]
    AttributeKeyTooLong { key: String, limit: usize },
    #[error("custom trace attribute `{key}` value can't exceed {limit} characters")]
    AttributeValueTooLong { key: String, limit: usize },
}
