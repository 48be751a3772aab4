//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

/// AWS error categories used by the engines
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (deletion already finished)
    #[error("Resource not found ({code}): {message}")]
    NotFound { code: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {message}")]
    Throttled { message: String },

    /// Resource is in a state that does not allow the operation
    #[error("Invalid resource state ({code}): {message}")]
    InvalidState { code: String, message: String },

    /// Resource lives in a region this client cannot address
    #[error("Resource is in another region: {message}")]
    WrongRegion { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if the resource lives outside the client's region
    pub fn is_wrong_region(&self) -> bool {
        matches!(self, AwsError::WrongRegion { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AwsError::Throttled { .. } => {
                Some("AWS API rate limit hit. Re-run later or raise --poll-interval.")
            }
            AwsError::InvalidState { .. } => {
                Some("The resource is busy (modifying or backing up). The next poll will retry.")
            }
            AwsError::WrongRegion { .. } => Some("Pass --region matching the resource's region."),
            _ => None,
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBSnapshotNotFound",
    "DBSnapshotNotFoundFault",
    "CacheClusterNotFound",
    "CacheClusterNotFoundFault",
    "ReplicationGroupNotFoundFault",
    "SnapshotNotFoundFault",
    "NoSuchBucket",
    "NoSuchKey",
    "NoSuchTagSet",
];

/// Known AWS error codes for invalid resource states
const INVALID_STATE_CODES: &[&str] = &[
    "InvalidDBInstanceState",
    "InvalidDBInstanceStateFault",
    "InvalidDBSnapshotState",
    "InvalidDBSnapshotStateFault",
    "InvalidReplicationGroupState",
    "InvalidReplicationGroupStateFault",
    "InvalidSnapshotState",
    "InvalidSnapshotStateFault",
    "BucketNotEmpty",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "SlowDown",
];

/// Known AWS error codes for cross-region access
const WRONG_REGION_CODES: &[&str] = &[
    "PermanentRedirect",
    "AuthorizationHeaderMalformed",
    "IllegalLocationConstraintException",
];

/// Classify an AWS error from its code and message.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound {
            code: c.to_string(),
            message,
        },
        Some(c) if INVALID_STATE_CODES.contains(&c) => AwsError::InvalidState {
            code: c.to_string(),
            message,
        },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled { message },
        Some(c) if WRONG_REGION_CODES.contains(&c) => AwsError::WrongRegion { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify any AWS SDK error.
///
/// Service errors carry a code and message. Transport failures have neither,
/// so the full error context is used as the message instead.
pub fn classify_sdk_error<E>(err: &E) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let context = DisplayErrorContext(err).to_string();
    classify_aws_error(err.code(), Some(err.message().unwrap_or(&context)))
}

/// Find the classified AWS error inside an anyhow chain, if any.
pub fn aws_error(err: &anyhow::Error) -> Option<&AwsError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AwsError>())
}

/// Whether an error means the resource no longer exists.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    aws_error(err).is_some_and(AwsError::is_not_found)
}

/// Whether an error means the resource is outside this region.
pub fn is_wrong_region(err: &anyhow::Error) -> bool {
    aws_error(err).is_some_and(AwsError::is_wrong_region)
}
