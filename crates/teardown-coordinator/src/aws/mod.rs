//! AWS service clients
//!
//! Every client sits behind a small trait so engines can be tested with
//! mocks. The SDK-backed implementations convert provider types into the
//! plain structs defined next to each trait.

pub mod context;
pub mod elasticache;
pub mod error;
pub mod rds;
pub mod s3;
pub mod tagging;
pub mod tags;

pub use context::{AwsContext, FromAwsContext};
pub use elasticache::{ElasticacheApi, ElasticacheClient};
pub use error::{AwsError, aws_error, classify_aws_error, is_not_found, is_wrong_region};
pub use rds::{RdsApi, RdsClient};
pub use s3::{S3Api, S3Client};
pub use tagging::{ResourceTaggingClient, TagIndex};
