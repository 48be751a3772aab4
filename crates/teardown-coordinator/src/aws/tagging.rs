//! Resource Groups Tagging API lookups
//!
//! ElastiCache list calls do not return tags, so cache resources are found by
//! asking the tagging API for ARNs that carry the cluster tag.

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::classify_sdk_error;
use crate::aws::tags::extract_tagging_tags;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_resourcegroupstagging::Client;
use aws_sdk_resourcegroupstagging::types::TagFilter;
use std::collections::HashMap;
use tracing::debug;

/// An ARN together with all of its tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTagMapping {
    pub arn: String,
    pub tags: HashMap<String, String>,
}

/// Trait for tag index lookups that can be mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagIndex: Send + Sync {
    /// Find resources of one type (e.g. `elasticache:cluster`) carrying every given tag
    async fn get_resources_by_tags(
        &self,
        resource_type: &str,
        tags: &HashMap<String, String>,
    ) -> Result<Vec<ResourceTagMapping>>;
}

/// Tag index backed by the Resource Groups Tagging API
pub struct ResourceTaggingClient {
    client: Client,
}

impl FromAwsContext for ResourceTaggingClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.tagging_client(),
        }
    }
}

#[async_trait]
impl TagIndex for ResourceTaggingClient {
    async fn get_resources_by_tags(
        &self,
        resource_type: &str,
        tags: &HashMap<String, String>,
    ) -> Result<Vec<ResourceTagMapping>> {
        let filters: Vec<TagFilter> = tags
            .iter()
            .map(|(key, value)| TagFilter::builder().key(key).values(value).build())
            .collect();

        let mut mappings = Vec::new();
        let mut pagination_token: Option<String> = None;

        loop {
            let response = self
                .client
                .get_resources()
                .resource_type_filters(resource_type)
                .set_tag_filters(Some(filters.clone()))
                .set_pagination_token(pagination_token.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to get resources from tagging API")?;

            for mapping in response.resource_tag_mapping_list() {
                let Some(arn) = mapping.resource_arn() else {
                    continue;
                };
                mappings.push(ResourceTagMapping {
                    arn: arn.to_string(),
                    tags: extract_tagging_tags(mapping.tags()),
                });
            }

            match response.pagination_token() {
                Some(token) if !token.is_empty() => pagination_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(resource_type, count = mappings.len(), "Found tagged resources");
        Ok(mappings)
    }
}
