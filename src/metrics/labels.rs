//! Label types for Prometheus metrics

use prometheus_client::encoding::EncodeLabelSet;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResourceLabels {
    pub resource: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PollLabels {
    pub resource: String,
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MutationLabels {
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FeedLabels {
    pub feed: String,
}

impl ResourceLabels {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
        }
    }
}

impl PollLabels {
    pub fn new(resource: &str, outcome: &str) -> Self {
        Self {
            resource: resource.to_string(),
            outcome: outcome.to_string(),
        }
    }
}
