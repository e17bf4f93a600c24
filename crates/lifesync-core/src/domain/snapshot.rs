//! Snapshots - what crosses the local storage and network boundaries
//!
//! A [`DurablePartition`] holds the persisted domains of a state tree as
//! JSON values keyed by domain name. A [`Snapshot`] stamps a partition with
//! a [`Version`] and the time of the write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::newtypes::Version;
use super::state::{Domain, StateTree};

/// The durable part of a state tree, possibly partial
///
/// Keys that do not name a known domain are dropped on deserialization, so
/// a document written by a newer build still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct DurablePartition {
    domains: BTreeMap<Domain, Value>,
}

impl DurablePartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts every persisted domain of `tree`
    ///
    /// # Errors
    /// Returns [`DomainError::SnapshotDecode`] if a domain fails to serialize
    pub fn from_tree(tree: &StateTree) -> Result<Self, DomainError> {
        let mut domains = BTreeMap::new();
        for domain in Domain::persisted() {
            let value = tree
                .domain_value(domain)
                .map_err(|e| DomainError::SnapshotDecode(format!("{domain}: {e}")))?;
            domains.insert(domain, value);
        }
        Ok(Self { domains })
    }

    /// Adds or replaces the value for one domain
    pub fn with_domain(mut self, domain: Domain, value: Value) -> Self {
        self.domains.insert(domain, value);
        self
    }

    pub fn get(&self, domain: Domain) -> Option<&Value> {
        self.domains.get(&domain)
    }

    pub fn contains(&self, domain: Domain) -> bool {
        self.domains.contains_key(&domain)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domains(&self) -> impl Iterator<Item = (Domain, &Value)> {
        self.domains.iter().map(|(domain, value)| (*domain, value))
    }
}

impl From<BTreeMap<String, Value>> for DurablePartition {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let domains = raw
            .into_iter()
            .filter_map(|(key, value)| key.parse::<Domain>().ok().map(|d| (d, value)))
            .collect();
        Self { domains }
    }
}

impl From<DurablePartition> for BTreeMap<String, Value> {
    fn from(partition: DurablePartition) -> Self {
        partition
            .domains
            .into_iter()
            .map(|(domain, value)| (domain.as_str().to_string(), value))
            .collect()
    }
}

/// A versioned durable partition as stored in the remote document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: DurablePartition,
    pub version: Version,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Stamps `state` with `version` and the current time
    pub fn new(state: DurablePartition, version: Version) -> Self {
        Self {
            state,
            version,
            updated_at: Utc::now(),
        }
    }
}
