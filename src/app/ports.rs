use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MlsRecord, PropertyDetailRecord};

/// How a property is looked up in the upstream feeds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Address(String),
    Id(i64),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Address(address) => write!(f, "{}", address),
            PropertyKey::Id(id) => write!(f, "#{}", id),
        }
    }
}

/// Public-records lookup. An error here is fatal for the subject property.
#[async_trait]
pub trait PropertyDetailPort: Send + Sync {
    async fn fetch_property_detail(&self, key: &PropertyKey) -> Result<PropertyDetailRecord>;
}

/// Best-effort MLS lookup. `Ok(None)` means no listing matched; callers
/// enriching comparables treat an error the same way.
#[async_trait]
pub trait MlsLookupPort: Send + Sync {
    async fn fetch_mls_detail(&self, key: &PropertyKey) -> Result<Option<MlsRecord>>;
}
