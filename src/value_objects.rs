// Copyright 2025 Cowboy AI, LLC.

//! Value objects embedded in event payloads
//!
//! Provenance tagging ([`Source`]), third-party record links
//! ([`ExternalSystem`]) and partial-update field masks ([`FieldMask`]).
//! These are immutable values inside payloads, not independently
//! addressable entities.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default provenance for events whose caller supplied none
pub const DEFAULT_SOURCE: &str = "crm";
/// App source recorded for events produced by the platform itself
pub const DEFAULT_APP_SOURCE: &str = "events-platform";

/// Provenance tagging attached to most events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Source {
    /// System the data originated from
    pub source: String,
    /// System considered authoritative for conflicting values
    pub source_of_truth: String,
    /// Application that produced the change
    pub app_source: String,
}

impl Source {
    /// Fill blank fields from the platform defaults; `source_of_truth`
    /// falls back to `source`
    pub fn set_default_values(&mut self) {
        if self.source.trim().is_empty() {
            self.source = DEFAULT_SOURCE.to_string();
        }
        if self.source_of_truth.trim().is_empty() {
            self.source_of_truth = self.source.clone();
        }
        if self.app_source.trim().is_empty() {
            self.app_source = DEFAULT_APP_SOURCE.to_string();
        }
    }
}

/// Optional link to a record in a third-party system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExternalSystem {
    /// Which external system the link points into
    pub external_system_id: String,
    /// Record id within the external system
    pub external_id: String,
    /// Direct URL to the external record
    pub external_url: Option<String>,
    /// Entity type of the linked record, when the external system
    /// distinguishes them
    pub external_id_entity: Option<String>,
    /// When the link was last synchronized
    pub sync_date: Option<DateTime<Utc>>,
}

impl ExternalSystem {
    /// True when enough fields are populated to record the link
    pub fn available(&self) -> bool {
        !self.external_system_id.trim().is_empty() && !self.external_id.trim().is_empty()
    }
}

/// Explicit list of field names a partial-update command intends to
/// change. Empty conventionally means "all fields". Derived fields are
/// recomputed whether or not they appear in the mask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldMask(Vec<String>);

impl FieldMask {
    /// Mask covering only the given fields
    pub fn new<I, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Mask covering all fields
    pub fn all() -> Self {
        Self::default()
    }

    /// True when no explicit fields were listed (meaning "all")
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the command intends to change this field
    pub fn updated(&self, field: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|f| f == field)
    }

    /// The explicitly listed field names
    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_defaults() {
        let mut source = Source::default();
        source.set_default_values();
        assert_eq!(source.source, DEFAULT_SOURCE);
        assert_eq!(source.source_of_truth, DEFAULT_SOURCE);
        assert_eq!(source.app_source, DEFAULT_APP_SOURCE);
    }

    #[test]
    fn test_source_of_truth_follows_explicit_source() {
        let mut source = Source {
            source: "hubspot".to_string(),
            ..Default::default()
        };
        source.set_default_values();
        assert_eq!(source.source_of_truth, "hubspot");
        assert_eq!(source.app_source, DEFAULT_APP_SOURCE);
    }

    #[test]
    fn test_external_system_availability() {
        assert!(!ExternalSystem::default().available());
        assert!(!ExternalSystem {
            external_system_id: "salesforce".to_string(),
            ..Default::default()
        }
        .available());
        assert!(ExternalSystem {
            external_system_id: "salesforce".to_string(),
            external_id: "0018d00000abcde".to_string(),
            ..Default::default()
        }
        .available());
    }

    #[test]
    fn test_empty_mask_means_all_fields() {
        let mask = FieldMask::all();
        assert!(mask.is_empty());
        assert!(mask.updated("name"));
        assert!(mask.updated("ends_at"));
    }

    #[test]
    fn test_explicit_mask_is_selective() {
        let mask = FieldMask::new(["name"]);
        assert!(mask.updated("name"));
        assert!(!mask.updated("ends_at"));
        assert_eq!(mask.fields(), ["name"]);
    }
}
