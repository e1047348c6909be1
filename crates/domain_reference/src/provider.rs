//! Reference data lookup
//!
//! Services depend on the [`ReferenceData`] trait; [`StaticReferenceData`] is
//! an indexed, immutable snapshot of a [`ReferenceTables`] document.

use std::collections::HashMap;
use tracing::debug;

use crate::error::ReferenceError;
use crate::tables::{HealthFacility, Location, ReferenceEntry, ReferenceKind, ReferenceTables};

/// Read-only reference data lookup
pub trait ReferenceData: Send + Sync {
    /// Looks up an entry of a flat code list
    fn lookup(&self, kind: ReferenceKind, code: &str) -> Option<&ReferenceEntry>;

    fn location(&self, code: &str) -> Option<&Location>;

    /// Looks up a health facility, ignoring case and surrounding whitespace
    fn health_facility(&self, code: &str) -> Option<&HealthFacility>;

    /// Returns true if the code exists and is active
    fn is_known(&self, kind: ReferenceKind, code: &str) -> bool {
        self.lookup(kind, code).is_some_and(|entry| entry.active)
    }

    /// Returns the chain of parents of a location, nearest first
    fn location_ancestors(&self, code: &str) -> Vec<&Location> {
        let mut ancestors = Vec::new();
        let mut current = self.location(code).and_then(|l| l.parent_code.as_deref());
        while let Some(parent_code) = current {
            match self.location(parent_code) {
                Some(parent) => {
                    current = parent.parent_code.as_deref();
                    ancestors.push(parent);
                }
                None => break,
            }
        }
        ancestors
    }
}

/// Normalizes a facility code the way facilities are stored
pub fn normalize_facility_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// In-memory reference data indexed by code
#[derive(Debug, Clone)]
pub struct StaticReferenceData {
    entries: HashMap<ReferenceKind, HashMap<String, ReferenceEntry>>,
    locations: HashMap<String, Location>,
    facilities: HashMap<String, HealthFacility>,
}

impl StaticReferenceData {
    /// Reference data with the built-in tables
    pub fn builtin() -> Self {
        // The built-in tables are checked by the tests below
        Self::from_tables(ReferenceTables::builtin()).unwrap_or_else(|_| Self::empty())
    }

    fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            locations: HashMap::new(),
            facilities: HashMap::new(),
        }
    }

    /// Parses a JSON reference document
    pub fn from_json(json: &str) -> Result<Self, ReferenceError> {
        let tables: ReferenceTables = serde_json::from_str(json)?;
        Self::from_tables(tables)
    }

    /// Indexes and validates a set of tables
    ///
    /// # Errors
    ///
    /// Returns an error if a code is duplicated within its table, a location
    /// references an unknown parent or skips a level, or a facility
    /// references an unknown location.
    pub fn from_tables(tables: ReferenceTables) -> Result<Self, ReferenceError> {
        let mut data = Self::empty();

        for (kind, rows) in [
            (ReferenceKind::Gender, tables.genders),
            (ReferenceKind::Relationship, tables.relationships),
            (ReferenceKind::Profession, tables.professions),
            (ReferenceKind::FamilyType, tables.family_types),
        ] {
            let index = data.entries.entry(kind).or_default();
            for row in rows {
                if index.contains_key(&row.code) {
                    return Err(ReferenceError::DuplicateCode {
                        kind: kind.to_string(),
                        code: row.code,
                    });
                }
                index.insert(row.code.clone(), row);
            }
        }

        for location in tables.locations {
            if data.locations.contains_key(&location.code) {
                return Err(ReferenceError::DuplicateCode {
                    kind: "location".to_string(),
                    code: location.code,
                });
            }
            data.locations.insert(location.code.clone(), location);
        }
        for location in data.locations.values() {
            if let Some(parent_code) = &location.parent_code {
                let parent = data.locations.get(parent_code).ok_or_else(|| {
                    ReferenceError::UnknownParent {
                        code: location.code.clone(),
                        parent: parent_code.clone(),
                    }
                })?;
                if parent.level + 1 != location.level {
                    return Err(ReferenceError::InvalidHierarchy {
                        code: location.code.clone(),
                        parent: parent_code.clone(),
                    });
                }
            }
        }

        for mut facility in tables.health_facilities {
            facility.code = normalize_facility_code(&facility.code);
            if !data.locations.contains_key(&facility.location_code) {
                return Err(ReferenceError::UnknownFacilityLocation {
                    code: facility.code,
                    location: facility.location_code,
                });
            }
            if data.facilities.contains_key(&facility.code) {
                return Err(ReferenceError::DuplicateCode {
                    kind: "health facility".to_string(),
                    code: facility.code,
                });
            }
            data.facilities.insert(facility.code.clone(), facility);
        }

        debug!(
            locations = data.locations.len(),
            facilities = data.facilities.len(),
            "Reference data loaded"
        );
        Ok(data)
    }
}

impl Default for StaticReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceData for StaticReferenceData {
    fn lookup(&self, kind: ReferenceKind, code: &str) -> Option<&ReferenceEntry> {
        self.entries.get(&kind).and_then(|index| index.get(code))
    }

    fn location(&self, code: &str) -> Option<&Location> {
        self.locations.get(code)
    }

    fn health_facility(&self, code: &str) -> Option<&HealthFacility> {
        self.facilities.get(&normalize_facility_code(code))
    }
}
