//! Reference table types and the built-in defaults

use serde::{Deserialize, Serialize};
use std::fmt;

/// The flat code lists kept in reference data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Gender,
    Relationship,
    Profession,
    FamilyType,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Gender => "gender",
            ReferenceKind::Relationship => "relationship",
            ReferenceKind::Profession => "profession",
            ReferenceKind::FamilyType => "family type",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code and its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub code: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ReferenceEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            active: true,
        }
    }
}

/// A node in the administrative location hierarchy
///
/// Level 1 is the top of the hierarchy (region); each child sits exactly one
/// level below its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub code: String,
    pub name: String,
    pub level: u8,
    #[serde(default)]
    pub parent_code: Option<String>,
}

/// A health facility that may receive claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthFacility {
    /// Upper-case facility code
    pub code: String,
    pub name: String,
    pub location_code: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Serializable form of the full reference data set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceTables {
    pub genders: Vec<ReferenceEntry>,
    pub relationships: Vec<ReferenceEntry>,
    pub professions: Vec<ReferenceEntry>,
    pub family_types: Vec<ReferenceEntry>,
    pub locations: Vec<Location>,
    pub health_facilities: Vec<HealthFacility>,
}

impl ReferenceTables {
    /// Codes shipped with the system
    pub fn builtin() -> Self {
        let entries = |rows: &[(&str, &str)]| {
            rows.iter()
                .map(|(code, name)| ReferenceEntry::new(*code, *name))
                .collect::<Vec<_>>()
        };
        let location = |code: &str, name: &str, level: u8, parent: Option<&str>| Location {
            code: code.to_string(),
            name: name.to_string(),
            level,
            parent_code: parent.map(str::to_string),
        };

        Self {
            genders: entries(&[("M", "Male"), ("F", "Female"), ("O", "Other")]),
            relationships: entries(&[
                ("RL-001", "Spouse"),
                ("RL-002", "Mother"),
                ("RL-003", "Father"),
                ("RL-004", "Daughter"),
                ("RL-005", "Son"),
                ("RL-006", "Grand Mother"),
                ("RL-007", "Grand Father"),
            ]),
            professions: entries(&[
                ("PR-001", "Farmer"),
                ("PR-002", "Employee"),
                ("PR-003", "Self Employed"),
                ("PR-004", "Student"),
                ("PR-005", "Homemaker"),
                ("PR-006", "Other"),
            ]),
            family_types: entries(&[("GP-001", "Family"), ("GP-002", "Community")]),
            locations: vec![
                location("R1", "Central Region", 1, None),
                location("R1D1", "Capital District", 2, Some("R1")),
                location("R1D1M1", "City Municipality", 3, Some("R1D1")),
                location("R1D1M1V1", "Riverside Village", 4, Some("R1D1M1")),
                location("R1D2", "Hill District", 2, Some("R1")),
                location("R1D2M1", "Hill Municipality", 3, Some("R1D2")),
            ],
            health_facilities: vec![
                HealthFacility {
                    code: "HF-001".to_string(),
                    name: "Central Referral Hospital".to_string(),
                    location_code: "R1D1".to_string(),
                    active: true,
                },
                HealthFacility {
                    code: "HF-002".to_string(),
                    name: "Riverside Health Centre".to_string(),
                    location_code: "R1D1M1V1".to_string(),
                    active: true,
                },
                HealthFacility {
                    code: "HF-099".to_string(),
                    name: "Old Hill Dispensary".to_string(),
                    location_code: "R1D2M1".to_string(),
                    active: false,
                },
            ],
        }
    }
}
