//! Searchable entity kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of searchable object.
///
/// The declaration order defines the object kind ordinal used to tag rows in
/// global search results, so new kinds must be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Space,
    Project,
    Experiment,
    Sample,
    DataSet,
    Material,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Space,
        Self::Project,
        Self::Experiment,
        Self::Sample,
        Self::DataSet,
        Self::Material,
    ];

    pub fn ordinal(self) -> i32 {
        match self {
            Self::Space => 0,
            Self::Project => 1,
            Self::Experiment => 2,
            Self::Sample => 3,
            Self::DataSet => 4,
            Self::Material => 5,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| i64::from(k.ordinal()) == ordinal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Space => "SPACE",
            Self::Project => "PROJECT",
            Self::Experiment => "EXPERIMENT",
            Self::Sample => "SAMPLE",
            Self::DataSet => "DATA_SET",
            Self::Material => "MATERIAL",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
