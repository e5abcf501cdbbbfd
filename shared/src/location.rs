//! Location / merchant directory records

use serde::{Deserialize, Serialize};

/// A single orderable location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_main_location: bool,
}

/// A merchant and the locations it operates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRecord {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
}

impl MerchantRecord {
    /// The designated main location, else the first listed one
    pub fn primary_location(&self) -> Option<&LocationRecord> {
        self.locations
            .iter()
            .find(|l| l.is_main_location)
            .or_else(|| self.locations.first())
    }
}
