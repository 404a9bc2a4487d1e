//! Development pillar vocabulary.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The named life/development domains a user is coached through.
///
/// Each user progresses through an independent pipeline per pillar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PillarType {
    SelfCare,
    Skills,
    Talent,
    Brand,
    Economy,
    OpenTrack,
}

/// All pillars, in display order.
pub const ALL_PILLARS: [PillarType; 6] = [
    PillarType::SelfCare,
    PillarType::Skills,
    PillarType::Talent,
    PillarType::Brand,
    PillarType::Economy,
    PillarType::OpenTrack,
];

impl PillarType {
    /// Parse a pillar string from the database or a URL path segment.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "self_care" => Ok(Self::SelfCare),
            "skills" => Ok(Self::Skills),
            "talent" => Ok(Self::Talent),
            "brand" => Ok(Self::Brand),
            "economy" => Ok(Self::Economy),
            "open_track" => Ok(Self::OpenTrack),
            _ => Err(CoreError::Validation(format!(
                "Invalid pillar '{s}'. Must be one of: self_care, skills, talent, brand, economy, open_track"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfCare => "self_care",
            Self::Skills => "skills",
            Self::Talent => "talent",
            Self::Brand => "brand",
            Self::Economy => "economy",
            Self::OpenTrack => "open_track",
        }
    }

    /// Human-readable label for the pillar.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SelfCare => "Self-care",
            Self::Skills => "Skills",
            Self::Talent => "Talent",
            Self::Brand => "Brand",
            Self::Economy => "Economy",
            Self::OpenTrack => "Open Track",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_pillar() {
        for pillar in ALL_PILLARS {
            assert_eq!(PillarType::from_str_db(pillar.as_str()).unwrap(), pillar);
        }
    }

    #[test]
    fn rejects_unknown_pillar() {
        assert!(PillarType::from_str_db("wealth").is_err());
    }
}
