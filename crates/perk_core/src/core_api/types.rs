use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::special::{SpecialStat, SpecialStats};

/// One row of the flattened perk table: a single rank of a single perk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerkRecord {
    pub perk: String,
    pub rank: u32,
    pub min_level: u32,
    #[serde(default)]
    pub special: BTreeMap<SpecialStat, u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankRequirement {
    pub rank: u32,
    pub min_level: u32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perk {
    pub name: String,
    pub description: Option<String>,
    pub category: SpecialStat,
    pub special: BTreeMap<SpecialStat, u8>,
    pub requires: Option<String>,
    pub ranks: Vec<RankRequirement>,
}

impl Perk {
    pub fn max_rank(&self) -> u32 {
        self.ranks.len() as u32
    }

    /// Stat value needed in the perk's own SPECIAL tree.
    pub fn required_stat(&self) -> u8 {
        self.special.get(&self.category).copied().unwrap_or(0)
    }

    pub fn requirement(&self, rank: u32) -> Option<&RankRequirement> {
        if rank == 0 {
            return None;
        }
        self.ranks.get(rank as usize - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanEntry {
    pub perk: String,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDocumentEntry {
    pub level: u32,
    pub perk: String,
    pub rank: u32,
}

/// Serialized form of a plan, used for saving and re-checking plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanDocument {
    #[serde(default)]
    pub special: SpecialStats,
    pub first_level: u32,
    pub last_level: u32,
    pub entries: Vec<PlanDocumentEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    UnknownPerk,
    LevelOutOfRange { first: u32, last: u32 },
    RankAboveMax { max_rank: u32 },
    LevelBelowRequirement { min_level: u32 },
    RankOutOfOrder { expected: u32 },
    DuplicateRank,
    MissingPrerequisite { requires: String },
    SpecialTooLow { stat: SpecialStat, required: u8, actual: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub level: u32,
    pub perk: String,
    pub rank: u32,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}: {} rank {}: ", self.level, self.perk, self.rank)?;
        match &self.kind {
            ViolationKind::UnknownPerk => f.write_str("unknown perk"),
            ViolationKind::LevelOutOfRange { first, last } => {
                write!(f, "level outside plan range {first}..={last}")
            }
            ViolationKind::RankAboveMax { max_rank } => {
                write!(f, "rank exceeds maximum rank {max_rank}")
            }
            ViolationKind::LevelBelowRequirement { min_level } => {
                write!(f, "requires character level {min_level}")
            }
            ViolationKind::RankOutOfOrder { expected } => {
                write!(f, "ranks must be taken in order, next rank is {expected}")
            }
            ViolationKind::DuplicateRank => f.write_str("rank already taken at an earlier level"),
            ViolationKind::MissingPrerequisite { requires } => {
                write!(f, "requires {requires} at an earlier level")
            }
            ViolationKind::SpecialTooLow {
                stat,
                required,
                actual,
            } => write!(f, "requires {}={required}, have {actual}", stat.letter()),
        }
    }
}
