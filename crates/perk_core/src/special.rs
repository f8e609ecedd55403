use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};

pub const SPECIAL_MIN: u8 = 1;
pub const SPECIAL_MAX: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpecialStat {
    #[serde(rename = "S", alias = "Strength")]
    Strength,
    #[serde(rename = "P", alias = "Perception")]
    Perception,
    #[serde(rename = "E", alias = "Endurance")]
    Endurance,
    #[serde(rename = "C", alias = "Charisma")]
    Charisma,
    #[serde(rename = "I", alias = "Intelligence")]
    Intelligence,
    #[serde(rename = "A", alias = "Agility")]
    Agility,
    #[serde(rename = "L", alias = "Luck")]
    Luck,
}

impl SpecialStat {
    pub const ALL: [SpecialStat; 7] = [
        Self::Strength,
        Self::Perception,
        Self::Endurance,
        Self::Charisma,
        Self::Intelligence,
        Self::Agility,
        Self::Luck,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn letter(&self) -> &'static str {
        match *self {
            Self::Strength => "S",
            Self::Perception => "P",
            Self::Endurance => "E",
            Self::Charisma => "C",
            Self::Intelligence => "I",
            Self::Agility => "A",
            Self::Luck => "L",
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Self::Strength => "Strength",
            Self::Perception => "Perception",
            Self::Endurance => "Endurance",
            Self::Charisma => "Charisma",
            Self::Intelligence => "Intelligence",
            Self::Agility => "Agility",
            Self::Luck => "Luck",
        }
    }
}

impl fmt::Display for SpecialStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl FromStr for SpecialStat {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|stat| {
                stat.letter().eq_ignore_ascii_case(trimmed)
                    || stat.name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::InvalidSpecial,
                    format!("unknown SPECIAL stat '{trimmed}' (expected one of S P E C I A L)"),
                )
            })
    }
}

/// A character's SPECIAL distribution. Every stat is kept in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<SpecialStat, u8>",
    into = "BTreeMap<SpecialStat, u8>"
)]
pub struct SpecialStats {
    values: [u8; 7],
}

impl Default for SpecialStats {
    fn default() -> Self {
        Self {
            values: [SPECIAL_MAX; 7],
        }
    }
}

impl SpecialStats {
    pub fn uniform(value: u8) -> Result<Self, CoreError> {
        check_range(SpecialStat::Strength, value)?;
        Ok(Self { values: [value; 7] })
    }

    pub fn get(&self, stat: SpecialStat) -> u8 {
        self.values[stat.index()]
    }

    pub fn set(&mut self, stat: SpecialStat, value: u8) -> Result<(), CoreError> {
        check_range(stat, value)?;
        self.values[stat.index()] = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpecialStat, u8)> + '_ {
        SpecialStat::ALL
            .into_iter()
            .map(move |stat| (stat, self.get(stat)))
    }

    /// Whether every stat requirement in `required` is met by this distribution.
    pub fn meets(&self, required: &BTreeMap<SpecialStat, u8>) -> bool {
        required
            .iter()
            .all(|(stat, &value)| self.get(*stat) >= value)
    }

    /// Applies a comma separated list such as `S=4,P=7,Luck=3`.
    pub fn apply_assignments(&mut self, spec: &str) -> Result<(), CoreError> {
        for part in spec.split(',').filter(|p| !p.trim().is_empty()) {
            let (stat, value) = part.split_once('=').ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::InvalidSpecial,
                    format!("expected STAT=VALUE, got '{}'", part.trim()),
                )
            })?;
            let stat: SpecialStat = stat.parse()?;
            let value: u8 = value.trim().parse().map_err(|_| {
                CoreError::new(
                    CoreErrorCode::InvalidSpecial,
                    format!("invalid value for {stat}: '{}'", value.trim()),
                )
            })?;
            self.set(stat, value)?;
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<SpecialStat, u8>> for SpecialStats {
    type Error = CoreError;

    fn try_from(map: BTreeMap<SpecialStat, u8>) -> Result<Self, Self::Error> {
        let mut stats = Self::default();
        for (stat, value) in map {
            stats.set(stat, value)?;
        }
        Ok(stats)
    }
}

impl From<SpecialStats> for BTreeMap<SpecialStat, u8> {
    fn from(stats: SpecialStats) -> Self {
        stats.iter().collect()
    }
}

fn check_range(stat: SpecialStat, value: u8) -> Result<(), CoreError> {
    if (SPECIAL_MIN..=SPECIAL_MAX).contains(&value) {
        return Ok(());
    }
    Err(CoreError::new(
        CoreErrorCode::InvalidSpecial,
        format!(
            "{} must be between {SPECIAL_MIN} and {SPECIAL_MAX}, got {value}",
            stat.name()
        ),
    ))
}
