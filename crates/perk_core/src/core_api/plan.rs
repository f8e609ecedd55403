use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use crate::special::SpecialStats;

use super::catalog::Catalog;
use super::error::{CoreError, CoreErrorCode};
use super::types::{PlanDocument, PlanDocumentEntry, PlanEntry, Violation, ViolationKind};

pub const DEFAULT_FIRST_LEVEL: u32 = 2;
pub const DEFAULT_LAST_LEVEL: u32 = 100;
/// Highest level a plan may cover. Fallout 4 stops being stable past 275.
pub const MAX_LEVEL: u32 = 275;

/// Inclusive range of character levels that receive a perk pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    first: u32,
    last: u32,
}

impl Default for LevelRange {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST_LEVEL,
            last: DEFAULT_LAST_LEVEL,
        }
    }
}

impl LevelRange {
    pub fn new(first: u32, last: u32) -> Result<Self, CoreError> {
        if last > MAX_LEVEL {
            return Err(CoreError::new(
                CoreErrorCode::InvalidPlan,
                format!("last level {last} is above the level cap {MAX_LEVEL}"),
            ));
        }
        if first == 0 || first > last {
            return Err(CoreError::new(
                CoreErrorCode::InvalidPlan,
                format!("invalid level range {first}..={last}"),
            ));
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    pub fn contains(&self, level: u32) -> bool {
        (self.first..=self.last).contains(&level)
    }

    pub fn levels(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }
}

/// Rule inputs that come from the character rather than the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub special: SpecialStats,
    pub enforce_special: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self::new(SpecialStats::default())
    }
}

impl Rules {
    pub fn new(special: SpecialStats) -> Self {
        Self {
            special,
            enforce_special: true,
        }
    }

    pub fn ignoring_special(special: SpecialStats) -> Self {
        Self {
            special,
            enforce_special: false,
        }
    }
}

/// At most one perk rank per level, keyed by level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    range: LevelRange,
    entries: BTreeMap<u32, PlanEntry>,
}

impl Plan {
    pub fn new(range: LevelRange) -> Self {
        Self {
            range,
            entries: BTreeMap::new(),
        }
    }

    pub fn range(&self) -> LevelRange {
        self.range
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, level: u32) -> Option<&PlanEntry> {
        self.entries.get(&level)
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, &PlanEntry)> + '_ {
        self.entries.iter().map(|(&level, entry)| (level, entry))
    }

    /// Highest rank of `perk` held once `level` has been picked.
    pub fn rank_at(&self, perk: &str, level: u32) -> u32 {
        self.entries
            .range(..=level)
            .filter(|(_, entry)| entry.perk == perk)
            .map(|(_, entry)| entry.rank)
            .max()
            .unwrap_or(0)
    }

    pub fn highest_rank(&self, perk: &str) -> u32 {
        self.rank_at(perk, u32::MAX)
    }

    /// Places `perk` at `rank` on `level`, replacing whatever was there.
    ///
    /// The edit is rejected when it would introduce a violation that the plan
    /// did not already have; the plan is left untouched in that case.
    pub fn assign(
        &mut self,
        catalog: &Catalog,
        rules: &Rules,
        level: u32,
        perk: &str,
        rank: u32,
    ) -> Result<Option<PlanEntry>, Violation> {
        let before = self.validate(catalog, rules);

        let mut candidate = self.clone();
        let replaced = candidate.entries.insert(
            level,
            PlanEntry {
                perk: perk.to_string(),
                rank,
            },
        );

        let after = candidate.validate(catalog, rules);
        if let Some(introduced) = after.into_iter().find(|v| !before.contains(v)) {
            return Err(introduced);
        }

        *self = candidate;
        Ok(replaced)
    }

    /// Removes the pick at `level`. Later ranks that depended on it are left
    /// in place and show up in `validate`.
    pub fn clear(&mut self, level: u32) -> Option<PlanEntry> {
        self.entries.remove(&level)
    }

    pub(crate) fn insert_unchecked(&mut self, level: u32, entry: PlanEntry) {
        self.entries.insert(level, entry);
    }

    pub fn validate(&self, catalog: &Catalog, rules: &Rules) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut taken: BTreeSet<(&str, u32)> = BTreeSet::new();
        let mut highest: BTreeMap<&str, u32> = BTreeMap::new();

        for (&level, entry) in &self.entries {
            let mut push = |kind: ViolationKind| {
                violations.push(Violation {
                    level,
                    perk: entry.perk.clone(),
                    rank: entry.rank,
                    kind,
                });
            };

            if !self.range.contains(level) {
                push(ViolationKind::LevelOutOfRange {
                    first: self.range.first(),
                    last: self.range.last(),
                });
            }

            let Some(perk) = catalog.get(&entry.perk) else {
                push(ViolationKind::UnknownPerk);
                continue;
            };

            if entry.rank > perk.max_rank() {
                push(ViolationKind::RankAboveMax {
                    max_rank: perk.max_rank(),
                });
            }
            if let Some(requirement) = perk.requirement(entry.rank)
                && level < requirement.min_level
            {
                push(ViolationKind::LevelBelowRequirement {
                    min_level: requirement.min_level,
                });
            }

            let key = (perk.name.as_str(), entry.rank);
            if taken.contains(&key) {
                push(ViolationKind::DuplicateRank);
            } else if entry.rank == 0
                || (entry.rank > 1 && !taken.contains(&(perk.name.as_str(), entry.rank - 1)))
            {
                let next = highest.get(perk.name.as_str()).copied().unwrap_or(0) + 1;
                push(ViolationKind::RankOutOfOrder { expected: next });
            }

            if let Some(requires) = &perk.requires
                && !highest.contains_key(requires.as_str())
            {
                push(ViolationKind::MissingPrerequisite {
                    requires: requires.clone(),
                });
            }

            if rules.enforce_special {
                for (&stat, &required) in &perk.special {
                    let actual = rules.special.get(stat);
                    if actual < required {
                        push(ViolationKind::SpecialTooLow {
                            stat,
                            required,
                            actual,
                        });
                    }
                }
            }

            if entry.rank > 0 {
                taken.insert(key);
                let best = highest.entry(perk.name.as_str()).or_insert(0);
                *best = (*best).max(entry.rank);
            }
        }

        violations
    }

    pub fn to_document(&self, special: &SpecialStats) -> PlanDocument {
        PlanDocument {
            special: *special,
            first_level: self.range.first(),
            last_level: self.range.last(),
            entries: self
                .entries
                .iter()
                .map(|(&level, entry)| PlanDocumentEntry {
                    level,
                    perk: entry.perk.clone(),
                    rank: entry.rank,
                })
                .collect(),
        }
    }

    /// Rebuilds a plan from its saved form. Only the shape is checked here;
    /// use [`Plan::validate`] for the perk rules.
    pub fn from_document(document: &PlanDocument) -> Result<Self, CoreError> {
        let range = LevelRange::new(document.first_level, document.last_level)?;
        let mut plan = Self::new(range);
        for entry in &document.entries {
            if !range.contains(entry.level) {
                return Err(CoreError::new(
                    CoreErrorCode::InvalidPlan,
                    format!(
                        "entry for level {} lies outside {}..={}",
                        entry.level,
                        range.first(),
                        range.last()
                    ),
                ));
            }
            if plan.entries.contains_key(&entry.level) {
                return Err(CoreError::new(
                    CoreErrorCode::InvalidPlan,
                    format!("level {} has more than one perk", entry.level),
                ));
            }
            plan.insert_unchecked(
                entry.level,
                PlanEntry {
                    perk: entry.perk.clone(),
                    rank: entry.rank,
                },
            );
        }
        Ok(plan)
    }
}
