use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::error::{CoreError, CoreErrorCode};
use super::plan::{LevelRange, Plan, Rules};
use super::types::{Perk, PerkRecord, PlanEntry};

pub const PRIORITY_MIN: u8 = 1;
pub const PRIORITY_MAX: u8 = 10;

/// A perk the user wants in the build, up to `max_rank`. Lower `priority`
/// values are picked first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerkChoice {
    pub perk: String,
    #[serde(default = "default_max_rank")]
    pub max_rank: u32,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_max_rank() -> u32 {
    1
}

fn default_priority() -> u8 {
    PRIORITY_MIN
}

impl PerkChoice {
    pub fn new(perk: impl Into<String>, max_rank: u32, priority: u8) -> Self {
        Self {
            perk: perk.into(),
            max_rank,
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanRequest {
    pub rules: Rules,
    pub range: LevelRange,
    pub choices: Vec<PerkChoice>,
}

struct Chosen<'a> {
    perk: &'a Perk,
    cap: u32,
    priority: u8,
}

/// Fills the level range greedily: at each level the eligible next rank with
/// the smallest `(priority, min_level, rank)` wins, ties going to the earlier
/// catalog row. Levels with nothing eligible stay empty.
pub fn generate(catalog: &Catalog, request: &PlanRequest) -> Result<Plan, CoreError> {
    let chosen = resolve_choices(catalog, &request.choices)?;
    let rules = &request.rules;

    let mut progress: BTreeMap<&str, u32> = chosen.keys().map(|&name| (name, 0)).collect();
    let mut plan = Plan::new(request.range);

    for level in request.range.levels() {
        let mut best: Option<((u8, u32, u32), &PerkRecord)> = None;
        for record in catalog.records() {
            let Some(choice) = chosen.get(record.perk.as_str()) else {
                continue;
            };
            let current = progress.get(record.perk.as_str()).copied().unwrap_or(0);
            if record.rank > choice.cap || record.rank != current + 1 {
                continue;
            }
            if level < record.min_level {
                continue;
            }
            if let Some(requires) = &choice.perk.requires
                && progress.get(requires.as_str()).copied().unwrap_or(0) == 0
            {
                continue;
            }
            if rules.enforce_special && !rules.special.meets(&choice.perk.special) {
                continue;
            }

            let key = (choice.priority, record.min_level, record.rank);
            match best {
                Some((best_key, _)) if best_key <= key => {}
                _ => best = Some((key, record)),
            }
        }

        if let Some((_, record)) = best {
            progress.insert(record.perk.as_str(), record.rank);
            plan.insert_unchecked(
                level,
                PlanEntry {
                    perk: record.perk.clone(),
                    rank: record.rank,
                },
            );
        }
    }

    Ok(plan)
}

fn resolve_choices<'a>(
    catalog: &'a Catalog,
    choices: &[PerkChoice],
) -> Result<BTreeMap<&'a str, Chosen<'a>>, CoreError> {
    if choices.is_empty() {
        return Err(CoreError::new(
            CoreErrorCode::EmptySelection,
            "select at least one perk",
        ));
    }

    let mut chosen = BTreeMap::new();
    for choice in choices {
        let perk = catalog.find(&choice.perk).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::UnknownPerk,
                format!("unknown perk '{}'", choice.perk),
            )
        })?;
        if choice.max_rank == 0 {
            return Err(CoreError::new(
                CoreErrorCode::InvalidSelection,
                format!("max rank for '{}' must be at least 1", perk.name),
            ));
        }
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&choice.priority) {
            return Err(CoreError::new(
                CoreErrorCode::InvalidSelection,
                format!(
                    "priority for '{}' must be between {PRIORITY_MIN} and {PRIORITY_MAX}, got {}",
                    perk.name, choice.priority
                ),
            ));
        }

        let entry = Chosen {
            perk,
            cap: choice.max_rank.min(perk.max_rank()),
            priority: choice.priority,
        };
        if chosen.insert(perk.name.as_str(), entry).is_some() {
            return Err(CoreError::new(
                CoreErrorCode::InvalidSelection,
                format!("perk '{}' selected more than once", perk.name),
            ));
        }
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special::SpecialStat;

    fn record(perk: &str, rank: u32, min_level: u32) -> PerkRecord {
        PerkRecord {
            perk: perk.to_string(),
            rank,
            min_level,
            special: BTreeMap::from([(SpecialStat::Luck, 1)]),
            description: None,
            requires: None,
        }
    }

    #[test]
    fn equal_keys_prefer_earlier_catalog_row() {
        let catalog = Catalog::from_records(vec![
            record("Scrounger", 1, 1),
            record("Fortune Finder", 1, 1),
        ])
        .expect("catalog");
        let request = PlanRequest {
            choices: vec![
                PerkChoice::new("Fortune Finder", 1, 1),
                PerkChoice::new("Scrounger", 1, 1),
            ],
            ..PlanRequest::default()
        };

        let plan = generate(&catalog, &request).expect("plan");
        assert_eq!(plan.get(2).map(|e| e.perk.as_str()), Some("Scrounger"));
        assert_eq!(plan.get(3).map(|e| e.perk.as_str()), Some("Fortune Finder"));
        assert!(plan.get(4).is_none());
    }

    #[test]
    fn duplicate_choice_is_rejected() {
        let catalog = Catalog::from_records(vec![record("Scrounger", 1, 1)]).expect("catalog");
        let request = PlanRequest {
            choices: vec![
                PerkChoice::new("Scrounger", 1, 1),
                PerkChoice::new("scrounger", 1, 2),
            ],
            ..PlanRequest::default()
        };
        let err = generate(&catalog, &request).expect_err("duplicate");
        assert_eq!(err.code, CoreErrorCode::InvalidSelection);
    }
}
