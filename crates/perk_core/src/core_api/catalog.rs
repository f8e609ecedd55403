use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::special::{SPECIAL_MAX, SPECIAL_MIN, SpecialStat};

use super::error::{CoreError, CoreErrorCode};
use super::types::{Perk, PerkRecord, RankRequirement};

/// The read-only perk table, loaded once from the flattened JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<PerkRecord>,
    perks: Vec<Perk>,
    index: BTreeMap<String, usize>,
}

impl Catalog {
    pub fn load_path(path: &Path) -> Result<Self, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        Self::load_bytes(bytes).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })
    }

    pub fn load_bytes<B: AsRef<[u8]>>(bytes: B) -> Result<Self, CoreError> {
        let records: Vec<PerkRecord> = serde_json::from_slice(bytes.as_ref()).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("malformed perk table: {e}"),
            )
        })?;
        Self::from_records(records)
    }

    pub fn from_records(records: Vec<PerkRecord>) -> Result<Self, CoreError> {
        if records.is_empty() {
            return Err(CoreError::new(
                CoreErrorCode::Parse,
                "perk table contains no records",
            ));
        }

        let mut order: Vec<String> = Vec::new();
        let mut grouped: BTreeMap<String, Vec<&PerkRecord>> = BTreeMap::new();
        let mut seen_ranks = BTreeSet::new();

        for (row, record) in records.iter().enumerate() {
            check_record(row, record)?;
            if !seen_ranks.insert((record.perk.as_str(), record.rank)) {
                return Err(CoreError::new(
                    CoreErrorCode::Parse,
                    format!(
                        "record {row}: duplicate rank {} for perk '{}'",
                        record.rank, record.perk
                    ),
                ));
            }
            let group = grouped.entry(record.perk.clone()).or_default();
            if group.is_empty() {
                order.push(record.perk.clone());
            }
            group.push(record);
        }

        let mut perks = Vec::with_capacity(order.len());
        let mut index = BTreeMap::new();
        for name in order {
            let Some(group) = grouped.remove(&name) else {
                continue;
            };
            let perk = build_perk(&name, group)?;
            index.insert(name, perks.len());
            perks.push(perk);
        }

        for perk in &perks {
            let Some(requires) = &perk.requires else {
                continue;
            };
            if requires == &perk.name || !index.contains_key(requires) {
                return Err(CoreError::new(
                    CoreErrorCode::Parse,
                    format!(
                        "perk '{}' requires unknown perk '{requires}'",
                        perk.name
                    ),
                ));
            }
        }

        Ok(Self {
            records,
            perks,
            index,
        })
    }

    /// Number of rows in the source table (one per perk rank).
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn perk_count(&self) -> usize {
        self.perks.len()
    }

    pub fn records(&self) -> &[PerkRecord] {
        &self.records
    }

    /// Perks in order of first appearance in the table.
    pub fn perks(&self) -> &[Perk] {
        &self.perks
    }

    pub fn get(&self, name: &str) -> Option<&Perk> {
        self.index.get(name).map(|&i| &self.perks[i])
    }

    /// Case-insensitive lookup, for names typed by a user.
    pub fn find(&self, name: &str) -> Option<&Perk> {
        self.get(name).or_else(|| {
            let trimmed = name.trim();
            self.perks
                .iter()
                .find(|perk| perk.name.eq_ignore_ascii_case(trimmed))
        })
    }

    /// Perks listed under a SPECIAL stat, in table order.
    pub fn perks_for(&self, stat: SpecialStat) -> Vec<&Perk> {
        self.perks
            .iter()
            .filter(|perk| perk.special.contains_key(&stat))
            .collect()
    }

    pub fn requirement(&self, name: &str, rank: u32) -> Option<&RankRequirement> {
        self.get(name).and_then(|perk| perk.requirement(rank))
    }
}

fn check_record(row: usize, record: &PerkRecord) -> Result<(), CoreError> {
    let fail = |message: String| {
        Err(CoreError::new(
            CoreErrorCode::Parse,
            format!("record {row} ('{}'): {message}", record.perk),
        ))
    };

    if record.perk.trim().is_empty() {
        return fail("perk name is empty".to_string());
    }
    if record.rank == 0 {
        return fail("rank must be at least 1".to_string());
    }
    if record.min_level == 0 {
        return fail("min_level must be at least 1".to_string());
    }
    if record.special.is_empty() {
        return fail("no SPECIAL stat given".to_string());
    }
    for (stat, &value) in &record.special {
        if !(SPECIAL_MIN..=SPECIAL_MAX).contains(&value) {
            return fail(format!(
                "{} requirement {value} outside {SPECIAL_MIN}..={SPECIAL_MAX}",
                stat.letter()
            ));
        }
    }
    Ok(())
}

fn build_perk(name: &str, mut group: Vec<&PerkRecord>) -> Result<Perk, CoreError> {
    group.sort_by_key(|record| record.rank);

    for (expected, record) in (1u32..).zip(&group) {
        if record.rank != expected {
            return Err(CoreError::new(
                CoreErrorCode::Parse,
                format!(
                    "perk '{name}' is missing rank {expected} (ranks must run 1..=N)"
                ),
            ));
        }
    }

    let first = group[0];
    let Some(&category) = first.special.keys().next() else {
        return Err(CoreError::new(
            CoreErrorCode::Parse,
            format!("perk '{name}' has no SPECIAL stat"),
        ));
    };

    let description = group
        .iter()
        .filter_map(|record| record.description.as_deref())
        .find(|d| !d.trim().is_empty())
        .map(str::to_string);
    let requires = group.iter().find_map(|record| record.requires.clone());
    let ranks = group
        .iter()
        .map(|record| RankRequirement {
            rank: record.rank,
            min_level: record.min_level,
            description: record.description.clone(),
        })
        .collect();

    Ok(Perk {
        name: name.to_string(),
        description,
        category,
        special: first.special.clone(),
        requires,
        ranks,
    })
}
