use std::collections::BTreeSet;
use std::path::PathBuf;

use perk_core::core_api::{Catalog, LevelRange, PerkChoice, PlanRequest, Rules, generate};
use perk_core::special::{SpecialStat, SpecialStats};
use proptest::prelude::*;

fn load_fixture() -> Catalog {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures/perks_flattened_full.json");
    Catalog::load_path(&path).expect("fixture perk table should load")
}

fn special_from(values: [u8; 7]) -> SpecialStats {
    let mut special = SpecialStats::default();
    for (stat, value) in SpecialStat::ALL.into_iter().zip(values) {
        special.set(stat, value).expect("strategy yields 1..=10");
    }
    special
}

proptest! {
    #[test]
    fn generated_plans_are_always_legal(
        raw_choices in proptest::collection::vec((0usize..17, 1u32..=5, 1u8..=10), 1..8),
        values in proptest::array::uniform7(1u8..=10),
        first in 1u32..=10,
        span in 0u32..=90,
        enforce_special in any::<bool>(),
    ) {
        let catalog = load_fixture();
        let mut seen = BTreeSet::new();
        let choices: Vec<PerkChoice> = raw_choices
            .into_iter()
            .filter(|(index, _, _)| seen.insert(*index))
            .map(|(index, max_rank, priority)| {
                PerkChoice::new(catalog.perks()[index].name.clone(), max_rank, priority)
            })
            .collect();

        let special = special_from(values);
        let rules = if enforce_special {
            Rules::new(special)
        } else {
            Rules::ignoring_special(special)
        };
        let request = PlanRequest {
            rules,
            range: LevelRange::new(first, first + span).expect("first <= last"),
            choices: choices.clone(),
        };

        let plan = generate(&catalog, &request).expect("valid selection");
        prop_assert!(plan.validate(&catalog, &rules).is_empty());

        for (level, entry) in plan.entries() {
            let perk = catalog.get(&entry.perk).expect("planned perk exists");
            let cap = choices
                .iter()
                .find(|c| c.perk == entry.perk)
                .map(|c| c.max_rank)
                .expect("planned perk was chosen");
            prop_assert!(entry.rank <= perk.max_rank());
            prop_assert!(entry.rank <= cap);
            let requirement = perk.requirement(entry.rank).expect("rank exists");
            prop_assert!(level >= requirement.min_level);
            prop_assert!(request.range.contains(level));
        }
    }
}
