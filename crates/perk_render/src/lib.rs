use std::fmt::Write as _;

use perk_core::core_api::{Catalog, Perk, Plan};
use perk_core::images::ImageIndex;
use perk_core::special::{SpecialStat, SpecialStats};
use serde_json::{Map as JsonMap, Value as JsonValue};

pub const PLAN_TITLE: &str = "Fallout 4 Perk Planner Output";

const TITLE_RULE_WIDTH: usize = 35;
const LEVEL_COL_WIDTH: usize = 6;
const PERK_COL_WIDTH: usize = 20;
const RANK_COL_WIDTH: usize = 4;
const LIST_NAME_WIDTH: usize = 22;
const EMPTY_CELL: &str = "-";
const NO_IMAGE: &str = "[No Image]";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    /// Replaces the title line; `None` writes [`PLAN_TITLE`].
    pub title: Option<String>,
    /// Skip levels without a pick instead of printing `-` rows.
    pub compact: bool,
}

pub fn render_plan_text(
    plan: &Plan,
    special: &SpecialStats,
    options: &TextRenderOptions,
) -> String {
    let title = options.title.as_deref().unwrap_or(PLAN_TITLE);
    let mut out = String::new();
    writeln!(&mut out, "{title}").expect("writing to String cannot fail");
    writeln!(&mut out, "{}", "=".repeat(TITLE_RULE_WIDTH))
        .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(&mut out, "SPECIAL distribution:").expect("writing to String cannot fail");
    for (stat, value) in special.iter() {
        writeln!(&mut out, "  {}: {value}", stat.letter()).expect("writing to String cannot fail");
    }
    writeln!(&mut out).expect("writing to String cannot fail");

    let border = table_border();
    writeln!(&mut out, "{border}").expect("writing to String cannot fail");
    writeln!(&mut out, "{}", table_row("Level", "Perk", "Rank"))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "{border}").expect("writing to String cannot fail");

    for level in plan.range().levels() {
        let row = match plan.get(level) {
            Some(entry) => table_row(&level.to_string(), &entry.perk, &entry.rank.to_string()),
            None if options.compact => continue,
            None => table_row(&level.to_string(), EMPTY_CELL, EMPTY_CELL),
        };
        writeln!(&mut out, "{row}").expect("writing to String cannot fail");
    }
    writeln!(&mut out, "{border}").expect("writing to String cannot fail");

    out
}

pub fn render_plan_json(plan: &Plan, special: &SpecialStats) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("special".to_string(), special_to_json(special));
    out.insert(
        "first_level".to_string(),
        JsonValue::from(plan.range().first()),
    );
    out.insert("last_level".to_string(), JsonValue::from(plan.range().last()));
    out.insert(
        "entries".to_string(),
        JsonValue::Array(
            plan.entries()
                .map(|(level, entry)| {
                    let mut item = JsonMap::new();
                    item.insert("level".to_string(), JsonValue::from(level));
                    item.insert("perk".to_string(), JsonValue::String(entry.perk.clone()));
                    item.insert("rank".to_string(), JsonValue::from(entry.rank));
                    JsonValue::Object(item)
                })
                .collect(),
        ),
    );
    JsonValue::Object(out)
}

/// Per-stat perk listing. `stat` narrows the listing to one SPECIAL tree.
pub fn render_perk_list(
    catalog: &Catalog,
    stat: Option<SpecialStat>,
    images: Option<&ImageIndex>,
) -> String {
    let mut out = String::new();
    for tree in selected_stats(stat) {
        let perks = catalog.perks_for(tree);
        if perks.is_empty() {
            continue;
        }
        if !out.is_empty() {
            writeln!(&mut out).expect("writing to String cannot fail");
        }
        writeln!(&mut out, "[{}] {}", tree.letter(), tree.name())
            .expect("writing to String cannot fail");
        for perk in perks {
            let image = images
                .and_then(|index| index.lookup(&perk.name))
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| NO_IMAGE.to_string());
            writeln!(
                &mut out,
                "  {:<width$} {}={:<2} ranks={} levels={}  {image}",
                perk.name,
                tree.letter(),
                perk.special.get(&tree).copied().unwrap_or(0),
                perk.max_rank(),
                format_levels(perk),
                width = LIST_NAME_WIDTH,
            )
            .expect("writing to String cannot fail");
        }
    }
    out
}

pub fn render_perk_list_json(
    catalog: &Catalog,
    stat: Option<SpecialStat>,
    images: Option<&ImageIndex>,
) -> JsonValue {
    let mut out = JsonMap::new();
    for tree in selected_stats(stat) {
        let perks: Vec<JsonValue> = catalog
            .perks_for(tree)
            .into_iter()
            .map(|perk| perk_to_json(perk, images))
            .collect();
        if perks.is_empty() {
            continue;
        }
        out.insert(tree.letter().to_string(), JsonValue::Array(perks));
    }
    JsonValue::Object(out)
}

fn selected_stats(stat: Option<SpecialStat>) -> Vec<SpecialStat> {
    match stat {
        Some(stat) => vec![stat],
        None => SpecialStat::ALL.to_vec(),
    }
}

fn perk_to_json(perk: &Perk, images: Option<&ImageIndex>) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("name".to_string(), JsonValue::String(perk.name.clone()));
    out.insert(
        "description".to_string(),
        perk.description
            .clone()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
    );
    out.insert(
        "category".to_string(),
        JsonValue::String(perk.category.letter().to_string()),
    );
    out.insert(
        "required_stat".to_string(),
        JsonValue::from(perk.required_stat()),
    );
    out.insert("max_rank".to_string(), JsonValue::from(perk.max_rank()));
    out.insert(
        "rank_levels".to_string(),
        JsonValue::Array(
            perk.ranks
                .iter()
                .map(|r| JsonValue::from(r.min_level))
                .collect(),
        ),
    );
    out.insert(
        "requires".to_string(),
        perk.requires
            .clone()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
    );
    if let Some(index) = images {
        out.insert(
            "image".to_string(),
            index
                .lookup(&perk.name)
                .map(|path| JsonValue::String(path.display().to_string()))
                .unwrap_or(JsonValue::Null),
        );
    }
    JsonValue::Object(out)
}

fn special_to_json(special: &SpecialStats) -> JsonValue {
    let mut out = JsonMap::new();
    for (stat, value) in special.iter() {
        out.insert(stat.letter().to_string(), JsonValue::from(value));
    }
    JsonValue::Object(out)
}

fn format_levels(perk: &Perk) -> String {
    perk.ranks
        .iter()
        .map(|r| r.min_level.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn table_border() -> String {
    format!(
        "+{}+{}+{}+",
        "-".repeat(LEVEL_COL_WIDTH + 2),
        "-".repeat(PERK_COL_WIDTH + 2),
        "-".repeat(RANK_COL_WIDTH + 2)
    )
}

fn table_row(level: &str, perk: &str, rank: &str) -> String {
    format!(
        "| {level:<LEVEL_COL_WIDTH$} | {perk:<PERK_COL_WIDTH$} | {rank:<RANK_COL_WIDTH$} |"
    )
}
