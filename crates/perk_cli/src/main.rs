use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};
use perk_core::core_api::{
    Catalog, CoreError, CoreErrorCode, LevelRange, PerkChoice, Plan, PlanDocument, PlanRequest,
    Rules, generate,
};
use perk_core::images::{ImageIndex, normalize_image_names};
use perk_core::special::{SpecialStat, SpecialStats};
use perk_render::{
    TextRenderOptions, render_perk_list, render_perk_list_json, render_plan_json, render_plan_text,
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PERKS_PATH: &str = "perks_flattened_full.json";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Flattened perk table (JSON array, one record per perk rank)
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "PERK_PLANNER_PERKS",
        default_value = DEFAULT_PERKS_PATH
    )]
    perks: PathBuf,
    /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List perks grouped by SPECIAL stat
    Perks(PerksArgs),
    /// Generate a perk plan, preview it, and optionally export it
    Plan(PlanArgs),
    /// Check a saved plan against the perk rules
    Check(CheckArgs),
    /// Inspect or normalize a directory of perk images
    Images(ImagesArgs),
}

#[derive(Debug, Args)]
struct PerksArgs {
    #[arg(long, value_name = "S|P|E|C|I|A|L", value_parser = parse_stat)]
    stat: Option<SpecialStat>,
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Perk to include, as NAME[:MAX_RANK[:PRIORITY]]; repeatable
    #[arg(long = "pick", value_name = "PERK", value_parser = parse_choice)]
    picks: Vec<PerkChoice>,
    /// JSON selection file; command-line flags override its values
    #[arg(long, value_name = "FILE")]
    selection: Option<PathBuf>,
    /// SPECIAL distribution, e.g. S=4,P=7,A=9
    #[arg(long, value_name = "STAT=VALUE,...")]
    special: Option<String>,
    #[arg(long = "first-level")]
    first_level: Option<u32>,
    #[arg(long = "last-level")]
    last_level: Option<u32>,
    #[arg(long = "ignore-special")]
    ignore_special: bool,
    /// Omit levels without a pick from the text output
    #[arg(long)]
    compact: bool,
    /// Title line for the text output
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,
    #[arg(long)]
    json: bool,
    /// Write the rendered plan here instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Also save the plan as a JSON document for `check`
    #[arg(long = "save-plan", value_name = "FILE")]
    save_plan: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(value_name = "PLAN.json")]
    path: PathBuf,
    #[arg(long = "ignore-special")]
    ignore_special: bool,
}

#[derive(Debug, Args)]
struct ImagesArgs {
    #[arg(value_name = "DIR")]
    dir: PathBuf,
    /// Rename files to their normalized perk names
    #[arg(long, conflicts_with = "missing")]
    normalize: bool,
    /// List catalog perks that have no image
    #[arg(long)]
    missing: bool,
}

/// Selection file layout; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectionFile {
    special: Option<SpecialStats>,
    #[serde(default)]
    perks: Vec<PerkChoice>,
    first_level: Option<u32>,
    last_level: Option<u32>,
    #[serde(default)]
    ignore_special: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Perks(args) => run_perks(&cli.perks, args),
        Command::Plan(args) => run_plan(&cli.perks, args),
        Command::Check(args) => run_check(&cli.perks, args),
        Command::Images(args) => run_images(&cli.perks, args),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_perks(perks_path: &Path, args: &PerksArgs) {
    let catalog = load_catalog(perks_path);
    let images = args.images.as_deref().map(scan_images);

    if args.json {
        let value = render_perk_list_json(&catalog, args.stat, images.as_ref());
        print_json(&value);
    } else {
        print!("{}", render_perk_list(&catalog, args.stat, images.as_ref()));
    }
}

fn run_plan(perks_path: &Path, args: &PlanArgs) {
    let catalog = load_catalog(perks_path);
    let request = build_request(args);
    debug!(
        choices = request.choices.len(),
        first = request.range.first(),
        last = request.range.last(),
        enforce_special = request.rules.enforce_special,
        "generating plan"
    );

    let plan = generate(&catalog, &request).unwrap_or_else(|e| {
        if e.code == CoreErrorCode::EmptySelection {
            eprintln!("Select at least one perk (--pick or --selection)");
            process::exit(2);
        }
        fail("Error generating plan", e)
    });
    info!(
        picks = plan.len(),
        levels = request.range.last() - request.range.first() + 1,
        "plan generated"
    );
    for choice in &request.choices {
        let placed = catalog
            .find(&choice.perk)
            .map(|perk| plan.highest_rank(&perk.name))
            .unwrap_or(0);
        if placed == 0 {
            warn!(perk = %choice.perk, "selected perk could not be placed in the level range");
        }
    }

    let special = request.rules.special;
    let rendered = if args.json {
        json_string(&render_plan_json(&plan, &special))
    } else {
        let options = TextRenderOptions {
            title: args.title.clone(),
            compact: args.compact,
        };
        render_plan_text(&plan, &special, &options)
    };

    match &args.output {
        Some(path) => {
            write_file(path, &rendered);
            println!("Perk plan saved to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    if let Some(path) = &args.save_plan {
        let document = plan.to_document(&special);
        let json = serde_json::to_string_pretty(&document)
            .unwrap_or_else(|e| fail("Error serializing plan", e));
        write_file(path, &format!("{json}\n"));
        info!(path = %path.display(), "plan document saved");
    }
}

fn run_check(perks_path: &Path, args: &CheckArgs) {
    let catalog = load_catalog(perks_path);
    let bytes = fs::read(&args.path)
        .unwrap_or_else(|e| fail(&format!("Error reading {}", args.path.display()), e));
    let document: PlanDocument = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| fail(&format!("Error parsing plan {}", args.path.display()), e));
    let plan = Plan::from_document(&document)
        .unwrap_or_else(|e| fail(&format!("Invalid plan {}", args.path.display()), e));

    let rules = if args.ignore_special {
        Rules::ignoring_special(document.special)
    } else {
        Rules::new(document.special)
    };
    let violations = plan.validate(&catalog, &rules);
    if violations.is_empty() {
        println!("OK: {} picks, no violations", plan.len());
        return;
    }

    for violation in &violations {
        println!("{violation}");
    }
    eprintln!("{} violation(s) found", violations.len());
    process::exit(1);
}

fn run_images(perks_path: &Path, args: &ImagesArgs) {
    if args.normalize {
        let renamed = normalize_image_names(&args.dir)
            .unwrap_or_else(|e| fail("Error normalizing image names", e));
        for (src, dst) in &renamed {
            println!("{} -> {}", src.display(), dst.display());
        }
        info!(renamed = renamed.len(), "renaming complete");
        return;
    }

    let index = scan_images(&args.dir);
    if args.missing {
        let catalog = load_catalog(perks_path);
        for perk in catalog.perks() {
            if index.lookup(&perk.name).is_none() {
                println!("{}", perk.name);
            }
        }
        return;
    }

    if index.is_empty() {
        warn!(dir = %args.dir.display(), "no perk images found");
    }
    for (key, path) in index.iter() {
        println!("{key}={}", path.display());
    }
}

fn build_request(args: &PlanArgs) -> PlanRequest {
    let selection = match &args.selection {
        Some(path) => load_selection(path),
        None => SelectionFile::default(),
    };

    let mut special = selection.special.unwrap_or_default();
    if let Some(spec) = &args.special {
        special.apply_assignments(spec).unwrap_or_else(|e| {
            eprintln!("Invalid --special: {e}");
            process::exit(2);
        });
    }

    let mut choices = selection.perks;
    for pick in &args.picks {
        choices.retain(|existing| !existing.perk.eq_ignore_ascii_case(pick.perk.trim()));
        choices.push(pick.clone());
    }

    let defaults = LevelRange::default();
    let first = args
        .first_level
        .or(selection.first_level)
        .unwrap_or(defaults.first());
    let last = args
        .last_level
        .or(selection.last_level)
        .unwrap_or(defaults.last());
    let range = LevelRange::new(first, last).unwrap_or_else(|e| {
        eprintln!("Invalid level range: {e}");
        process::exit(2);
    });

    let rules = if args.ignore_special || selection.ignore_special {
        Rules::ignoring_special(special)
    } else {
        Rules::new(special)
    };

    PlanRequest {
        rules,
        range,
        choices,
    }
}

fn load_catalog(path: &Path) -> Catalog {
    let catalog = Catalog::load_path(path).unwrap_or_else(|e| {
        eprintln!("Error loading perk table: {}", path.display());
        eprintln!("  {e}");
        process::exit(1);
    });
    info!(
        path = %path.display(),
        records = catalog.record_count(),
        perks = catalog.perk_count(),
        "perk table loaded"
    );
    catalog
}

fn load_selection(path: &Path) -> SelectionFile {
    let bytes = fs::read(path)
        .unwrap_or_else(|e| fail(&format!("Error reading {}", path.display()), e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| fail(&format!("Error parsing selection {}", path.display()), e))
}

fn scan_images(dir: &Path) -> ImageIndex {
    let index = ImageIndex::scan(dir).unwrap_or_else(|e| fail("Error scanning images", e));
    debug!(dir = %dir.display(), images = index.len(), "image index built");
    index
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents)
        .unwrap_or_else(|e| fail(&format!("Error writing {}", path.display()), e));
}

fn print_json(value: &serde_json::Value) {
    println!("{}", json_string(value));
}

fn json_string(value: &serde_json::Value) -> String {
    let mut text =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| fail("Error rendering JSON", e));
    text.push('\n');
    text
}

fn fail(context: &str, err: impl Display) -> ! {
    eprintln!("{context}: {err}");
    process::exit(1);
}

fn parse_stat(value: &str) -> Result<SpecialStat, String> {
    value.parse().map_err(|e: CoreError| e.message)
}

fn parse_choice(value: &str) -> Result<PerkChoice, String> {
    let mut parts = value.split(':');
    let perk = parts.next().unwrap_or_default().trim();
    if perk.is_empty() {
        return Err("perk name is empty".to_string());
    }
    let max_rank = match parts.next() {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid max rank '{raw}'"))?,
        None => 1,
    };
    let priority = match parts.next() {
        Some(raw) => raw
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid priority '{raw}'"))?,
        None => 1,
    };
    if parts.next().is_some() {
        return Err(format!("expected NAME[:MAX_RANK[:PRIORITY]], got '{value}'"));
    }
    Ok(PerkChoice::new(perk, max_rank, priority))
}
