mod catalog;
mod error;
mod plan;
mod planner;
mod types;

pub use catalog::Catalog;
pub use error::{CoreError, CoreErrorCode};
pub use plan::{LevelRange, MAX_LEVEL, Plan, Rules};
pub use planner::{PerkChoice, PlanRequest, generate};
pub use types::{
    Perk, PerkRecord, PlanDocument, PlanDocumentEntry, PlanEntry, RankRequirement, Violation,
    ViolationKind,
};
