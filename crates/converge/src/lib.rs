//! # Converge
//!
//! A declarative reconciliation engine for host resources.
//!
//! Given a list of desired resources, the engine probes each one, diffs the
//! live state against the desired state, and produces an ordered plan of
//! change records. The applier then executes the plan change by change and
//! records the observed result in a state store.
//!
//! ## Core Concepts
//!
//! - **Resource**: something on the host with state (a user, an installed service)
//! - **Snapshot**: an attribute map describing a resource at a point in time
//! - **ChangeRecord**: one typed delta for one resource
//! - **Plan**: change records in resource declaration order
//! - **StateStore**: last-known snapshots keyed by resource id
//!
//! ## Example
//!
//! ```ignore
//! use converge::{Applier, MemoryStore, Planner};
//!
//! let resources = load_resources()?;
//! let mut store = MemoryStore::new();
//!
//! let plan = Planner::new(&store, false).plan(&resources)?;
//! println!("{} change(s)", plan.summary().total_changes());
//!
//! let report = Applier::new(&mut store, false).apply(plan.changes(), &resources)?;
//! assert!(report.is_clean());
//! ```
//!
//! ## Error policy
//!
//! Planning is all or nothing. Applying is fail-fast with no rollback:
//! changes applied before a failure stay applied. Failing to record state
//! after a successful change is reported in the [`ApplyReport`] and never
//! aborts the run.

pub mod applier;
pub mod change;
pub mod diff;
pub mod error;
pub mod planner;
pub mod progress;
pub mod resource;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use applier::{Applier, ApplyReport};
pub use change::{ChangeKind, ChangeRecord, MASKED, display_value, is_secret_key};
pub use diff::{PlanSummary, group_by_kind};
pub use error::{Error, Result, SnapshotError};
pub use planner::{DesiredSource, Plan, Planner};
pub use progress::{NoProgress, ProgressCallback};
pub use resource::Resource;
pub use snapshot::{Attributes, Snapshot};
pub use store::{MemoryStore, StateStore};
