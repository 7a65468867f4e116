#![warn(missing_docs)]
//! World Memory Context: a read-only query surface joining the
//! Execution Store's recent-record projections with town/faction
//! summaries computed from the snapshot.

mod query;
mod scope;
mod summary;

pub use query::{build_context, WorldMemoryContext};
pub use scope::ContextScope;
pub use summary::{summarize_faction, summarize_town, FactionSummary, TownSummary};
