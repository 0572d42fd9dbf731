pub mod catalog;
pub mod challenge;
pub mod manuscript;

pub use catalog::{default_worklist, load_worklist_from_toml, resolve_worklist};
pub use challenge::{ChallengePayload, ChallengeRequest};
pub use manuscript::{CodeSource, ItemStatus, Manuscript};
