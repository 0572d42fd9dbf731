pub mod item_ctx;
pub mod unlock_flow;

pub use item_ctx::ItemCtx;
pub use unlock_flow::{FlowOutcome, UnlockFlow};
