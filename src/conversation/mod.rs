//! Conversation state management.
//!
//! This module owns the ordered, context-scoped message list and the rules
//! that keep it consistent under optimistic mutation: send reconciliation,
//! the edit-eligibility frontier, duplicate-submission guards, and the
//! mutate-then-resynchronize pattern that folds backend side effects back
//! into the display.

pub mod state;
pub mod store;

pub use state::{Draft, NOTICE_TTL, Notice, Pending};
pub use store::{ConversationStore, DEFAULT_PAGE_SIZE, StoreError, StoreResult};
