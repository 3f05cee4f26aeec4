//! In-memory state for the conversation store.

use std::time::Duration;

use tokio::time::Instant;

use crate::gateway::types::{ChatContext, Message};

/// How long a failure notice stays visible before auto-expiring.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// A dismissible, auto-expiring failure notice.
#[derive(Clone, Debug)]
pub struct Notice {
    /// Human-readable description of the failure.
    pub text: String,
    raised_at: Instant,
}

impl Notice {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raised_at: Instant::now(),
        }
    }

    /// Whether the notice has outlived its display window.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.raised_at.elapsed() > NOTICE_TTL
    }
}

/// Draft content for the one message currently in edit mode.
///
/// The draft is local-only: the message list keeps the server-confirmed
/// content until the draft is saved, so a failed save leaves the list
/// untouched and the draft intact for a retry.
#[derive(Clone, Debug)]
pub struct Draft {
    /// Id of the message being edited.
    pub id: i64,
    /// Replacement text as typed so far.
    pub content: String,
}

/// Guards preventing duplicate concurrent submissions of one operation kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pending {
    /// A send (optimistic insert through refetch) is in flight.
    pub is_sending: bool,
    /// An edit save is in flight.
    pub is_saving: bool,
}

/// Mutable store fields behind the store's lock.
#[derive(Debug, Default)]
pub(crate) struct ConversationState {
    /// Messages of the current context, in server order.
    pub messages: Vec<Message>,
    /// The active conversation partition.
    pub context: ChatContext,
    /// At most one message may be in edit mode at a time.
    pub draft: Option<Draft>,
    /// Duplicate-submission guards.
    pub pending: Pending,
    /// Most recent user-facing failure, auto-expiring.
    pub notice: Option<Notice>,
    /// Fetch generation; a reload's result is applied only while its
    /// generation is still current, which discards stale responses after a
    /// context switch.
    pub load_seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_notice_is_visible() {
        let notice = Notice::new("something failed");
        assert!(!notice.is_expired());
        assert_eq!(notice.text, "something failed");
    }

    #[test]
    fn test_default_state_starts_in_onboarding() {
        let state = ConversationState::default();
        assert_eq!(state.context, ChatContext::Onboarding);
        assert!(state.messages.is_empty());
        assert!(state.draft.is_none());
        assert!(!state.pending.is_sending);
        assert!(!state.pending.is_saving);
    }
}
