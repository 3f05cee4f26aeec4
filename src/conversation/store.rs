//! Context-scoped message list with optimistic mutation.
//!
//! The store owns the ordered message list for the active context and keeps
//! it consistent under concurrent user-initiated mutations: sends are
//! inserted optimistically and reconciled with the server record, edits are
//! gated by an eligibility frontier, and every server-side mutation is
//! followed by an authoritative refetch so backend side effects (assistant
//! auto-replies, cascading deletions) reach the display without the client
//! having to predict them.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::ChatGateway;
use crate::gateway::error::GatewayError;
use crate::gateway::types::{ActionType, ChatContext, Message, Role};

use super::state::{ConversationState, Draft, Notice};

/// Reload window for a context switch; matches the backend's default page
/// cap so a switch shows the full recent history in one round trip.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Errors surfaced by conversation store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another save is already in flight.
    #[error("a save is already in progress")]
    Busy,

    /// The message is not the editable frontier.
    #[error("only the most recent unedited user message can be edited")]
    NotEditable,

    /// The message is not the one currently in edit mode.
    #[error("message {0} is not in edit mode")]
    NotEditing(i64),

    /// The backend call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The one message id currently eligible for editing.
///
/// Users may only amend their latest unedited turn; retroactive edits would
/// desynchronize the assistant replies generated after them.
fn editable_frontier(messages: &[Message]) -> Option<i64> {
    messages
        .iter()
        .rev()
        .find(|message| message.role == Role::User && !message.is_deleted && !message.is_edited)
        .map(|message| message.id)
}

/// Conversation store for the currently selected context.
///
/// Shareable behind an `Arc`; interior state sits behind an async lock that
/// is never held across a network round trip, so overlapping operations
/// interleave safely and stale responses are discarded by generation checks
/// at application time.
pub struct ConversationStore {
    gateway: Arc<dyn ChatGateway>,
    state: tokio::sync::Mutex<ConversationState>,
    /// Temporary ids for optimistic messages: negative and decrementing,
    /// provably disjoint from the server's positive id space.
    temp_ids: AtomicI64,
    page_size: u32,
}

impl ConversationStore {
    /// Create a store over the given gateway, starting in the default
    /// context with an empty list.
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            gateway,
            state: tokio::sync::Mutex::new(ConversationState::default()),
            temp_ids: AtomicI64::new(-1),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the reload window.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Switch the active context and reload its message list.
    ///
    /// The previous list is replaced wholesale on success. On failure the
    /// prior (now stale) list is left in place and a notice is recorded; the
    /// context switch itself still takes effect.
    ///
    /// # Errors
    /// Returns an error if the reload fails.
    pub async fn set_context(&self, context: ChatContext) -> StoreResult<()> {
        {
            let mut state = self.state.lock().await;
            debug!(from = %state.context, to = %context, "switching context");
            state.context = context;
            // The draft belongs to the outgoing context's list.
            state.draft = None;
        }
        self.reload_current().await
    }

    /// Reload the current context's messages from the backend.
    ///
    /// # Errors
    /// Returns an error if the fetch fails.
    pub async fn refresh(&self) -> StoreResult<()> {
        self.reload_current().await
    }

    /// Send a user message.
    ///
    /// Returns `Ok(false)` without any effect when the trimmed text is empty
    /// or another send is already in flight. Otherwise the message is
    /// appended optimistically under a temporary id, persisted, reconciled
    /// with the server record, and the whole context is refetched to pick up
    /// the assistant's reply. On failure the optimistic entry is rolled back
    /// and a notice is recorded.
    ///
    /// # Errors
    /// Returns an error if the backend rejects or fails the send.
    pub async fn send(&self, text: &str) -> StoreResult<bool> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(false);
        }

        let temp_id = self.temp_ids.fetch_sub(1, Ordering::Relaxed);
        let context = {
            let mut state = self.state.lock().await;
            if state.pending.is_sending {
                debug!("send ignored: another send is in flight");
                return Ok(false);
            }
            state.pending.is_sending = true;
            let context = state.context;
            state
                .messages
                .push(Self::optimistic_message(temp_id, content, context));
            context
        };

        match self.gateway.send_message(content, Role::User, context).await {
            Ok(message) => {
                {
                    let mut state = self.state.lock().await;
                    // Reconcile by replacement; the temporary entry may be
                    // gone already if the context switched mid-flight.
                    if let Some(slot) =
                        state.messages.iter_mut().find(|message| message.id == temp_id)
                    {
                        *slot = message;
                    }
                }
                if let Err(err) = self.reload_current().await {
                    warn!("post-send refetch failed: {err}");
                }
                self.state.lock().await.pending.is_sending = false;
                Ok(true)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.messages.retain(|message| message.id != temp_id);
                state.pending.is_sending = false;
                state.notice = Some(Notice::new(format!("Failed to send message: {err}")));
                Err(err.into())
            }
        }
    }

    /// Enter edit mode for a message.
    ///
    /// Only the most recent user message that is neither deleted nor already
    /// edited is eligible; any other id is rejected without mutating state.
    ///
    /// # Errors
    /// Returns [`StoreError::NotEditable`] for ineligible ids.
    pub async fn begin_edit(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if editable_frontier(&state.messages) != Some(id) {
            state.notice = Some(Notice::new(
                "Only your most recent unedited message can be edited",
            ));
            return Err(StoreError::NotEditable);
        }

        let content = state
            .messages
            .iter()
            .find(|message| message.id == id)
            .map(|message| message.content.clone())
            .unwrap_or_default();
        state.draft = Some(Draft { id, content });
        Ok(())
    }

    /// Update the draft text of the message in edit mode. No network effect.
    ///
    /// # Errors
    /// Returns [`StoreError::NotEditing`] when `id` is not the active draft.
    pub async fn change_draft(&self, id: i64, text: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        match state.draft.as_mut() {
            Some(draft) if draft.id == id => {
                draft.content = text.to_string();
                Ok(())
            }
            _ => Err(StoreError::NotEditing(id)),
        }
    }

    /// Persist the draft for the message in edit mode.
    ///
    /// A draft that trims to empty is a deletion request and falls through
    /// to [`ConversationStore::delete`]. On success the message is replaced
    /// with the server-returned version, edit mode ends, and the context is
    /// refetched (edits may regenerate a downstream assistant turn). A
    /// vanished target (`NotFound`) clears edit mode and triggers the
    /// corrective refetch; other failures keep the draft so the user can
    /// retry.
    ///
    /// # Errors
    /// Returns [`StoreError::Busy`] when a save is already in flight,
    /// [`StoreError::NotEditing`] when `id` is not the active draft, or the
    /// gateway failure otherwise.
    pub async fn save_edit(&self, id: i64) -> StoreResult<()> {
        let content = {
            let mut state = self.state.lock().await;
            let Some(draft) = state.draft.as_ref() else {
                return Err(StoreError::NotEditing(id));
            };
            if draft.id != id {
                return Err(StoreError::NotEditing(id));
            }
            if state.pending.is_saving {
                return Err(StoreError::Busy);
            }
            let content = draft.content.clone();
            state.pending.is_saving = true;
            content
        };

        let trimmed = content.trim().to_string();
        let result = if trimmed.is_empty() {
            debug!(id, "empty draft treated as delete");
            self.delete(id).await
        } else {
            self.persist_edit(id, &trimmed).await
        };
        self.state.lock().await.pending.is_saving = false;
        result
    }

    /// Delete a message, then refetch so backend-side cascades (such as a
    /// linked assistant reply) are reflected.
    ///
    /// A backend `NotFound` means the target is already gone and is treated
    /// as success; the corrective refetch still runs.
    ///
    /// # Errors
    /// Returns an error if the deletion fails for any other reason.
    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        match self.gateway.delete_message(id).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                debug!(id, "delete target already gone");
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.notice = Some(Notice::new(format!("Failed to delete message: {err}")));
                return Err(err.into());
            }
        }

        {
            let mut state = self.state.lock().await;
            if state.draft.as_ref().is_some_and(|draft| draft.id == id) {
                state.draft = None;
            }
        }
        self.reload_current().await
    }

    /// Trigger a quick action scoped to the current context and append the
    /// assistant message the backend answers with.
    ///
    /// # Errors
    /// Returns an error if the backend rejects or fails the action.
    pub async fn invoke_action(&self, action: ActionType) -> StoreResult<Message> {
        let context = self.state.lock().await.context;

        match self.gateway.invoke_action(action, context).await {
            Ok(message) => {
                let mut state = self.state.lock().await;
                // Discard if the context moved on while the call was out.
                if state.context == context {
                    state.messages.push(message.clone());
                }
                Ok(message)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.notice = Some(Notice::new(format!("Action failed: {err}")));
                Err(err.into())
            }
        }
    }

    /// Snapshot of the displayed message list: current context only, server
    /// order, soft-deleted entries filtered out.
    pub async fn messages(&self) -> Vec<Message> {
        let state = self.state.lock().await;
        state
            .messages
            .iter()
            .filter(|message| !message.is_deleted)
            .cloned()
            .collect()
    }

    /// The active conversation partition.
    pub async fn context(&self) -> ChatContext {
        self.state.lock().await.context
    }

    /// Id of the one message currently eligible for [`ConversationStore::begin_edit`].
    pub async fn editable_id(&self) -> Option<i64> {
        editable_frontier(&self.state.lock().await.messages)
    }

    /// Id of the message in edit mode, if any.
    pub async fn editing_id(&self) -> Option<i64> {
        self.state.lock().await.draft.as_ref().map(|draft| draft.id)
    }

    /// Draft text of the message in edit mode, if any.
    pub async fn draft_content(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .draft
            .as_ref()
            .map(|draft| draft.content.clone())
    }

    /// Whether a send sequence is in flight.
    pub async fn is_sending(&self) -> bool {
        self.state.lock().await.pending.is_sending
    }

    /// Whether an edit save is in flight.
    pub async fn is_saving(&self) -> bool {
        self.state.lock().await.pending.is_saving
    }

    /// The current failure notice, unless it has expired.
    pub async fn last_error(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        if state.notice.as_ref().is_some_and(Notice::is_expired) {
            state.notice = None;
        }
        state.notice.as_ref().map(|notice| notice.text.clone())
    }

    /// Dismiss and return the current failure notice.
    pub async fn take_error(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        state
            .notice
            .take()
            .filter(|notice| !notice.is_expired())
            .map(|notice| notice.text)
    }

    /// Persist an edit and resynchronize.
    async fn persist_edit(&self, id: i64, content: &str) -> StoreResult<()> {
        match self.gateway.update_message(id, content).await {
            Ok(updated) => {
                {
                    let mut state = self.state.lock().await;
                    if let Some(slot) = state.messages.iter_mut().find(|message| message.id == id)
                    {
                        *slot = updated;
                    }
                    state.draft = None;
                }
                if let Err(err) = self.reload_current().await {
                    warn!("post-edit refetch failed: {err}");
                }
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                {
                    let mut state = self.state.lock().await;
                    state.draft = None;
                    state.notice = Some(Notice::new("That message no longer exists"));
                }
                // Corrective refetch so the stale entry disappears.
                if let Err(refetch_err) = self.reload_current().await {
                    warn!("corrective refetch failed: {refetch_err}");
                }
                Err(err.into())
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.notice = Some(Notice::new(format!("Failed to update message: {err}")));
                Err(err.into())
            }
        }
    }

    /// Fetch the current context's full window and apply it if still
    /// current.
    ///
    /// The result of an in-flight fetch is discarded when the context (or a
    /// newer reload) has superseded it before resolution.
    async fn reload_current(&self) -> StoreResult<()> {
        let (context, seq) = {
            let mut state = self.state.lock().await;
            state.load_seq += 1;
            (state.context, state.load_seq)
        };

        match self.gateway.messages(0, self.page_size, context).await {
            Ok(messages) => {
                let mut state = self.state.lock().await;
                if state.load_seq == seq && state.context == context {
                    state.messages = messages;
                } else {
                    debug!(%context, "discarding stale fetch result");
                }
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                if state.load_seq == seq {
                    state.notice =
                        Some(Notice::new(format!("Failed to load messages: {err}")));
                }
                Err(err.into())
            }
        }
    }

    /// Build the locally-rendered placeholder for an in-flight send.
    fn optimistic_message(id: i64, content: &str, context: ChatContext) -> Message {
        Message {
            id,
            role: Role::User,
            content: content.to_string(),
            // Reconciled with the server's copy on success.
            timestamp: Utc::now(),
            user_id: 0,
            context,
            parent_id: None,
            is_edited: false,
            is_deleted: false,
        }
    }
}
