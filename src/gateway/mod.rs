//! Typed client for the chat backend's REST API.
//!
//! The [`ChatGateway`] trait mirrors the backend contract one-to-one so the
//! session and conversation stores can be exercised against scripted fakes;
//! [`rest::RestGateway`] is the production transport.

pub mod config;
pub mod error;
pub mod rest;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

use std::future::Future;
use std::pin::Pin;

use self::error::GatewayResult;
use self::types::{ActionType, ChatContext, Message, RegisterRequest, Role, Token, User};

/// Boxed future type for gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = GatewayResult<T>> + Send + 'a>>;

/// Transport-agnostic interface to the messaging backend.
///
/// The credential is held by the gateway itself ([`ChatGateway::set_token`])
/// and attached as a bearer header to every authenticated call; only `login`
/// and `register` tolerate an absent token.
pub trait ChatGateway: Send + Sync {
    /// Exchange credentials for a bearer token.
    fn login(&self, username: &str, password: &str) -> GatewayFuture<'_, Token>;

    /// Create an account and return its bearer token.
    fn register(&self, request: RegisterRequest) -> GatewayFuture<'_, Token>;

    /// Resolve the identity behind the current bearer token.
    fn current_user(&self) -> GatewayFuture<'_, User>;

    /// Fetch a page of messages for one context, in server order.
    fn messages(
        &self,
        skip: u32,
        limit: u32,
        context: ChatContext,
    ) -> GatewayFuture<'_, Vec<Message>>;

    /// Persist a new message.
    fn send_message(
        &self,
        content: &str,
        role: Role,
        context: ChatContext,
    ) -> GatewayFuture<'_, Message>;

    /// Replace the content of an existing message.
    fn update_message(&self, id: i64, content: &str) -> GatewayFuture<'_, Message>;

    /// Delete a message; the deleted record is returned.
    fn delete_message(&self, id: i64) -> GatewayFuture<'_, Message>;

    /// Trigger a quick action; the backend answers with one assistant message.
    fn invoke_action(&self, action: ActionType, context: ChatContext) -> GatewayFuture<'_, Message>;

    /// Install or clear the bearer credential attached to subsequent calls.
    fn set_token(&self, token: Option<String>);
}
