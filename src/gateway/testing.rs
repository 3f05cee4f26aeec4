//! Scripted gateway fake for store and session tests.
//!
//! Replies are queued per operation and popped in call order; a queued reply
//! may carry a delay so tests can interleave in-flight requests under a
//! paused tokio clock.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use super::error::GatewayResult;
use super::types::{
    ASSISTANT_USER_ID, ActionType, ChatContext, Message, RegisterRequest, Role, Token, User,
};
use super::{ChatGateway, GatewayFuture};

type Scripted<T> = Mutex<VecDeque<(Duration, GatewayResult<T>)>>;

/// Build a server-shaped message for test scripts.
pub fn server_message(id: i64, role: Role, content: &str, context: ChatContext) -> Message {
    Message {
        id,
        role,
        content: content.to_string(),
        timestamp: Utc::now(),
        user_id: match role {
            Role::User => 1,
            Role::Assistant => ASSISTANT_USER_ID,
        },
        context,
        parent_id: None,
        is_edited: false,
        is_deleted: false,
    }
}

/// Build a test user identity.
pub fn test_user() -> User {
    User {
        id: 1,
        username: "jaspar".to_string(),
        email: "jaspar@example.com".to_string(),
        first_name: None,
        last_name: None,
    }
}

/// Build a bearer token reply.
pub fn test_token(token: &str) -> Token {
    Token {
        access_token: token.to_string(),
        token_type: "bearer".to_string(),
    }
}

/// Gateway fake with scripted, optionally delayed replies.
#[derive(Default)]
pub struct MockGateway {
    login_results: Scripted<Token>,
    register_results: Scripted<Token>,
    user_results: Scripted<User>,
    fetch_results: Scripted<Vec<Message>>,
    send_results: Scripted<Message>,
    update_results: Scripted<Message>,
    delete_results: Scripted<Message>,
    action_results: Scripted<Message>,
    calls: Mutex<Vec<String>>,
    token: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_login(&self, result: GatewayResult<Token>) {
        self.login_results
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, result));
    }

    pub fn push_register(&self, result: GatewayResult<Token>) {
        self.register_results
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, result));
    }

    pub fn push_user(&self, result: GatewayResult<User>) {
        self.user_results
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, result));
    }

    pub fn push_fetch(&self, result: GatewayResult<Vec<Message>>) {
        self.push_fetch_after(Duration::ZERO, result);
    }

    pub fn push_fetch_after(&self, delay: Duration, result: GatewayResult<Vec<Message>>) {
        self.fetch_results.lock().unwrap().push_back((delay, result));
    }

    pub fn push_send(&self, result: GatewayResult<Message>) {
        self.push_send_after(Duration::ZERO, result);
    }

    pub fn push_send_after(&self, delay: Duration, result: GatewayResult<Message>) {
        self.send_results.lock().unwrap().push_back((delay, result));
    }

    pub fn push_update(&self, result: GatewayResult<Message>) {
        self.push_update_after(Duration::ZERO, result);
    }

    pub fn push_update_after(&self, delay: Duration, result: GatewayResult<Message>) {
        self.update_results.lock().unwrap().push_back((delay, result));
    }

    pub fn push_delete(&self, result: GatewayResult<Message>) {
        self.delete_results
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, result));
    }

    pub fn push_action(&self, result: GatewayResult<Message>) {
        self.action_results
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, result));
    }

    /// All recorded calls, in order.
    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many recorded calls start with the given prefix.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// The bearer token last installed via `set_token`.
    pub fn installed_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn take<T>(queue: &Scripted<T>, op: &str) -> (Duration, GatewayResult<T>) {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left for {op}"))
    }
}

fn respond<T: Send + 'static>(entry: (Duration, GatewayResult<T>)) -> GatewayFuture<'static, T> {
    let (delay, result) = entry;
    Box::pin(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    })
}

impl ChatGateway for MockGateway {
    fn login(&self, username: &str, _password: &str) -> GatewayFuture<'_, Token> {
        self.record(format!("login:{username}"));
        respond(Self::take(&self.login_results, "login"))
    }

    fn register(&self, request: RegisterRequest) -> GatewayFuture<'_, Token> {
        self.record(format!("register:{}", request.username));
        respond(Self::take(&self.register_results, "register"))
    }

    fn current_user(&self) -> GatewayFuture<'_, User> {
        self.record("current_user".to_string());
        respond(Self::take(&self.user_results, "current_user"))
    }

    fn messages(
        &self,
        skip: u32,
        limit: u32,
        context: ChatContext,
    ) -> GatewayFuture<'_, Vec<Message>> {
        self.record(format!("messages:{}:{skip}:{limit}", context.name()));
        respond(Self::take(&self.fetch_results, "messages"))
    }

    fn send_message(
        &self,
        content: &str,
        _role: Role,
        context: ChatContext,
    ) -> GatewayFuture<'_, Message> {
        self.record(format!("send:{}:{content}", context.name()));
        respond(Self::take(&self.send_results, "send_message"))
    }

    fn update_message(&self, id: i64, content: &str) -> GatewayFuture<'_, Message> {
        self.record(format!("update:{id}:{content}"));
        respond(Self::take(&self.update_results, "update_message"))
    }

    fn delete_message(&self, id: i64) -> GatewayFuture<'_, Message> {
        self.record(format!("delete:{id}"));
        respond(Self::take(&self.delete_results, "delete_message"))
    }

    fn invoke_action(&self, action: ActionType, context: ChatContext) -> GatewayFuture<'_, Message> {
        self.record(format!("action:{action}:{context}"));
        respond(Self::take(&self.action_results, "invoke_action"))
    }

    fn set_token(&self, token: Option<String>) {
        self.record(match &token {
            Some(_) => "set_token:some".to_string(),
            None => "set_token:none".to_string(),
        });
        *self.token.lock().unwrap() = token;
    }
}
