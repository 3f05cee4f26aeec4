//! REST implementation of the chat gateway.

use std::sync::RwLock;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::config::GatewayConfig;
use super::error::{GatewayError, GatewayResult};
use super::types::{
    ActionType, ChatContext, ClickActionRequest, Message, RegisterRequest, Role,
    SendMessageRequest, Token, UpdateMessageRequest, User,
};
use super::{ChatGateway, GatewayFuture};

/// FastAPI-style error body, parsed best-effort.
///
/// `detail` is a plain string for most failures and a list of field errors
/// for validation rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Flatten an error-body `detail` value into a one-line notice.
fn render_detail(detail: &serde_json::Value) -> String {
    match detail {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.get("msg")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| item.to_string(), ToString::to_string)
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

/// HTTP client for the messaging backend.
///
/// Holds the current bearer credential; [`ChatGateway::set_token`] is the
/// only writer, so a plain sync lock suffices.
pub struct RestGateway {
    client: Client,
    config: GatewayConfig,
    token: RwLock<Option<String>>,
}

impl RestGateway {
    /// Create a gateway from the given configuration.
    ///
    /// # Errors
    /// Returns [`GatewayError::Config`] if the base URL is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let _ = config.parsed_base_url()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| GatewayError::Config(err.to_string()))?;

        Ok(Self {
            client,
            config,
            token: RwLock::new(None),
        })
    }

    /// Current bearer token, if any.
    fn current_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    /// Attach the bearer credential when one is installed.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.current_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a response onto the error taxonomy and decode the success body.
    async fn handle<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .map_or_else(|| status.to_string(), |detail| render_detail(&detail));
        debug!(%status, %detail, "backend rejected request");
        Err(GatewayError::from_status(status, detail))
    }
}

impl ChatGateway for RestGateway {
    fn login(&self, username: &str, password: &str) -> GatewayFuture<'_, Token> {
        let url = self.config.endpoint("/login");
        let form = [
            ("username", username.to_string()),
            ("password", password.to_string()),
        ];
        Box::pin(async move {
            // Login is form-urlencoded, not JSON (OAuth2 password flow).
            let response = self.client.post(&url).form(&form).send().await?;
            Self::handle(response).await
        })
    }

    fn register(&self, request: RegisterRequest) -> GatewayFuture<'_, Token> {
        let url = self.config.endpoint("/register");
        Box::pin(async move {
            let response = self.client.post(&url).json(&request).send().await?;
            Self::handle(response).await
        })
    }

    fn current_user(&self) -> GatewayFuture<'_, User> {
        let url = self.config.endpoint("/users/me");
        Box::pin(async move {
            let response = self.authorize(self.client.get(&url)).send().await?;
            Self::handle(response).await
        })
    }

    fn messages(
        &self,
        skip: u32,
        limit: u32,
        context: ChatContext,
    ) -> GatewayFuture<'_, Vec<Message>> {
        let url = self.config.endpoint("/messages/");
        Box::pin(async move {
            let response = self
                .authorize(self.client.get(&url))
                .query(&[
                    ("skip", skip.to_string()),
                    ("limit", limit.to_string()),
                    ("context", context.name().to_string()),
                ])
                .send()
                .await?;
            Self::handle(response).await
        })
    }

    fn send_message(
        &self,
        content: &str,
        role: Role,
        context: ChatContext,
    ) -> GatewayFuture<'_, Message> {
        let url = self.config.endpoint("/messages/");
        let body = SendMessageRequest {
            content: content.to_string(),
            role,
            context,
        };
        Box::pin(async move {
            let response = self
                .authorize(self.client.post(&url))
                .json(&body)
                .send()
                .await?;
            Self::handle(response).await
        })
    }

    fn update_message(&self, id: i64, content: &str) -> GatewayFuture<'_, Message> {
        let url = self.config.endpoint(&format!("/messages/{id}"));
        let body = UpdateMessageRequest {
            content: content.to_string(),
        };
        Box::pin(async move {
            let response = self
                .authorize(self.client.put(&url))
                .json(&body)
                .send()
                .await?;
            Self::handle(response).await
        })
    }

    fn delete_message(&self, id: i64) -> GatewayFuture<'_, Message> {
        let url = self.config.endpoint(&format!("/messages/{id}"));
        Box::pin(async move {
            let response = self.authorize(self.client.delete(&url)).send().await?;
            Self::handle(response).await
        })
    }

    fn invoke_action(&self, action: ActionType, context: ChatContext) -> GatewayFuture<'_, Message> {
        let url = self.config.endpoint("/messages/click_action");
        let body = ClickActionRequest {
            action_type: action,
            context,
        };
        Box::pin(async move {
            let response = self
                .authorize(self.client.post(&url))
                .json(&body)
                .send()
                .await?;
            Self::handle(response).await
        })
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_detail_string() {
        let detail = serde_json::json!("Incorrect username or password");
        assert_eq!(render_detail(&detail), "Incorrect username or password");
    }

    #[test]
    fn test_render_detail_validation_list() {
        let detail = serde_json::json!([
            {"loc": ["body", "email"], "msg": "value is not a valid email address"},
            {"loc": ["body", "username"], "msg": "field required"}
        ]);
        assert_eq!(
            render_detail(&detail),
            "value is not a valid email address; field required"
        );
    }

    #[test]
    fn test_token_slot_round_trip() {
        let gateway = RestGateway::new(GatewayConfig::default()).unwrap();
        assert_eq!(gateway.current_token(), None);
        gateway.set_token(Some("abc123".to_string()));
        assert_eq!(gateway.current_token(), Some("abc123".to_string()));
        gateway.set_token(None);
        assert_eq!(gateway.current_token(), None);
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = GatewayConfig::default().with_base_url("nope");
        assert!(RestGateway::new(config).is_err());
    }
}
