//! Interactive terminal client for the Ava chat backend.
//!
//! Run with: `cargo run --bin avachat`
//!
//! Signs in (or registers) against the backend, restores a persisted session
//! when one exists, then drops into a chat loop. Plain input is sent as a
//! message; slash commands drive everything else:
//!
//! - `/context <onboarding|support|marketing>` switch conversation
//! - `/edit <text>` amend your most recent unedited message
//! - `/delete <id>` delete one of your messages
//! - `/action <create_report|call_lead|schedule_meeting>` quick action
//! - `/refresh` reload the current conversation
//! - `/logout` clear the session and exit
//! - `/quit` exit, keeping the session

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};

use avachat::conversation::{ConversationStore, StoreError, StoreResult};
use avachat::gateway::ChatGateway;
use avachat::gateway::config::GatewayConfig;
use avachat::gateway::rest::RestGateway;
use avachat::gateway::types::{ActionType, ChatContext, Message, RegisterRequest, Role};
use avachat::session::{SessionManager, SqliteTokenStore};

/// Environment variable selecting the credential database path.
const DB_PATH_ENV: &str = "AVACHAT_DB";

/// Default credential database path.
const DEFAULT_DB_PATH: &str = "avachat.db";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<()> {
    let config = GatewayConfig::from_env();
    println!("Ava chat console (backend: {})", config.base_url);

    let gateway: Arc<dyn ChatGateway> =
        Arc::new(RestGateway::new(config).context("building gateway client")?);

    let db_path = std::env::var(DB_PATH_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let tokens = Arc::new(
        SqliteTokenStore::open(&db_path)
            .await
            .context("opening credential store")?,
    );

    let session = SessionManager::new(gateway.clone(), tokens);

    if session.restore().await.context("restoring session")? {
        if let Some(user) = session.user().await {
            println!("Welcome back, {}.", user.username);
        }
    } else {
        sign_in(&session, gateway.as_ref()).await?;
    }

    let store = ConversationStore::new(gateway);
    chat(&session, &store).await
}

/// Prompt for credentials until a session is established.
async fn sign_in(session: &SessionManager, gateway: &dyn ChatGateway) -> Result<()> {
    loop {
        let choice = prompt("Sign [i]n or [r]egister? ")?;
        let token = if choice.eq_ignore_ascii_case("r") {
            let username = prompt("Username: ")?;
            let email = prompt("Email: ")?;
            let first_name = optional(prompt("First name (optional): ")?);
            let last_name = optional(prompt("Last name (optional): ")?);
            let password = rpassword::prompt_password("Password: ")?;
            gateway
                .register(RegisterRequest {
                    username,
                    password,
                    email,
                    first_name,
                    last_name,
                })
                .await
        } else {
            let username = prompt("Username: ")?;
            let password = rpassword::prompt_password("Password: ")?;
            gateway.login(&username, &password).await
        };

        let token = match token {
            Ok(token) => token,
            Err(err) => {
                println!("! {err}");
                continue;
            }
        };

        match session.login(&token.access_token).await {
            Ok(user) => {
                println!("Welcome, {}.", user.username);
                return Ok(());
            }
            Err(err) => println!("! {err}"),
        }
    }
}

/// The read-eval-send loop.
async fn chat(session: &SessionManager, store: &ConversationStore) -> Result<()> {
    report(store, store.refresh().await).await;
    render(store).await;

    let stdin = io::stdin();
    print_prompt(store).await?;
    for line in stdin.lock().lines() {
        let line = line.context("reading input")?;
        let input = line.trim();

        if input == "/quit" {
            break;
        }
        if input == "/logout" {
            session.logout().await.context("logging out")?;
            println!("Logged out.");
            break;
        }

        dispatch(store, input).await;
        render(store).await;
        print_prompt(store).await?;
    }

    Ok(())
}

/// Apply one line of input to the store.
async fn dispatch(store: &ConversationStore, input: &str) {
    if input.is_empty() {
        return;
    }

    if let Some(rest) = input.strip_prefix("/context ") {
        match rest.parse::<ChatContext>() {
            Ok(context) => report(store, store.set_context(context).await).await,
            Err(err) => println!("! {err}"),
        }
    } else if let Some(rest) = input.strip_prefix("/edit ") {
        report(store, edit_latest(store, rest).await).await;
    } else if let Some(rest) = input.strip_prefix("/delete ") {
        match rest.trim().parse::<i64>() {
            Ok(id) => report(store, store.delete(id).await).await,
            Err(_) => println!("! usage: /delete <id>"),
        }
    } else if let Some(rest) = input.strip_prefix("/action ") {
        let action = ActionType::from(rest.trim());
        report(store, store.invoke_action(action).await.map(|_| ())).await;
    } else if input == "/refresh" {
        report(store, store.refresh().await).await;
    } else if input.starts_with('/') {
        println!("! unknown command: {input}");
    } else {
        report(store, store.send(input).await.map(|_| ())).await;
    }
}

/// Amend the most recent unedited user message with the given text.
async fn edit_latest(store: &ConversationStore, text: &str) -> StoreResult<()> {
    let Some(id) = store.editable_id().await else {
        return Err(StoreError::NotEditable);
    };
    store.begin_edit(id).await?;
    store.change_draft(id, text).await?;
    store.save_edit(id).await
}

/// Surface a failed operation: prefer the store's notice, fall back to the
/// raw error.
async fn report(store: &ConversationStore, result: StoreResult<()>) {
    if let Err(err) = result {
        match store.take_error().await {
            Some(notice) => println!("! {notice}"),
            None => println!("! {err}"),
        }
    }
}

/// Print the current conversation.
async fn render(store: &ConversationStore) {
    println!("--- {} ---", store.context().await);
    for message in store.messages().await {
        print_message(&message);
    }
}

fn print_message(message: &Message) {
    let author = match message.role {
        Role::User => "you",
        Role::Assistant => "ava",
    };
    let edited = if message.is_edited { " (edited)" } else { "" };
    println!("[{:>4}] {author}: {}{edited}", message.id, message.content);
}

async fn print_prompt(store: &ConversationStore) -> Result<()> {
    print!("{}> ", store.context().await);
    io::stdout().flush().context("flushing prompt")
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().context("flushing prompt")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading input")?;
    Ok(line.trim().to_string())
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
