//! Auth command - sign in, sign up, sign out

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Input, Password, Select};
use serde::Serialize;

use renizo_core::services::SessionService;
use renizo_core::{
    AuthError, AuthErrorCode, AuthSession, LogEvent, LoginCredentials, OperationResult,
    RegisterData, SessionState, User, UserRole,
};

use super::{get_context, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Account password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// customer or provider
        #[arg(long)]
        role: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out and forget the selected town
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Exchange the current session for a fresh one
    Refresh {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// What the CLI reveals about the resident session. Never the token itself.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub state: &'static str,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_fingerprint: Option<String>,
    #[serde(skip)]
    remaining: Option<Duration>,
}

impl SessionSummary {
    /// Snapshot of the resident session, judged at a single instant of the
    /// service's own clock
    pub fn of(sessions: &SessionService) -> Self {
        let now = sessions.now();
        let resident = sessions.resident();
        match SessionState::evaluate(resident.as_ref(), now).into_session() {
            Some(session) => Self::from_session(&session, now),
            None => Self {
                state: "anonymous",
                expired: resident.is_some(),
                user: None,
                expires_at: None,
                token_fingerprint: None,
                remaining: None,
            },
        }
    }

    fn from_session(session: &AuthSession, now: DateTime<Utc>) -> Self {
        Self {
            state: "authenticated",
            expired: false,
            user: Some(session.user.clone()),
            expires_at: Some(session.expires_at),
            token_fingerprint: Some(session.token_fingerprint()),
            remaining: session.remaining_at(now),
        }
    }

    /// One-line description for tables
    pub fn describe(&self) -> String {
        match (&self.user, self.remaining) {
            (Some(user), Some(remaining)) => format!(
                "{} ({}), {} left",
                user.name,
                user.role(),
                output::format_remaining(remaining)
            ),
            (Some(user), None) => format!("{} ({})", user.name, user.role()),
            (None, _) if self.expired => "expired".to_string(),
            (None, _) => "signed out".to_string(),
        }
    }
}

pub fn run(command: AuthCommands) -> Result<()> {
    match command {
        AuthCommands::Login {
            email,
            password,
            json,
        } => login(email, password, json),
        AuthCommands::Register {
            email,
            password,
            name,
            phone,
            role,
            json,
        } => register(email, password, name, phone, role, json),
        AuthCommands::Logout { json } => logout(json),
        AuthCommands::Whoami { json } => whoami(json),
        AuthCommands::Refresh { json } => refresh(json),
    }
}

fn login(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let email = match email {
        Some(e) => e,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new().with_prompt("Password").interact()?,
    };

    match ctx.sessions.login(&LoginCredentials::new(email, password)) {
        Ok(session) => {
            log_event(
                &logger,
                LogEvent::new("login_succeeded")
                    .with_command("auth login")
                    .with_role(session.user.role()),
            );
            report_session(&ctx.sessions, &session, "Signed in", json)
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("login_failed")
                    .with_command("auth login")
                    .with_auth_error(&e),
            );
            fail(&e, json)
        }
    }
}

fn register(
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    role: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let email = match email {
        Some(e) => e,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()?,
    };
    let name = match name {
        Some(n) => n,
        None => Input::new().with_prompt("Name").interact_text()?,
    };
    let phone = match phone {
        Some(p) => p,
        None => Input::new()
            .with_prompt("Phone")
            .allow_empty(true)
            .interact_text()?,
    };
    let role = match role {
        Some(r) => r.parse::<UserRole>()?,
        None => {
            let roles = [UserRole::Customer, UserRole::Provider];
            let choice = Select::new()
                .with_prompt("I am a")
                .items(&roles.iter().map(|r| r.as_str()).collect::<Vec<_>>())
                .default(0)
                .interact()?;
            roles[choice]
        }
    };

    let data = RegisterData {
        email,
        password,
        name,
        phone,
        role,
    };

    match ctx.sessions.register(&data) {
        Ok(session) => {
            log_event(
                &logger,
                LogEvent::new("registered")
                    .with_command("auth register")
                    .with_role(role),
            );
            report_session(&ctx.sessions, &session, "Account created, signed in", json)
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("register_failed")
                    .with_command("auth register")
                    .with_auth_error(&e),
            );
            fail(&e, json)
        }
    }
}

fn logout(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let had_session = ctx.sign_out();

    log_event(
        &get_logger(),
        LogEvent::new("signed_out").with_command("auth logout"),
    );

    if json {
        return output::json(&OperationResult::ok(serde_json::json!({
            "hadSession": had_session
        })));
    }

    if had_session {
        output::success("Signed out");
    } else {
        output::info("No one was signed in");
    }
    Ok(())
}

fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = SessionSummary::of(&ctx.sessions);

    if json {
        return output::json(&summary);
    }

    match &summary.user {
        Some(user) => {
            let mut table = output::create_table();
            table.add_row(vec!["Name", user.name.as_str()]);
            table.add_row(vec!["Email", user.email.as_str()]);
            table.add_row(vec!["Role", user.role().as_str()]);
            if !user.phone.is_empty() {
                table.add_row(vec!["Phone", user.phone.as_str()]);
            }
            let remaining = summary
                .remaining
                .map(output::format_remaining)
                .unwrap_or_default();
            table.add_row(vec!["Session", remaining.as_str()]);
            println!("{}", table);
        }
        None if summary.expired => {
            output::warning("Session expired. Run 'renizo auth login' to sign in again.");
            ctx.sessions.clear_if_expired();
        }
        None => println!("{}", "Not signed in".dimmed()),
    }
    Ok(())
}

fn refresh(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    match ctx.sessions.refresh() {
        Ok(Some(session)) => {
            log_event(
                &logger,
                LogEvent::new("session_refreshed")
                    .with_command("auth refresh")
                    .with_role(session.user.role()),
            );
            report_session(&ctx.sessions, &session, "Session refreshed", json)
        }
        Ok(None) => {
            if json {
                return output::json(&OperationResult::<SessionSummary>::fail(
                    "No valid session to refresh",
                ));
            }
            output::warning("No valid session to refresh. Run 'renizo auth login'.");
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("refresh_failed")
                    .with_command("auth refresh")
                    .with_auth_error(&e),
            );
            fail(&e, json)
        }
    }
}

fn report_session(
    sessions: &SessionService,
    session: &AuthSession,
    headline: &str,
    json: bool,
) -> Result<()> {
    let summary = SessionSummary::from_session(session, sessions.now());
    if json {
        return output::json(&OperationResult::ok(summary));
    }
    output::success(&format!("{} as {}", headline, session.user.name));
    println!("  {}", summary.describe().dimmed());
    Ok(())
}

/// User-facing text per error code. The service's message is shown only
/// when the code says nothing useful.
fn explain(error: &AuthError) -> String {
    match error.code {
        AuthErrorCode::InvalidCredentials => "Email or password is incorrect".to_string(),
        AuthErrorCode::UserExists => {
            "An account with this email already exists. Try 'renizo auth login'.".to_string()
        }
        AuthErrorCode::NetworkError => {
            "Could not reach the identity service. Check your connection and try again."
                .to_string()
        }
        AuthErrorCode::Unknown => format!("Something went wrong: {}", error.message),
    }
}

fn fail(error: &AuthError, json: bool) -> Result<()> {
    if json {
        output::json(&OperationResult::<SessionSummary>::fail_auth(error))?;
    } else {
        output::error(&explain(error));
    }
    std::process::exit(1);
}
