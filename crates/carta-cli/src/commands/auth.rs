use carta_core::{CartaError, CartaResult, ExitCode};
use carta_state::AuthManager;
use carta_store::{SessionStore, resolve_env_credentials};
use serde_json::json;

use crate::{AppContext, AuthCommand, GlobalOptions, print_json, with_app_context};

pub(crate) fn cmd_auth(command: AuthCommand, globals: &GlobalOptions) -> CartaResult<ExitCode> {
    with_app_context(globals, |ctx| match command {
        AuthCommand::Login { email, password } => {
            let (email, password) = resolve_credentials(&ctx, email, password)?;
            let sessions = SessionStore::new(ctx.kv.clone());
            let mut auth = AuthManager::new(ctx.api.clone(), sessions)?;

            auth.login(&email, &password)?;
            let session = auth.session();

            if globals.json {
                print_json(&json!({
                    "ok": true,
                    "result": {
                        "profile": ctx.profile,
                        "server": ctx.server,
                        "email": session.user.as_ref().and_then(|user| user.email.clone()),
                        "authenticated": true,
                    }
                }))?;
            } else {
                println!("Authenticated with {}", ctx.server);
                println!("Profile: {}", ctx.profile);
                if let Some(email) = session.user.as_ref().and_then(|user| user.email.as_deref()) {
                    println!("Email: {email}");
                }
                println!("Session saved: {}", ctx.paths.state_db_path.display());
            }

            Ok(ExitCode::Success)
        }
        AuthCommand::Register {
            email,
            password,
            name,
        } => {
            let (email, password) = resolve_credentials(&ctx, email, password)?;
            let sessions = SessionStore::new(ctx.kv.clone());
            let mut auth = AuthManager::new(ctx.api.clone(), sessions)?;

            auth.register(&email, &password, &name)?;
            let session = auth.session();

            if globals.json {
                print_json(&json!({
                    "ok": true,
                    "result": {
                        "profile": ctx.profile,
                        "server": ctx.server,
                        "email": session.user.as_ref().and_then(|user| user.email.clone()),
                        "name": session.user.as_ref().and_then(|user| user.name.clone()),
                        "authenticated": true,
                    }
                }))?;
            } else {
                println!("Account created on {}", ctx.server);
                println!("Profile: {}", ctx.profile);
                if let Some(email) = session.user.as_ref().and_then(|user| user.email.as_deref()) {
                    println!("Email: {email}");
                }
            }

            Ok(ExitCode::Success)
        }
        AuthCommand::Status => {
            let sessions = SessionStore::new(ctx.kv.clone());
            let session = sessions.load()?.unwrap_or_default();
            let authenticated = session.is_authenticated();

            if globals.json {
                print_json(&json!({
                    "ok": authenticated,
                    "result": {
                        "profile": ctx.profile,
                        "server": ctx.server,
                        "authenticated": authenticated,
                        "email": session.user.as_ref().and_then(|user| user.email.clone()),
                        "access_token": session.token().map(mask_token),
                    }
                }))?;
            } else {
                println!("Server: {}", ctx.server);
                println!("Profile: {}", ctx.profile);
                println!(
                    "Authenticated: {}",
                    if authenticated { "yes" } else { "no" }
                );
                if let Some(email) = session.user.as_ref().and_then(|user| user.email.as_deref()) {
                    println!("Email: {email}");
                }
                if let Some(token) = session.token() {
                    println!("Access token: {}", mask_token(token));
                }
            }

            Ok(if authenticated {
                ExitCode::Success
            } else {
                ExitCode::Auth
            })
        }
        AuthCommand::Logout => {
            let sessions = SessionStore::new(ctx.kv.clone());
            let mut auth = AuthManager::new(ctx.api.clone(), sessions)?;
            auth.logout()?;

            if globals.json {
                print_json(&json!({
                    "ok": true,
                    "result": {
                        "profile": ctx.profile,
                        "authenticated": false,
                    }
                }))?;
            } else {
                println!("Session cleared for profile '{}'.", ctx.profile);
            }

            Ok(ExitCode::Success)
        }
    })
}

fn resolve_credentials(
    ctx: &AppContext,
    email: Option<String>,
    password: Option<String>,
) -> CartaResult<(String, String)> {
    if let (Some(email), Some(password)) = (email, password) {
        return Ok((email, password));
    }

    resolve_env_credentials(&ctx.paths.root)?
        .map(|creds| (creds.email, creds.password))
        .ok_or_else(|| {
            CartaError::auth(
                "missing credentials; pass --email and --password or set CARTA_EMAIL and CARTA_PASSWORD",
            )
        })
}

fn mask_token(token: &str) -> String {
    if token.chars().count() <= 18 {
        return "••••••".to_string();
    }

    let head: String = token.chars().take(8).collect();
    let tail_rev: Vec<char> = token.chars().rev().take(6).collect();
    let tail: String = tail_rev.into_iter().rev().collect();
    format!("{head}…{tail}")
}
