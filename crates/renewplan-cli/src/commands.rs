//! Command handlers.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tracing::{debug, info, warn};

use renewplan_core::auth::CredentialStore;
use renewplan_core::models::{AuthResponse, PhoneBrandDraft};
use renewplan_core::percentage::CommitError;
use renewplan_core::{ApiClient, ApiError, BalancingMode, Config, PercentageEditor, ResponseCache, Selection, Session};

use crate::cli::{BrandAction, Command, ConfigAction, Edit, LevelArg};
use crate::format::{render_brands, render_buffer, render_details, render_items};

/// Everything a command needs: settings and a client bound to the saved session.
pub struct Context {
    pub config: Config,
    pub api: ApiClient,
}

impl Context {
    pub fn new(config: Config, api_url: Option<String>) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        let session = Arc::new(Session::persistent(&cache_dir));
        if let Err(e) = session.load() {
            warn!(error = %e, "Could not restore saved session");
        }
        session.on_unauthorized(|| {
            eprintln!("Session expired or rejected. Run `renewplan login` again.");
        });

        let base_url = api_url.unwrap_or_else(|| config.api_base_url());
        info!(base_url = %base_url, "Using API");
        let api = ApiClient::new(&base_url, Arc::new(ResponseCache::new()), session)?;

        Ok(Self { config, api })
    }

    fn require_admin(&self) -> Result<()> {
        let session = self.api.session();
        if !session.is_authenticated() {
            bail!("Not logged in. Run `renewplan login` first.");
        }
        if !session.is_admin() {
            bail!("This command requires an admin account.");
        }
        Ok(())
    }
}

pub async fn run(ctx: &mut Context, command: Command) -> Result<()> {
    match command {
        Command::Login { username, remember } => login(ctx, username, remember).await,
        Command::Logout => {
            ctx.api.logout();
            if let Some(username) = ctx.config.last_username.as_deref() {
                if let Err(e) = CredentialStore::default().forget(username) {
                    warn!(error = %e, "Could not remove password from keychain");
                }
            }
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => whoami(ctx).await,
        Command::B1 => {
            for value in ctx.api.b1_values().await? {
                println!("{}", value);
            }
            Ok(())
        }
        Command::B2 { b1 } => {
            print!("{}", render_items(&ctx.api.b2_data(&b1).await?));
            Ok(())
        }
        Command::B3 { b1, b2 } => {
            print!("{}", render_items(&ctx.api.b3_data(&b1, &b2).await?));
            Ok(())
        }
        Command::Details { b1, b2, b3 } => details(ctx, &b1, &b2, b3.as_deref()).await,
        Command::Configure {
            b1,
            b2,
            b3,
            mode,
            even,
            edits,
            dry_run,
        } => {
            ctx.require_admin()?;
            let mut selection = Selection::new(b1);
            selection.b2 = b2;
            selection.b3 = b3;
            let mode = mode.map(Into::into).unwrap_or(ctx.config.balancing_mode);
            configure(ctx, selection, mode, &even, &edits, dry_run).await
        }
        Command::ClearConfigs { yes } => {
            ctx.require_admin()?;
            if !yes {
                bail!("Refusing to clear every percentage override without --yes");
            }
            ctx.api.clear_all_configurations().await?;
            println!("All percentage overrides cleared.");
            Ok(())
        }
        Command::Migrate => {
            ctx.require_admin()?;
            ctx.api.migrate_percentage_configs().await?;
            println!("Migration complete.");
            Ok(())
        }
        Command::Import { file } => {
            ctx.require_admin()?;
            import(ctx, &file).await
        }
        Command::Brands { action } => brands(ctx, action).await,
        Command::Config { action } => config(ctx, action),
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn login(ctx: &mut Context, username: Option<String>, remember: bool) -> Result<()> {
    let username = match username.or_else(|| ctx.config.last_username.clone()) {
        Some(name) => name,
        None => prompt_line("Username: ")?,
    };
    if username.is_empty() {
        bail!("Username is required");
    }

    let credentials = CredentialStore::default();
    let outcome = authenticate(&ctx.api, &username, credentials.recall(&username), || {
        rpassword::prompt_password("Password: ").context("Failed to read password")
    })
    .await?;
    if outcome.remembered_rejected {
        eprintln!("Remembered password was rejected.");
        if let Err(e) = credentials.forget(&username) {
            warn!(error = %e, "Could not remove stale password from keychain");
        }
    }
    let LoginOutcome { auth, password, .. } = outcome;

    if remember {
        if let Err(e) = credentials.remember(&username, &password) {
            warn!(error = %e, "Could not store password in keychain");
        }
    }

    ctx.config.last_username = Some(username);
    ctx.config.save()?;

    println!("Logged in as {} ({:?}).", auth.user.username, auth.user.role);
    Ok(())
}

struct LoginOutcome {
    auth: AuthResponse,
    password: String,
    remembered_rejected: bool,
}

/// Log in with the remembered password if there is one, asking for a fresh
/// password when it is missing or rejected.
async fn authenticate<P>(
    api: &ApiClient,
    username: &str,
    remembered: Option<String>,
    prompt: P,
) -> Result<LoginOutcome>
where
    P: Fn() -> Result<String>,
{
    let mut remembered_rejected = false;
    if let Some(password) = remembered {
        match api.login(username, &password).await {
            Ok(auth) => {
                return Ok(LoginOutcome {
                    auth,
                    password,
                    remembered_rejected,
                })
            }
            Err(ApiError::InvalidCredentials) => {
                debug!(username = username, "Remembered password rejected");
                remembered_rejected = true;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let password = prompt()?;
    let auth = api.login(username, &password).await?;
    Ok(LoginOutcome {
        auth,
        password,
        remembered_rejected,
    })
}

async fn whoami(ctx: &Context) -> Result<()> {
    let Some(user) = ctx.api.session().user() else {
        println!("Not logged in.");
        return Ok(());
    };
    let valid = ctx.api.validate_session().await?;
    println!(
        "{} ({:?}) - session {}",
        user.username,
        user.role,
        if valid { "valid" } else { "expired" }
    );
    Ok(())
}

async fn details(ctx: &Context, b1: &str, b2: &str, b3: Option<&str>) -> Result<()> {
    match b3 {
        Some(b3) => print!("{}", render_details(&ctx.api.b3_details(b1, b2, b3).await?)),
        None => {
            for (b3, details) in ctx.api.details_for_b2(b1, b2).await? {
                println!("== {}", b3);
                print!("{}", render_details(&details));
            }
        }
    }
    Ok(())
}

async fn configure(
    ctx: &Context,
    selection: Selection,
    mode: BalancingMode,
    even: &[LevelArg],
    edits: &[Edit],
    dry_run: bool,
) -> Result<()> {
    let mut editor = PercentageEditor::load(&ctx.api, selection, mode).await?;

    for &level in even {
        editor.distribute_evenly(level.into())?;
    }
    for edit in edits {
        editor.update_percentage(edit.level, &edit.value, edit.percentage)?;
    }

    for (scope, buffer) in editor.buffers() {
        println!("{}", render_buffer(scope, buffer));
    }

    if !editor.is_dirty() {
        println!("No changes.");
        return Ok(());
    }
    if dry_run {
        println!("Dry run: nothing saved.");
        return Ok(());
    }

    match editor.commit(&ctx.api).await {
        Ok(report) => {
            println!("Saved {} values. Server now reports:\n", report.saved.len());
            for (scope, buffer) in editor.buffers() {
                println!("{}", render_buffer(scope, buffer));
            }
            Ok(())
        }
        Err(CommitError::PartialWrite {
            level,
            value,
            saved,
            source,
        }) => {
            eprintln!("Saved before the failure:");
            for item in &saved {
                eprintln!("  {} {} = {}%", item.level, item.value, item.percentage);
            }
            Err(source).with_context(|| format!("Failed to save {} '{}'; later values were not attempted", level, value))
        }
        Err(e) => Err(e.into()),
    }
}

async fn import(ctx: &Context, file: &Path) -> Result<()> {
    let contents = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import.xlsx".to_string());

    let result = ctx.api.import_spreadsheet(&file_name, contents).await?;
    println!("{} ({} rows)", result.message, result.count);
    Ok(())
}

async fn brands(ctx: &Context, action: BrandAction) -> Result<()> {
    match action {
        BrandAction::List => {
            print!("{}", render_brands(&ctx.api.phone_brands().await?));
        }
        BrandAction::Add { name, percentage } => {
            ctx.require_admin()?;
            let draft = PhoneBrandDraft::new(&name, percentage)?;
            let brand = ctx.api.create_phone_brand(&draft).await?;
            println!("Added {}", brand.name);
        }
        BrandAction::Update {
            id,
            name,
            percentage,
        } => {
            ctx.require_admin()?;
            let draft = PhoneBrandDraft::new(&name, percentage)?;
            let brand = ctx.api.update_phone_brand(&id, &draft).await?;
            println!("Updated {}", brand.name);
        }
        BrandAction::Delete { id } => {
            ctx.require_admin()?;
            ctx.api.delete_phone_brand(&id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn config(ctx: &mut Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("api_base_url:   {}", ctx.config.api_base_url());
            println!("balancing_mode: {:?}", ctx.config.balancing_mode);
            println!(
                "last_username:  {}",
                ctx.config.last_username.as_deref().unwrap_or("-")
            );
        }
        ConfigAction::SetMode { mode } => {
            ctx.config.balancing_mode = mode.into();
            ctx.config.save()?;
            println!("Balancing mode set to {:?}", ctx.config.balancing_mode);
        }
        ConfigAction::SetUrl { url } => {
            ctx.config.api_base_url = Some(url);
            ctx.config.save()?;
            println!("API URL saved.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use renewplan_core::models::Role;

    async fn server_accepting(password: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_partial_json(json!({ "password": password })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "tok",
                "user": { "id": "u1", "username": "admin", "role": "admin" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(
            &format!("{}/api", server.uri()),
            Arc::new(ResponseCache::new()),
            Arc::new(Session::in_memory()),
        )
        .expect("client builds")
    }

    #[tokio::test]
    async fn test_stale_remembered_password_falls_back_to_prompt() {
        let server = server_accepting("new-secret").await;
        let api = client(&server);
        let prompts = Cell::new(0);

        let outcome = authenticate(&api, "admin", Some("old-secret".to_string()), || {
            prompts.set(prompts.get() + 1);
            Ok("new-secret".to_string())
        })
        .await
        .expect("login with prompted password");

        assert!(outcome.remembered_rejected);
        assert_eq!(outcome.password, "new-secret");
        assert_eq!(outcome.auth.user.role, Role::Admin);
        assert_eq!(prompts.get(), 1);
        assert!(api.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_valid_remembered_password_skips_prompt() {
        let server = server_accepting("secret").await;
        let api = client(&server);

        let outcome = authenticate(&api, "admin", Some("secret".to_string()), || {
            panic!("should not prompt")
        })
        .await
        .expect("login with remembered password");

        assert!(!outcome.remembered_rejected);
        assert_eq!(outcome.password, "secret");
    }

    #[tokio::test]
    async fn test_wrong_prompted_password_is_reported() {
        let server = server_accepting("secret").await;
        let api = client(&server);

        let err = authenticate(&api, "admin", None, || Ok("typo".to_string()))
            .await
            .err()
            .expect("login should fail");

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::InvalidCredentials)
        ));
    }
}
