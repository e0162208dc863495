mod commands;

use carta_api::StorefrontApi;
use carta_core::{CartaError, CartaResult, ExitCode};
use carta_fs::{WorkspacePaths, init_workspace, load_config, resolve_profile, resolve_workspace};
use carta_store::KvStore;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "carta",
    version,
    about = "Storefront catalog and loyalty card client",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true)]
    profile: Option<String>,

    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,

    #[arg(long, global = true)]
    server: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    no_color: bool,

    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Init,
    Doctor,
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    Card {
        #[command(subcommand)]
        command: CardCommand,
    },
    List {
        #[command(subcommand)]
        command: ListCommand,
    },
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    List,
    Use {
        name: String,
    },
    Set {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        server: String,
    },
}

#[derive(Debug, Subcommand)]
enum AuthCommand {
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        name: String,
    },
    Status,
    Logout,
}

#[derive(Debug, Subcommand)]
enum CardCommand {
    Show,
    Set {
        ccnum: String,
    },
    Scan {
        code: String,
    },
    Remove,
    Virtual {
        #[command(subcommand)]
        command: VirtualCommand,
    },
}

#[derive(Debug, Subcommand)]
enum VirtualCommand {
    Attach,
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        middle_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        egn: String,
        #[arg(long)]
        post_code: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        wants_games: bool,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        street_or_district: String,
        #[arg(long, default_value = "")]
        street_no: String,
        #[arg(long, default_value = "")]
        block: String,
        #[arg(long, default_value = "")]
        entrance: String,
        #[arg(long, default_value = "")]
        apartment: String,
        #[arg(long)]
        consent: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ListCommand {
    Show,
    Add {
        title: String,
    },
    Done {
        id: String,
    },
    Edit {
        id: String,
        title: String,
    },
    Rm {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum CatalogCommand {
    Banners {
        #[arg(long)]
        id: Option<i64>,
    },
    Brochures {
        #[arg(long)]
        id: Option<i64>,
    },
    Shops {
        #[arg(long)]
        id: Option<i64>,
    },
    Products {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        home: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 30)]
        limit: u32,
        #[arg(long)]
        category: Option<String>,
    },
    Promocodes {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 30)]
        limit: u32,
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct GlobalOptions {
    profile: Option<String>,
    workspace: Option<PathBuf>,
    server: Option<String>,
    json: bool,
    yes: bool,
}

#[derive(Debug)]
struct AppContext {
    paths: WorkspacePaths,
    profile: String,
    server: String,
    api: StorefrontApi,
    kv: KvStore,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    workspace: String,
    created: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ProfileChangedOutput {
    profile: String,
    server: String,
}

fn main() {
    let cli = Cli::parse();
    configure_logging(cli.debug, cli.json, cli.no_color);

    let globals = GlobalOptions {
        profile: cli.profile,
        workspace: cli.workspace,
        server: cli.server,
        json: cli.json,
        yes: cli.yes,
    };

    let result = run_command(cli.command, &globals);

    let exit = match result {
        Ok(code) => code,
        Err(error) => {
            render_error(&error, globals.json);
            error.exit_code()
        }
    };

    std::process::exit(exit.as_i32());
}

fn configure_logging(debug: bool, json: bool, no_color: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(!no_color)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run_command(command: Command, globals: &GlobalOptions) -> CartaResult<ExitCode> {
    match command {
        Command::Init => commands::profile::cmd_init(globals),
        Command::Doctor => commands::profile::cmd_doctor(globals),
        Command::Profile { command } => commands::profile::cmd_profile(command, globals),
        Command::Auth { command } => commands::auth::cmd_auth(command, globals),
        Command::Card { command } => commands::card::cmd_card(command, globals),
        Command::List { command } => commands::list::cmd_list(command, globals),
        Command::Catalog { command } => commands::catalog::cmd_catalog(command, globals),
    }
}

fn with_app_context<F>(globals: &GlobalOptions, run: F) -> CartaResult<ExitCode>
where
    F: FnOnce(AppContext) -> CartaResult<ExitCode>,
{
    let target = workspace_target(globals)?;
    if !target.join(".carta").is_dir() {
        init_workspace(Some(&target), globals.server.as_deref())?;
    }

    let paths = resolve_workspace(Some(&target))?;
    let config = load_config(&paths)?;
    let resolved = resolve_profile(
        &config,
        globals.profile.as_deref(),
        globals.server.as_deref(),
    )?;
    let api = StorefrontApi::new(&resolved.server)?;
    let kv = KvStore::open(&paths)?;

    run(AppContext {
        paths,
        profile: resolved.name,
        server: resolved.server,
        api,
        kv,
    })
}

fn workspace_target(globals: &GlobalOptions) -> CartaResult<PathBuf> {
    if let Some(path) = &globals.workspace {
        return absolutize(path);
    }

    default_workspace_path()
}

fn default_workspace_path() -> CartaResult<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    if let Some(home) = home {
        return Ok(home.join(".local").join("share").join("carta"));
    }

    std::env::current_dir().map_err(|err| {
        CartaError::io(format!(
            "failed to resolve current directory for default workspace: {err}"
        ))
    })
}

fn absolutize(path: &Path) -> CartaResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(|err| {
        CartaError::io(format!(
            "failed to resolve current directory for path: {err}"
        ))
    })?;

    Ok(cwd.join(path))
}

fn render_error(error: &CartaError, json_output: bool) {
    if json_output {
        let payload = json!({
            "ok": false,
            "error": {
                "kind": error.kind,
                "message": &error.message,
            }
        });
        let serialized = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"ok\":false,\"error\":{\"kind\":\"io\",\"message\":\"failed to serialize error\"}}".to_string()
        });
        eprintln!("{serialized}");
    } else {
        eprintln!("error: {}", error.message);
    }
}

fn print_json<T: Serialize>(value: &T) -> CartaResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CartaError::io(format!("failed to render JSON output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
