use crate::config::{DEFAULT_SERVER_URL, WorkspaceConfig, load_config, save_config};
use carta_core::{CartaError, CartaResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub carta_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub config_path: PathBuf,
    pub state_db_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkspaceInitResult {
    pub paths: WorkspacePaths,
    pub created: Vec<PathBuf>,
}

impl WorkspacePaths {
    pub fn from_root(root: PathBuf) -> Self {
        let carta_dir = root.join(".carta");

        Self {
            config_path: carta_dir.join("config.toml"),
            state_db_path: carta_dir.join("state.db"),
            cache_dir: carta_dir.join("cache"),
            logs_dir: carta_dir.join("logs"),
            root,
            carta_dir,
        }
    }
}

pub fn init_workspace(
    target: Option<&Path>,
    server: Option<&str>,
) -> CartaResult<WorkspaceInitResult> {
    let root = match target {
        Some(path) => absolutize(path)?,
        None => std::env::current_dir().map_err(|err| {
            CartaError::io(format!(
                "failed to resolve current directory for init: {err}"
            ))
        })?,
    };

    let paths = WorkspacePaths::from_root(root);
    let mut created = Vec::new();

    ensure_dir(&paths.root, &mut created)?;
    ensure_dir(&paths.carta_dir, &mut created)?;
    ensure_dir(&paths.cache_dir, &mut created)?;
    ensure_dir(&paths.logs_dir, &mut created)?;

    ensure_file(&paths.state_db_path, &mut created)?;

    if paths.config_path.exists() {
        let _ = load_config(&paths)?;
    } else {
        let default_server = server.unwrap_or(DEFAULT_SERVER_URL);
        let config = WorkspaceConfig::with_default_server(default_server);
        save_config(&paths, &config)?;
        created.push(paths.config_path.clone());
    }

    Ok(WorkspaceInitResult { paths, created })
}

pub fn resolve_workspace(explicit: Option<&Path>) -> CartaResult<WorkspacePaths> {
    let root = match explicit {
        Some(path) => absolutize(path)?,
        None => std::env::current_dir().map_err(|err| {
            CartaError::io(format!(
                "failed to resolve current directory for workspace lookup: {err}"
            ))
        })?,
    };

    let paths = WorkspacePaths::from_root(root);
    if !paths.carta_dir.is_dir() {
        let root_display = paths.root.display();
        return Err(CartaError::usage(format!(
            "workspace is not initialized at '{root_display}'; run `carta init --workspace {root_display}` first"
        )));
    }

    Ok(paths)
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

fn ensure_dir(path: &Path, created: &mut Vec<PathBuf>) -> CartaResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(CartaError::io(format!(
                "expected '{}' to be a directory",
                path.display()
            )));
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|err| {
        CartaError::io(format!(
            "failed to create directory '{}': {}",
            path.display(),
            err
        ))
    })?;
    created.push(path.to_path_buf());
    Ok(())
}

fn ensure_file(path: &Path, created: &mut Vec<PathBuf>) -> CartaResult<()> {
    if path.exists() {
        if !path.is_file() {
            return Err(CartaError::io(format!(
                "expected '{}' to be a file",
                path.display()
            )));
        }
        return Ok(());
    }

    fs::write(path, []).map_err(|err| {
        CartaError::io(format!(
            "failed to create file '{}': {}",
            path.display(),
            err
        ))
    })?;
    created.push(path.to_path_buf());
    Ok(())
}
