use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Keys recognised in the JSON config file (`~/.config/ackr` by default).
/// All fields are optional; the tool works with no file at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub storage_dir: Option<String>,
    pub ghuser: Option<String>,
    pub upstream_remote_name: Option<String>,
    pub pager: Option<String>,
    pub upstream_repo: Option<String>,
    pub base_branch: Option<String>,
    pub github_token: Option<String>,
}

/// Effective settings, resolved once at startup and handed to every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all stored revisions
    pub storage_dir: PathBuf,
    /// GitHub user whose fork receives pushed ackr tags
    pub gh_user: String,
    /// Name of the git remote pointing at the upstream repository
    pub upstream_remote: String,
    /// `owner/name` of the upstream repository on GitHub
    pub upstream_repo: String,
    /// Branch PRs are opened against
    pub base_branch: String,
    pub pager: String,
    pub editor: String,
    /// Optional API token; unauthenticated requests are allowed
    pub github_token: Option<String>,
}

const DEFAULT_STORAGE_DIR: &str = "~/.ackr";
const DEFAULT_GH_USER: &str = "jamesob";
const DEFAULT_UPSTREAM_REMOTE: &str = "upstream";
const DEFAULT_UPSTREAM_REPO: &str = "bitcoin/bitcoin";
const DEFAULT_BASE_BRANCH: &str = "master";
const DEFAULT_PAGER: &str = "less -R";
const DEFAULT_EDITOR: &str = "vim";

impl Config {
    /// Load the config file (if any) and resolve every setting against the
    /// process environment.
    pub fn load() -> Result<Config, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let home = dirs::home_dir();

        let path = match env("ACKR_CONFIG") {
            Some(raw) => expand_path(&raw, &env, home.as_deref()),
            None => default_config_path(home.as_deref()),
        };

        let file = if path.is_file() {
            debug!(path = %path.display(), "reading config file");
            FileConfig::load_from(&path)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            FileConfig::default()
        };

        Ok(Self::resolve(&file, env, home.as_deref()))
    }

    /// Apply the precedence rule `environment > config file > default` to
    /// every key. `env` stands in for the process environment so tests can
    /// drive it without touching global state.
    pub fn resolve<E>(file: &FileConfig, env: E, home: Option<&Path>) -> Config
    where
        E: Fn(&str) -> Option<String>,
    {
        let pick = |env_key: &str, file_value: &Option<String>, default: &str| -> String {
            non_empty(env(env_key))
                .or_else(|| non_empty(file_value.clone()))
                .unwrap_or_else(|| default.to_string())
        };

        let storage_dir = expand_path(
            &pick("ACKR_DIR", &file.storage_dir, DEFAULT_STORAGE_DIR),
            &env,
            home,
        );

        let pager = non_empty(env("ACKR_PAGER"))
            .or_else(|| non_empty(file.pager.clone()))
            .or_else(|| non_empty(env("PAGER")))
            .unwrap_or_else(|| DEFAULT_PAGER.to_string());

        Config {
            storage_dir,
            gh_user: pick("ACKR_GH_USER", &file.ghuser, DEFAULT_GH_USER),
            upstream_remote: pick(
                "ACKR_UPSTREAM",
                &file.upstream_remote_name,
                DEFAULT_UPSTREAM_REMOTE,
            ),
            upstream_repo: pick("ACKR_UPSTREAM_REPO", &file.upstream_repo, DEFAULT_UPSTREAM_REPO),
            base_branch: pick("ACKR_BASE_BRANCH", &file.base_branch, DEFAULT_BASE_BRANCH),
            pager,
            editor: non_empty(env("EDITOR")).unwrap_or_else(|| DEFAULT_EDITOR.to_string()),
            github_token: non_empty(env("GITHUB_TOKEN")).or_else(|| non_empty(file.github_token.clone())),
        }
    }

    /// Repository name without the owner, e.g. `bitcoin` for `bitcoin/bitcoin`.
    pub fn repo_name(&self) -> &str {
        self.upstream_repo
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.upstream_repo)
    }

    /// The upstream base branch as seen through the remote, e.g. `upstream/master`.
    pub fn upstream_base(&self) -> String {
        format!("{}/{}", self.upstream_remote, self.base_branch)
    }
}

impl FileConfig {
    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_config_path(home: Option<&Path>) -> PathBuf {
    home.map(|h| h.join(".config").join("ackr"))
        .unwrap_or_else(|| PathBuf::from(".ackr-config"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expand a leading `~` and any `$VAR` / `${VAR}` references. Unknown
/// variables are left untouched.
pub fn expand_path<E>(raw: &str, env: &E, home: Option<&Path>) -> PathBuf
where
    E: Fn(&str) -> Option<String>,
{
    let expanded = expand_vars(raw, env);

    match (expanded.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(expanded),
    }
}

fn expand_vars<E>(raw: &str, env: &E) -> String
where
    E: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (name.is_empty(), env(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}
