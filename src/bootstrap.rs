//! Bootstrap helpers for polkagent.
//!
//! Credentials are usually kept out of the TOML config file and in
//! `~/.polkagent/.env` instead (standard dotenvy format).

use std::io::Write;
use std::path::{Path, PathBuf};

/// Path to the polkagent-specific `.env` file: `~/.polkagent/.env`.
pub fn agent_env_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".polkagent")
        .join(".env")
}

/// Load env vars from `~/.polkagent/.env` (in addition to the standard `.env`).
///
/// Call this **after** `dotenvy::dotenv()` so that `./.env` takes priority.
/// dotenvy never overwrites existing env vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.polkagent/.env`
pub fn load_agent_env() {
    load_env_file(&agent_env_path());
}

fn load_env_file(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = dotenvy::from_path(path) {
        tracing::warn!("Failed to load {}: {}", path.display(), e);
    }
}

/// Write bootstrap vars to `~/.polkagent/.env`.
///
/// Values are double-quoted so that `#` and other shell-special characters
/// survive the dotenvy round trip.
pub fn save_bootstrap_env(vars: &[(&str, &str)]) -> std::io::Result<()> {
    write_env_file(&agent_env_path(), vars)
}

fn write_env_file(path: &Path, vars: &[(&str, &str)]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = String::new();
    for (key, value) in vars {
        // Escape backslashes and double quotes to prevent env var injection
        // (e.g. a value containing `"\nINJECTED="x` would break out of quotes).
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        content.push_str(&format!("{}=\"{}\"\n", key, escaped));
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    // Owner-only: the file holds the signing secret and API key.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; tighten a file left by an older run.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_path_under_polkagent_dir() {
        let path = agent_env_path();
        assert!(path.to_string_lossy().contains(".polkagent"));
        assert!(path.to_string_lossy().ends_with(".env"));
    }

    #[test]
    fn written_values_are_quoted_and_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".env");

        write_env_file(
            &path,
            &[
                ("CHAIN_ENDPOINT", "wss://westend-rpc.polkadot.io"),
                ("SIGNING_SECRET", "bottom \"drive\" #1"),
            ],
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("CHAIN_ENDPOINT=\"wss://westend-rpc.polkadot.io\"\n"));
        assert!(content.contains("SIGNING_SECRET=\"bottom \\\"drive\\\" #1\"\n"));

        let parsed: Vec<(String, String)> = dotenvy::from_path_iter(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed[1].1, "bottom \"drive\" #1");
    }

    #[cfg(unix)]
    #[test]
    fn env_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OLD=\"1\"\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_env_file(&path, &[("LLM_API_KEY", "sk-test")]).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "LLM_API_KEY=\"sk-test\"\n");
    }
}
