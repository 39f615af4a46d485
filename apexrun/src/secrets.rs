//! Credential acquisition.
//!
//! Credentials come from a `secret.json` file holding one credential block
//! per org (keys like `staging`, `production`), falling back to `SF_*`
//! environment variables when the file is absent. Validation of the
//! resolved credentials happens in the core, before any network call.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use apexrun_core::Credentials;
use apexrun_core::config::DEFAULT_SERVER;
use tracing::debug;

pub const ENV_SERVER: &str = "SF_SERVER";
pub const ENV_USERNAME: &str = "SF_USERNAME";
pub const ENV_PASSWORD: &str = "SF_PASSWORD";
pub const ENV_CLIENT_ID: &str = "SF_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SF_CLIENT_SECRET";

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    path.to_path_buf()
}

/// Resolve credentials from the secret file, or the environment if the file
/// does not exist.
pub fn resolve_credentials(secret_file: &Path, org: &str) -> Result<Credentials> {
    let path = expand_home(secret_file);
    if path.exists() {
        from_secret_file(&path, org)
    } else {
        debug!(path = %path.display(), "secret file not found, trying environment");
        from_env()
    }
}

fn from_secret_file(path: &Path, org: &str) -> Result<Credentials> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read secret file {}", path.display()))?;
    let blocks: HashMap<String, Credentials> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed secret file {}", path.display()))?;

    match blocks.get(org) {
        Some(credentials) => {
            debug!(org, path = %path.display(), "credentials loaded from secret file");
            Ok(credentials.clone())
        }
        None => bail!(
            "secret file {} has no '{}' block (available: {})",
            path.display(),
            org,
            {
                let mut keys: Vec<_> = blocks.keys().map(String::as_str).collect();
                keys.sort_unstable();
                keys.join(", ")
            }
        ),
    }
}

fn from_env() -> Result<Credentials> {
    let get = |key: &str| env::var(key).ok().filter(|value| !value.is_empty());

    let (Some(username), Some(password), Some(client_id), Some(client_secret)) = (
        get(ENV_USERNAME),
        get(ENV_PASSWORD),
        get(ENV_CLIENT_ID),
        get(ENV_CLIENT_SECRET),
    ) else {
        bail!(
            "no secret file found and the environment is incomplete; \
             set {ENV_USERNAME}, {ENV_PASSWORD}, {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET} \
             (optionally {ENV_SERVER})"
        );
    };

    Ok(Credentials {
        server: get(ENV_SERVER).unwrap_or_else(|| DEFAULT_SERVER.to_string()),
        username,
        password,
        client_id,
        client_secret,
    })
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::sync::{Mutex, MutexGuard};

    // Environment variables are process-global; serialize the tests that
    // touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clear_env() {
        for var in [
            ENV_SERVER,
            ENV_USERNAME,
            ENV_PASSWORD,
            ENV_CLIENT_ID,
            ENV_CLIENT_SECRET,
        ] {
            // SAFETY: serialized via ENV_LOCK, no concurrent env access.
            unsafe { env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: serialized via ENV_LOCK, no concurrent env access.
        unsafe { env::set_var(key, value) };
    }

    fn write_secret_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const SECRET_JSON: &str = r#"{
        "staging": {
            "username": "ci@example.org.staging",
            "password": "pw",
            "clientId": "id",
            "clientSecret": "secret"
        },
        "production": {
            "server": "https://login.salesforce.com",
            "username": "ci@example.org",
            "password": "pw",
            "clientId": "id",
            "clientSecret": "secret"
        }
    }"#;

    #[test]
    fn secret_file_block_is_selected_by_org() {
        let file = write_secret_file(SECRET_JSON);

        let staging = resolve_credentials(file.path(), "staging").unwrap();
        assert_eq!(staging.username, "ci@example.org.staging");
        assert_eq!(staging.server, DEFAULT_SERVER);

        let production = resolve_credentials(file.path(), "production").unwrap();
        assert_eq!(production.server, "https://login.salesforce.com");
    }

    #[test]
    fn unknown_org_names_the_available_blocks() {
        let file = write_secret_file(SECRET_JSON);
        let err = resolve_credentials(file.path(), "qa").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no 'qa' block"));
        assert!(msg.contains("production, staging"));
    }

    #[test]
    fn missing_file_falls_back_to_environment() {
        let _guard = env_guard();
        clear_env();
        set_env(ENV_USERNAME, "env@example.org");
        set_env(ENV_PASSWORD, "pw");
        set_env(ENV_CLIENT_ID, "id");
        set_env(ENV_CLIENT_SECRET, "secret");

        let creds = resolve_credentials(Path::new("/nonexistent/secret.json"), "staging").unwrap();
        assert_eq!(creds.username, "env@example.org");
        assert_eq!(creds.server, DEFAULT_SERVER);

        clear_env();
    }

    #[test]
    fn incomplete_environment_is_an_error() {
        let _guard = env_guard();
        clear_env();
        set_env(ENV_USERNAME, "env@example.org");

        let err =
            resolve_credentials(Path::new("/nonexistent/secret.json"), "staging").unwrap_err();
        assert!(err.to_string().contains("SF_PASSWORD"));

        clear_env();
    }

    #[test]
    fn expand_home_leaves_absolute_paths_alone() {
        assert_eq!(
            expand_home(Path::new("/etc/secret.json")),
            PathBuf::from("/etc/secret.json")
        );
    }
}
