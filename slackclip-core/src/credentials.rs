use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use dirs::home_dir;
use tracing::{debug, info, warn};

use crate::error::{Result, SlackclipError};
use crate::model::{CredentialBundle, SessionCookie, WorkspaceToken};

const STORE_DIR_NAME: &str = "slackclipper";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Obtains a fresh credential bundle, typically by scraping a signed-in
/// desktop client. Any failure is reported as an extraction error.
pub trait CredentialExtractor {
    fn extract(&self) -> Result<CredentialBundle>;
}

impl<F> CredentialExtractor for F
where
    F: Fn() -> Result<CredentialBundle>,
{
    fn extract(&self) -> Result<CredentialBundle> {
        self()
    }
}

/// Runs an external program whose stdout is a JSON credential bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Reads `SLACKCLIP_EXTRACTOR`, split on whitespace into program and args.
    pub fn from_env() -> Option<Self> {
        let command_line = env::var("SLACKCLIP_EXTRACTOR").ok()?;
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl CredentialExtractor for CommandExtractor {
    fn extract(&self) -> Result<CredentialBundle> {
        debug!(program = %self.program, "running credential extractor");
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|err| SlackclipError::Extraction(format!("{}: {err}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SlackclipError::Extraction(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|err| {
            SlackclipError::Extraction(format!("{} printed an invalid bundle: {err}", self.program))
        })
    }
}

/// Reads a bundle someone already exported as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExtractor {
    path: PathBuf,
}

impl FileExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialExtractor for FileExtractor {
    fn extract(&self) -> Result<CredentialBundle> {
        let bytes = fs::read(&self.path).map_err(|err| {
            SlackclipError::Extraction(format!("{}: {err}", self.path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            SlackclipError::Extraction(format!(
                "{} is not a credential bundle: {err}",
                self.path.display()
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub config_dir: PathBuf,
}

impl StorePaths {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn from_env_or_home() -> Result<Self> {
        // Precedence:
        // 1) SLACKCLIP_CONFIG_DIR
        // 2) XDG_CONFIG_HOME/slackclipper
        // 3) ~/.config/slackclipper
        if let Some(dir) = env::var_os("SLACKCLIP_CONFIG_DIR").filter(|path| !path.is_empty()) {
            return Ok(Self::new(dir));
        }

        if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").filter(|path| !path.is_empty()) {
            return Ok(Self::new(PathBuf::from(xdg).join(STORE_DIR_NAME)));
        }

        let home = home_dir().ok_or(SlackclipError::HomeDirectoryNotFound)?;
        Ok(Self::new(home.join(".config").join(STORE_DIR_NAME)))
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join(CREDENTIALS_FILE_NAME)
    }
}

/// File-backed store of the credential bundle.
///
/// The file is read and written wholesale with no locking. Two processes
/// updating it at once will race and the last writer wins.
pub struct CredentialStore {
    path: PathBuf,
    extractor: Option<Box<dyn CredentialExtractor>>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extractor: None,
        }
    }

    pub fn from_paths(paths: &StorePaths) -> Self {
        Self::new(paths.credentials_file())
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn CredentialExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a readable bundle exists. Read and parse failures count as absent.
    pub fn present(&self) -> bool {
        match self.load() {
            Ok(_) => true,
            Err(err) if err.is_store_read() => {
                debug!(error = %err, "credential store not usable");
                false
            }
            Err(err) => {
                warn!(error = %err, "unexpected credential store failure");
                false
            }
        }
    }

    /// Persist `bundle`, or one obtained from the extractor when none is given.
    /// Any existing store contents are replaced.
    pub fn update(&self, bundle: Option<CredentialBundle>) -> Result<()> {
        let bundle = match bundle {
            Some(bundle) => bundle,
            None => {
                let extractor = self.extractor.as_ref().ok_or_else(|| {
                    SlackclipError::Extraction("no credential extractor configured".to_string())
                })?;
                extractor.extract().map_err(|err| match err {
                    SlackclipError::Extraction(_) => err,
                    other => SlackclipError::Extraction(other.to_string()),
                })?
            }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SlackclipError::Persistence {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let bytes = serde_json::to_vec_pretty(&bundle)
            .map_err(|err| SlackclipError::Serialization(err.to_string()))?;
        let persistence = |source| SlackclipError::Persistence {
            path: self.path.clone(),
            source,
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(persistence)?;
        file.write_all(&bytes).map_err(persistence)?;

        info!(
            path = %self.path.display(),
            workspaces = bundle.tokens.len(),
            "stored credentials"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<CredentialBundle> {
        let bytes = fs::read(&self.path).map_err(|source| SlackclipError::StoreRead {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_slice(&bytes).map_err(|source| SlackclipError::StoreCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    pub fn token_and_cookie(&self, origin: &str) -> Result<(String, SessionCookie)> {
        let bundle = self.load()?;
        let entry = find_workspace(&bundle, origin)?;
        Ok((entry.token.clone(), bundle.cookie.clone()))
    }

    pub fn friendly_name(&self, origin: &str) -> Result<String> {
        let bundle = self.load()?;
        let entry = find_workspace(&bundle, origin)?;
        Ok(entry.name.clone())
    }
}

/// Exact key first, then ASCII-case and trailing-slash insensitive.
fn find_workspace<'a>(bundle: &'a CredentialBundle, origin: &str) -> Result<&'a WorkspaceToken> {
    if let Some(entry) = bundle.tokens.get(origin) {
        return Ok(entry);
    }

    let wanted = normalize_origin(origin);
    bundle
        .tokens
        .iter()
        .find(|(key, _)| normalize_origin(key) == wanted)
        .map(|(_, entry)| entry)
        .ok_or_else(|| SlackclipError::WorkspaceNotFound {
            origin: origin.to_string(),
        })
}

fn normalize_origin(origin: &str) -> String {
    origin.trim_end_matches('/').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{CommandExtractor, CredentialStore, FileExtractor, StorePaths};
    use crate::error::{Result, SlackclipError};
    use crate::model::{CredentialBundle, SessionCookie, WorkspaceToken};

    const ORIGIN: &str = "https://example.slack.com/";

    fn bundle() -> CredentialBundle {
        CredentialBundle::new(SessionCookie::new("d", "cookie-value"))
            .with_workspace(ORIGIN, WorkspaceToken::new("xoxc-1", "Example Workspace"))
    }

    #[test]
    fn present_is_false_when_store_missing() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::from_paths(&StorePaths::new(temp.path()));
        assert!(!store.present());
    }

    #[test]
    fn present_is_false_when_store_empty_or_corrupt() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("credentials.json");
        let store = CredentialStore::new(&path);

        fs::write(&path, "").expect("write");
        assert!(!store.present());

        fs::write(&path, "{not json").expect("write");
        assert!(!store.present());

        fs::write(&path, r#"{"tokens":{}}"#).expect("write");
        assert!(!store.present());
    }

    #[test]
    fn update_then_load_round_trips() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("nested/dir/credentials.json"));

        store.update(Some(bundle())).expect("update");
        assert!(store.present());
        assert_eq!(store.load().expect("load"), bundle());
    }

    #[test]
    fn update_overwrites_existing_contents() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store.update(Some(bundle())).expect("update");

        let replacement = CredentialBundle::new(SessionCookie::new("d", "other"))
            .with_workspace("https://other.slack.com/", WorkspaceToken::new("xoxc-2", "Other"));
        store.update(Some(replacement.clone())).expect("update");

        assert_eq!(store.load().expect("load"), replacement);
        let err = store.token_and_cookie(ORIGIN).expect_err("old workspace gone");
        assert!(matches!(err, SlackclipError::WorkspaceNotFound { .. }));
    }

    #[test]
    fn update_uses_extractor_when_no_bundle_given() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"))
            .with_extractor(Box::new(|| -> Result<CredentialBundle> { Ok(bundle()) }));

        store.update(None).expect("update");
        assert_eq!(store.load().expect("load"), bundle());
    }

    #[test]
    fn update_reports_extractor_failure() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json")).with_extractor(
            Box::new(|| -> Result<CredentialBundle> {
                Err(SlackclipError::Serialization("desktop app not found".to_string()))
            }),
        );

        let err = store.update(None).expect_err("must fail");
        assert!(matches!(err, SlackclipError::Extraction(_)));
        assert!(format!("{err}").contains("desktop app not found"));
        assert!(!store.present());
    }

    #[test]
    fn update_without_extractor_fails() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        let err = store.update(None).expect_err("must fail");
        assert!(matches!(err, SlackclipError::Extraction(_)));
    }

    #[test]
    fn update_reports_unwritable_location() {
        let temp = tempdir().expect("tempdir");
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "file, not a directory").expect("write");
        let store = CredentialStore::new(blocker.join("credentials.json"));

        let err = store.update(Some(bundle())).expect_err("must fail");
        assert!(matches!(err, SlackclipError::Persistence { .. }));
    }

    #[test]
    fn load_reports_missing_store() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        let err = store.load().expect_err("must fail");
        assert!(err.is_store_read());
    }

    #[test]
    fn token_and_cookie_exact_match() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store.update(Some(bundle())).expect("update");

        let (token, cookie) = store.token_and_cookie(ORIGIN).expect("lookup");
        assert_eq!(token, "xoxc-1");
        assert_eq!(cookie, SessionCookie::new("d", "cookie-value"));
    }

    #[test]
    fn lookup_tolerates_case_and_trailing_slash() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store.update(Some(bundle())).expect("update");

        let (token, _) = store
            .token_and_cookie("https://Example.Slack.com")
            .expect("lookup");
        assert_eq!(token, "xoxc-1");
    }

    #[test]
    fn lookup_does_not_guess_scheme() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store.update(Some(bundle())).expect("update");

        let err = store
            .token_and_cookie("http://example.slack.com/")
            .expect_err("must fail");
        assert!(format!("{err}").contains("no token found"));
    }

    #[test]
    fn friendly_name_returns_workspace_name() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store.update(Some(bundle())).expect("update");

        assert_eq!(store.friendly_name(ORIGIN).expect("name"), "Example Workspace");
        let err = store
            .friendly_name("https://missing.slack.com/")
            .expect_err("must fail");
        assert!(matches!(err, SlackclipError::WorkspaceNotFound { .. }));
    }

    #[test]
    fn store_paths_point_at_credentials_file() {
        let paths = StorePaths::new("/tmp/slackclip-config");
        assert_eq!(
            paths.credentials_file(),
            std::path::PathBuf::from("/tmp/slackclip-config/credentials.json")
        );
    }

    #[test]
    fn file_extractor_reads_exported_bundle() {
        let temp = tempdir().expect("tempdir");
        let export = temp.path().join("export.json");
        fs::write(
            &export,
            r#"{"tokens":{"https://example.slack.com/":{"token":"xoxc-1","name":"Example Workspace"}},"cookie":{"name":"d","value":"cookie-value"}}"#,
        )
        .expect("write");

        let store = CredentialStore::new(temp.path().join("store/credentials.json"))
            .with_extractor(Box::new(FileExtractor::new(&export)));
        store.update(None).expect("update");
        assert_eq!(store.load().expect("load"), bundle());
    }

    #[test]
    fn file_extractor_rejects_garbage() {
        let temp = tempdir().expect("tempdir");
        let export = temp.path().join("export.json");
        fs::write(&export, r#"{"tokens":{}}"#).expect("write");

        let store = CredentialStore::new(temp.path().join("credentials.json"))
            .with_extractor(Box::new(FileExtractor::new(&export)));
        let err = store.update(None).expect_err("must fail");
        assert!(format!("{err}").contains("not a credential bundle"));
    }

    #[test]
    fn command_extractor_reports_missing_program() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json")).with_extractor(
            Box::new(CommandExtractor::new("slackclip-no-such-extractor", Vec::new())),
        );
        let err = store.update(None).expect_err("must fail");
        assert!(matches!(err, SlackclipError::Extraction(_)));
    }

    #[cfg(unix)]
    #[test]
    fn command_extractor_parses_stdout() {
        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json")).with_extractor(
            Box::new(CommandExtractor::new(
                "echo",
                vec![
                    r#"{"tokens":{"https://example.slack.com/":{"token":"xoxc-1","name":"Example Workspace"}},"cookie":{"name":"d","value":"cookie-value"}}"#
                        .to_string(),
                ],
            )),
        );
        store.update(None).expect("update");
        assert_eq!(store.load().expect("load"), bundle());
    }

    #[cfg(unix)]
    #[test]
    fn stored_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("tempdir");
        let store = CredentialStore::new(temp.path().join("credentials.json"));
        store.update(Some(bundle())).expect("update");

        let mode = fs::metadata(store.path()).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
