//! config.rs
//!
//! Runtime configuration for `sonora-bulk`.
//!
//! Precedence (highest first): CLI flags > `SONORA_*` environment > TOML file > defaults.
//!
//! ```toml
//! separator = ";"
//! snapshot_dir = "/tmp"
//!
//! [editor]
//! program = "sqlite3"
//! args = ["-header", "-column"]
//!
//! [discovery]
//! extensions = ["mp3"]
//! follow_symlinks = false
//!
//! [reconcile]
//! null_fields = "clear"   # or "skip"
//! on_failure = "consume"  # or "retain"
//! ```

use std::collections::HashMap;
use std::fs;
use std::hash::BuildHasher;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::core::library::Filter;
use crate::core::multivalue::{DEFAULT_SEPARATOR, MultiValue};
use crate::core::reconcile::{FailurePolicy, NullPolicy};

pub const ENV_SEPARATOR: &str = "SONORA_SEPARATOR";
pub const ENV_EDITOR: &str = "SONORA_EDITOR";
pub const ENV_SNAPSHOT_DIR: &str = "SONORA_SNAPSHOT_DIR";
pub const ENV_NULL_FIELDS: &str = "SONORA_NULL_FIELDS";
pub const ENV_ON_FAILURE: &str = "SONORA_ON_FAILURE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            program: "sqlite3".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub null_fields: NullPolicy,
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub separator: char,
    pub snapshot_dir: PathBuf,
    pub editor: EditorConfig,
    pub discovery: Filter,
    pub reconcile: ReconcileConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            snapshot_dir: std::env::temp_dir(),
            editor: EditorConfig::default(),
            discovery: Filter::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl Config {
    pub fn multi_value(&self) -> MultiValue {
        MultiValue::new(self.separator)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditorPatch {
    program: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DiscoveryPatch {
    extensions: Option<Vec<String>>,
    follow_symlinks: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReconcilePatch {
    null_fields: Option<NullPolicy>,
    on_failure: Option<FailurePolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    separator: Option<String>,
    snapshot_dir: Option<PathBuf>,
    editor: Option<EditorPatch>,
    discovery: Option<DiscoveryPatch>,
    reconcile: Option<ReconcilePatch>,
}

/// Values given on the command line. `None` = not given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub separator: Option<String>,
    pub editor: Option<String>,
    pub snapshot_dir: Option<PathBuf>,
    pub null_fields: Option<NullPolicy>,
    pub on_failure: Option<FailurePolicy>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub config_file_used: Option<PathBuf>,
    pub env_keys_used: Vec<String>,
}

/// `<config dir>/sonora/bulk.toml`, if the platform has a config dir.
pub fn default_config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sonora").join("bulk.toml"))
}

/// Load from file, environment and CLI.
///
/// An explicit `--config` file must exist; the default one is optional.
pub fn load_from_sources<S: BuildHasher>(
    env: &HashMap<String, String, S>,
    cli: &CliOverrides,
) -> Result<ConfigLoadResult, ConfigError> {
    let file = match &cli.config_path {
        Some(path) => Some(read_file(path)?),
        None => match default_config_file_path() {
            Some(path) if path.exists() => Some(read_file(&path)?),
            _ => None,
        },
    };

    load_from_str(
        file.as_ref().map(|(path, toml)| (path.as_path(), toml.as_str())),
        env,
        cli,
    )
}

/// Same as [`load_from_sources`] with the file already read.
pub fn load_from_str<S: BuildHasher>(
    file: Option<(&Path, &str)>,
    env: &HashMap<String, String, S>,
    cli: &CliOverrides,
) -> Result<ConfigLoadResult, ConfigError> {
    let mut config = Config::default();

    if let Some((path, toml)) = file {
        let patch: ConfigPatch = toml::from_str(toml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        apply_patch(&mut config, patch)?;
    }

    let env_keys_used = apply_env_overrides(&mut config, env)?;
    apply_cli_overrides(&mut config, cli)?;
    validate(&config)?;

    Ok(ConfigLoadResult {
        config,
        config_file_used: file.map(|(path, _)| path.to_path_buf()),
        env_keys_used,
    })
}

fn read_file(path: &Path) -> Result<(PathBuf, String), ConfigError> {
    let toml = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((path.to_path_buf(), toml))
}

fn apply_patch(config: &mut Config, patch: ConfigPatch) -> Result<(), ConfigError> {
    if let Some(separator) = patch.separator {
        config.separator = parse_separator(&separator)?;
    }
    if let Some(dir) = patch.snapshot_dir {
        config.snapshot_dir = dir;
    }

    if let Some(editor) = patch.editor {
        if let Some(program) = editor.program {
            config.editor.program = program;
        }
        if let Some(args) = editor.args {
            config.editor.args = args;
        }
    }

    if let Some(discovery) = patch.discovery {
        if let Some(extensions) = discovery.extensions {
            config.discovery.extensions = normalize_extensions(extensions);
        }
        if let Some(follow) = discovery.follow_symlinks {
            config.discovery.follow_symlinks = follow;
        }
    }

    if let Some(reconcile) = patch.reconcile {
        if let Some(null_fields) = reconcile.null_fields {
            config.reconcile.null_fields = null_fields;
        }
        if let Some(on_failure) = reconcile.on_failure {
            config.reconcile.on_failure = on_failure;
        }
    }

    Ok(())
}

fn apply_env_overrides(
    config: &mut Config,
    env: &HashMap<String, String, impl BuildHasher>,
) -> Result<Vec<String>, ConfigError> {
    let mut keys_used = Vec::new();

    if let Some(value) = env.get(ENV_SEPARATOR) {
        config.separator = parse_separator(value)?;
        keys_used.push(ENV_SEPARATOR.to_string());
    }

    if let Some(value) = env.get(ENV_EDITOR) {
        config.editor = parse_editor(value, "editor.program")?;
        keys_used.push(ENV_EDITOR.to_string());
    }

    if let Some(value) = env.get(ENV_SNAPSHOT_DIR) {
        config.snapshot_dir = PathBuf::from(value);
        keys_used.push(ENV_SNAPSHOT_DIR.to_string());
    }

    if let Some(value) = env.get(ENV_NULL_FIELDS) {
        config.reconcile.null_fields = match value.trim().to_ascii_lowercase().as_str() {
            "clear" => NullPolicy::Clear,
            "skip" => NullPolicy::Skip,
            _ => {
                return Err(ConfigError::Invalid {
                    field: "reconcile.null_fields",
                    value: value.clone(),
                    reason: "expected clear|skip",
                });
            }
        };
        keys_used.push(ENV_NULL_FIELDS.to_string());
    }

    if let Some(value) = env.get(ENV_ON_FAILURE) {
        config.reconcile.on_failure = match value.trim().to_ascii_lowercase().as_str() {
            "consume" => FailurePolicy::Consume,
            "retain" => FailurePolicy::Retain,
            _ => {
                return Err(ConfigError::Invalid {
                    field: "reconcile.on_failure",
                    value: value.clone(),
                    reason: "expected consume|retain",
                });
            }
        };
        keys_used.push(ENV_ON_FAILURE.to_string());
    }

    Ok(keys_used)
}

fn apply_cli_overrides(config: &mut Config, cli: &CliOverrides) -> Result<(), ConfigError> {
    if let Some(separator) = &cli.separator {
        config.separator = parse_separator(separator)?;
    }
    if let Some(editor) = &cli.editor {
        config.editor = parse_editor(editor, "--editor")?;
    }
    if let Some(dir) = &cli.snapshot_dir {
        config.snapshot_dir.clone_from(dir);
    }
    if let Some(null_fields) = cli.null_fields {
        config.reconcile.null_fields = null_fields;
    }
    if let Some(on_failure) = cli.on_failure {
        config.reconcile.on_failure = on_failure;
    }
    Ok(())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.discovery.extensions.is_empty() {
        return Err(ConfigError::Invalid {
            field: "discovery.extensions",
            value: "[]".to_string(),
            reason: "at least one extension is required",
        });
    }
    if config.editor.program.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "editor.program",
            value: config.editor.program.clone(),
            reason: "must not be empty",
        });
    }
    Ok(())
}

/// Exactly one character, not NUL (the ID3 value delimiter) and not a line break.
pub fn parse_separator(value: &str) -> Result<char, ConfigError> {
    let invalid = |reason| ConfigError::Invalid {
        field: "separator",
        value: value.to_string(),
        reason,
    };

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some('\0'), None) => Err(invalid("NUL is reserved")),
        (Some('\n' | '\r'), None) => Err(invalid("line breaks are not allowed")),
        (Some(c), None) => Ok(c),
        _ => Err(invalid("must be exactly one character")),
    }
}

/// `"program arg1 arg2"` -> program + args.
fn parse_editor(value: &str, field: &'static str) -> Result<EditorConfig, ConfigError> {
    let mut words = value.split_whitespace().map(str::to_string);
    let Some(program) = words.next() else {
        return Err(ConfigError::Invalid {
            field,
            value: value.to_string(),
            reason: "must not be empty",
        });
    };
    Ok(EditorConfig {
        program,
        args: words.collect(),
    })
}

fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(file: Option<&str>, env: &[(&str, &str)], cli: &CliOverrides) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_from_str(file.map(|t| (Path::new("bulk.toml"), t)), &env, cli).map(|r| r.config)
    }

    #[test]
    fn defaults_without_any_source() {
        let config = load(None, &[], &CliOverrides::default()).expect("defaults");
        assert_eq!(config.separator, ';');
        assert_eq!(config.editor.program, "sqlite3");
        assert_eq!(config.discovery.extensions, vec!["mp3"]);
        assert_eq!(config.reconcile.null_fields, NullPolicy::Clear);
        assert_eq!(config.reconcile.on_failure, FailurePolicy::Consume);
    }

    #[test]
    fn precedence_is_cli_then_env_then_file_then_defaults() {
        let file = "separator = \"|\"\n\
                    [editor]\nprogram = \"sqlitebrowser\"\n\
                    [reconcile]\nnull_fields = \"skip\"\non_failure = \"retain\"\n";
        let env = [(ENV_SEPARATOR, ","), (ENV_ON_FAILURE, "consume")];
        let cli = CliOverrides {
            separator: Some("/".into()),
            ..CliOverrides::default()
        };

        let config = load(Some(file), &env, &cli).expect("load");
        assert_eq!(config.separator, '/');
        assert_eq!(config.reconcile.on_failure, FailurePolicy::Consume);
        assert_eq!(config.reconcile.null_fields, NullPolicy::Skip);
        assert_eq!(config.editor.program, "sqlitebrowser");
    }

    #[test]
    fn env_keys_are_reported() {
        let env: HashMap<String, String> =
            HashMap::from([(ENV_SNAPSHOT_DIR.to_string(), "/var/tmp".to_string())]);
        let result = load_from_str(None, &env, &CliOverrides::default()).expect("load");
        assert_eq!(result.env_keys_used, vec![ENV_SNAPSHOT_DIR.to_string()]);
        assert_eq!(result.config.snapshot_dir, PathBuf::from("/var/tmp"));
        assert!(result.config_file_used.is_none());
    }

    #[test]
    fn editor_string_splits_into_program_and_args() {
        let cli = CliOverrides {
            editor: Some("sqlite3 -header -column".into()),
            ..CliOverrides::default()
        };
        let config = load(None, &[], &cli).expect("load");
        assert_eq!(config.editor.program, "sqlite3");
        assert_eq!(config.editor.args, vec!["-header", "-column"]);
    }

    #[test]
    fn extensions_are_normalized() {
        let file = "[discovery]\nextensions = [\".MP3\", \"Mp2\"]\nfollow_symlinks = true\n";
        let config = load(Some(file), &[], &CliOverrides::default()).expect("load");
        assert_eq!(config.discovery.extensions, vec!["mp3", "mp2"]);
        assert!(config.discovery.follow_symlinks);
    }

    #[test]
    fn bad_separators_are_rejected() {
        for bad in ["", ";;", "\0", "\n"] {
            assert!(
                matches!(parse_separator(bad), Err(ConfigError::Invalid { field: "separator", .. })),
                "{bad:?}"
            );
        }
        assert_eq!(parse_separator("|").expect("valid"), '|');
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let file = "[discovery]\nextensions = []\n";
        let err = load(Some(file), &[], &CliOverrides::default()).expect_err("empty");
        assert!(matches!(err, ConfigError::Invalid { field: "discovery.extensions", .. }));
    }

    #[test]
    fn unknown_keys_and_bad_policies_fail_to_parse() {
        let err = load(Some("colour = \"red\"\n"), &[], &CliOverrides::default())
            .expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = load(None, &[(ENV_NULL_FIELDS, "maybe")], &CliOverrides::default())
            .expect_err("bad policy");
        assert!(matches!(err, ConfigError::Invalid { field: "reconcile.null_fields", .. }));
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = CliOverrides {
            config_path: Some(dir.path().join("nope.toml")),
            ..CliOverrides::default()
        };
        let err = load_from_sources(&HashMap::<String, String>::new(), &cli).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
