//! Import job configuration (`trialfold.toml`).
//!
//! Defines the typed configuration for a batch run: where the store, queue,
//! and event log live, which actor name the importer locks documents under,
//! and the merge policy (preserved subtrees, significant elements, terminal
//! statuses).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level importer configuration.
///
/// Parsed from `trialfold.toml`. Missing fields use sensible defaults.
/// Missing file → all defaults (no error).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
#[derive(Default)]
pub struct TrialfoldConfig {
    /// Batch job settings.
    #[serde(default)]
    pub job: JobConfig,

    /// Merge policy settings.
    #[serde(default)]
    pub merge: MergeConfig,
}

// ---------------------------------------------------------------------------
// JobConfig
// ---------------------------------------------------------------------------

/// Batch job settings: paths and the importer's actor identity.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Actor name the importer acquires document locks under
    /// (default: `"ctimport"`).
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Path to the queue file: a JSON array of external records
    /// (default: `"queue.json"`).
    #[serde(default = "default_queue")]
    pub queue: PathBuf,

    /// Path to the append-only import-event log, one JSON object per line
    /// (default: `"import-events.jsonl"`).
    #[serde(default = "default_event_log")]
    pub event_log: PathBuf,

    /// Root directory of the document store (default: `"store"`).
    #[serde(default = "default_store")]
    pub store: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            actor: default_actor(),
            queue: default_queue(),
            event_log: default_event_log(),
            store: default_store(),
        }
    }
}

fn default_actor() -> String {
    "ctimport".to_owned()
}

fn default_queue() -> PathBuf {
    PathBuf::from("queue.json")
}

fn default_event_log() -> PathBuf {
    PathBuf::from("import-events.jsonl")
}

fn default_store() -> PathBuf {
    PathBuf::from("store")
}

// ---------------------------------------------------------------------------
// MergeConfig
// ---------------------------------------------------------------------------

/// Merge policy settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Curated subtrees carried from the existing document into every merged
    /// candidate. These elements are owned by curators, never by the feed.
    #[serde(default = "default_preserved_tags")]
    pub preserved_tags: Vec<String>,

    /// Elements whose change marks an update as significant and routes the
    /// record to curator review.
    #[serde(default = "default_significant_tags")]
    pub significant_tags: Vec<String>,

    /// Element holding the record's overall status
    /// (default: `"OverallStatus"`).
    #[serde(default = "default_status_tag")]
    pub status_tag: String,

    /// Status values that put a record on review hold regardless of content
    /// changes.
    #[serde(default = "default_terminal_statuses")]
    pub terminal_statuses: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            preserved_tags: default_preserved_tags(),
            significant_tags: default_significant_tags(),
            status_tag: default_status_tag(),
            terminal_statuses: default_terminal_statuses(),
        }
    }
}

fn default_preserved_tags() -> Vec<String> {
    vec![
        "PDQIndexing".to_owned(),
        "PDQProtocolIDs".to_owned(),
        "ProtocolProcessingDetails".to_owned(),
    ]
}

fn default_significant_tags() -> Vec<String> {
    vec![
        "OfficialTitle".to_owned(),
        "BriefSummary".to_owned(),
        "Eligibility".to_owned(),
        "OverallStatus".to_owned(),
    ]
}

fn default_status_tag() -> String {
    "OverallStatus".to_owned()
}

fn default_terminal_statuses() -> Vec<String> {
    vec!["Withdrawn".to_owned(), "Terminated".to_owned()]
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl TrialfoldConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse
    /// errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                // Calculate line number from byte offset.
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = TrialfoldConfig::default();
        assert_eq!(cfg.job.actor, "ctimport");
        assert_eq!(cfg.job.queue, PathBuf::from("queue.json"));
        assert_eq!(cfg.job.event_log, PathBuf::from("import-events.jsonl"));
        assert_eq!(cfg.job.store, PathBuf::from("store"));
        assert_eq!(
            cfg.merge.preserved_tags,
            vec!["PDQIndexing", "PDQProtocolIDs", "ProtocolProcessingDetails"]
        );
        assert_eq!(cfg.merge.status_tag, "OverallStatus");
        assert_eq!(cfg.merge.terminal_statuses, vec!["Withdrawn", "Terminated"]);
        assert!(
            cfg.merge
                .significant_tags
                .contains(&"OverallStatus".to_owned())
        );
    }

    #[test]
    fn parse_empty_string() {
        let cfg = TrialfoldConfig::parse("").unwrap();
        assert_eq!(cfg, TrialfoldConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[job]
actor = "nightly-import"
queue = "/var/lib/trialfold/queue.json"
event_log = "/var/log/trialfold/events.jsonl"
store = "/var/lib/trialfold/store"

[merge]
preserved_tags = ["PDQIndexing"]
significant_tags = ["OverallStatus"]
status_tag = "RecruitmentStatus"
terminal_statuses = ["Halted"]
"#;
        let cfg = TrialfoldConfig::parse(toml).unwrap();
        assert_eq!(cfg.job.actor, "nightly-import");
        assert_eq!(cfg.job.store, PathBuf::from("/var/lib/trialfold/store"));
        assert_eq!(cfg.merge.preserved_tags, vec!["PDQIndexing"]);
        assert_eq!(cfg.merge.status_tag, "RecruitmentStatus");
        assert_eq!(cfg.merge.terminal_statuses, vec!["Halted"]);
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let toml = r#"
[job]
actor = "importer2"
"#;
        let cfg = TrialfoldConfig::parse(toml).unwrap();
        assert_eq!(cfg.job.actor, "importer2");
        // Everything else is default.
        assert_eq!(cfg.job.queue, PathBuf::from("queue.json"));
        assert_eq!(cfg.merge.status_tag, "OverallStatus");
    }

    #[test]
    fn parse_rejects_unknown_top_level_field() {
        let toml = r"
unknown_field = true
";
        let err = TrialfoldConfig::parse(toml).unwrap_err();
        assert!(
            err.message.contains("unknown field"),
            "error should mention unknown field: {}",
            err.message
        );
    }

    #[test]
    fn parse_rejects_unknown_nested_field() {
        let toml = r#"
[job]
actor = "x"
extra = "oops"
"#;
        let err = TrialfoldConfig::parse(toml).unwrap_err();
        assert!(
            err.message.contains("unknown field"),
            "error should mention unknown field: {}",
            err.message
        );
    }

    #[test]
    fn parse_includes_line_number_on_error() {
        let toml = "good = 1\n[job]\nactor = 42\n";
        let err = TrialfoldConfig::parse(toml).unwrap_err();
        assert!(
            err.message.contains("line"),
            "error should include line number: {}",
            err.message
        );
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let cfg = TrialfoldConfig::load(Path::new("/nonexistent/trialfold.toml")).unwrap();
        assert_eq!(cfg, TrialfoldConfig::default());
    }

    #[test]
    fn load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trialfold.toml");
        std::fs::write(
            &path,
            r#"
[job]
actor = "release-import"
"#,
        )
        .unwrap();
        let cfg = TrialfoldConfig::load(&path).unwrap();
        assert_eq!(cfg.job.actor, "release-import");
    }

    #[test]
    fn load_invalid_file_shows_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = TrialfoldConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(!err.message.is_empty());
    }

    #[test]
    fn config_error_display_with_path() {
        let err = ConfigError {
            path: Some(PathBuf::from("/etc/trialfold.toml")),
            message: "bad field".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("/etc/trialfold.toml"));
        assert!(msg.contains("bad field"));
    }

    #[test]
    fn config_error_display_without_path() {
        let err = ConfigError {
            path: None,
            message: "parse error".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("config error"));
        assert!(msg.contains("parse error"));
    }
}
