use crate::rating::{LabelEntry, RatingVocabulary, MAX_RATING};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings as read from the layered sources, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, alias = "INPUT_PATH")]
    pub input_path: Option<String>,
    #[serde(default, alias = "OUTPUT_PATH")]
    pub output_path: Option<String>,
    #[serde(default, alias = "NOTATION")]
    pub notation: Option<i64>,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub vocabulary: Vec<LabelEntry>,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub clean: CleanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_rating_field")]
    pub rating_field: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            rating_field: default_rating_field(),
        }
    }
}

fn default_provider() -> String {
    "xmp".to_string()
}

fn default_rating_field() -> String {
    "Notation".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub on_unknown_rating: UnknownRatingPolicy,
    #[serde(default)]
    pub verify: bool,
}

/// What to do with a file whose rating label is missing or not in the
/// vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownRatingPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanConfig {
    #[serde(default)]
    pub method: CleanMethod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanMethod {
    #[default]
    Delete,
    Trash,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} is empty, please set it")]
    EmptyPath(&'static str),
    #[error("the {key} folder does not exist ({})", path.display())]
    NotFound { key: &'static str, path: PathBuf },
    #[error("the {key} path is not a folder ({})", path.display())]
    NotADirectory { key: &'static str, path: PathBuf },
    #[error("NOTATION must be between 0 and 5, got {0}")]
    RatingOutOfRange(i64),
    #[error("input and output folders overlap ({} / {})", input.display(), output.display())]
    Overlap { input: PathBuf, output: PathBuf },
    #[error("unknown metadata provider '{name}' (available: {available})")]
    UnknownProvider { name: String, available: String },
    #[error("invalid rating vocabulary: {0}")]
    Vocabulary(String),
    #[error("invalid exclude pattern '{pattern}': {source}")]
    Exclude {
        pattern: String,
        source: globset::Error,
    },
}

/// Where ratings come from and how their labels read.
#[derive(Debug, Clone)]
pub struct RatingSource {
    pub provider: String,
    pub rating_field: String,
    pub vocabulary: RatingVocabulary,
}

/// Validated run configuration. Built once, then passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub min_rating: u8,
    pub rating: RatingSource,
    pub exclude: GlobSet,
    pub on_unknown_rating: UnknownRatingPolicy,
    pub verify: bool,
    pub clean_method: CleanMethod,
}

/// Loads `path` if given, otherwise an optional `user_configuration` file
/// in the working directory, then `STARSIFT_*` environment variables.
pub fn load(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    load_with_env(path, environment())
}

/// `STARSIFT_INPUT_PATH`, `STARSIFT_SCAN__VERIFY`, ...
fn environment() -> config::Environment {
    config::Environment::with_prefix("STARSIFT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_with_env(path: Option<&str>, env: config::Environment) -> Result<AppConfig, ConfigError> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings =
            settings.add_source(config::File::with_name("user_configuration").required(false));
    }
    settings = settings.add_source(env);
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

impl AppConfig {
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let input = require_dir("INPUT_PATH", self.input_path.as_deref())?;
        let output = require_dir("OUTPUT_PATH", self.output_path.as_deref())?;
        let min_rating = self.threshold()?;
        check_disjoint(&input, &output)?;

        Ok(Settings {
            input,
            output,
            min_rating,
            rating: self.rating_source()?,
            exclude: build_globset(&self.scan.exclude)?,
            on_unknown_rating: self.scan.on_unknown_rating,
            verify: self.scan.verify,
            clean_method: self.clean.method,
        })
    }

    pub fn rating_source(&self) -> Result<RatingSource, ConfigError> {
        let vocabulary = if self.vocabulary.is_empty() {
            RatingVocabulary::default()
        } else {
            RatingVocabulary::from_entries(&self.vocabulary)
                .map_err(|e| ConfigError::Vocabulary(e.to_string()))?
        };
        Ok(RatingSource {
            provider: self.metadata.provider.clone(),
            rating_field: self.metadata.rating_field.clone(),
            vocabulary,
        })
    }

    /// Validates only what the cleaner needs.
    pub fn validate_output(&self) -> Result<PathBuf, ConfigError> {
        require_dir("OUTPUT_PATH", self.output_path.as_deref())
    }

    fn threshold(&self) -> Result<u8, ConfigError> {
        let raw = self.notation.ok_or(ConfigError::Missing("NOTATION"))?;
        u8::try_from(raw)
            .ok()
            .filter(|n| *n <= MAX_RATING)
            .ok_or(ConfigError::RatingOutOfRange(raw))
    }
}

fn require_dir(key: &'static str, value: Option<&str>) -> Result<PathBuf, ConfigError> {
    let value = value.ok_or(ConfigError::Missing(key))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyPath(key));
    }
    let path = PathBuf::from(value);
    if !path.exists() {
        return Err(ConfigError::NotFound { key, path });
    }
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory { key, path });
    }
    Ok(path)
}

fn check_disjoint(input: &Path, output: &Path) -> Result<(), ConfigError> {
    let canon = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    let (a, b) = (canon(input), canon(output));
    if a.starts_with(&b) || b.starts_with(&a) {
        return Err(ConfigError::Overlap {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        });
    }
    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|source| ConfigError::Exclude {
            pattern: pat.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Exclude {
        pattern: patterns.join(","),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dirs() -> (tempfile::TempDir, String, String) {
        let temp = tempfile::tempdir().unwrap();
        let input = temp.path().join("in");
        let output = temp.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        (
            temp,
            input.to_string_lossy().into_owned(),
            output.to_string_lossy().into_owned(),
        )
    }

    fn app(input: &str, output: &str, notation: i64) -> AppConfig {
        AppConfig {
            input_path: Some(input.to_string()),
            output_path: Some(output.to_string()),
            notation: Some(notation),
            ..AppConfig::default()
        }
    }

    #[test]
    fn valid_config_uses_defaults() {
        let (_t, input, output) = dirs();
        let settings = app(&input, &output, 4).validate().unwrap();
        assert_eq!(settings.min_rating, 4);
        assert_eq!(settings.rating.provider, "xmp");
        assert_eq!(settings.rating.rating_field, "Notation");
        assert_eq!(settings.rating.vocabulary.lookup("4 étoiles").unwrap(), 4);
        assert_eq!(settings.on_unknown_rating, UnknownRatingPolicy::Abort);
        assert_eq!(settings.clean_method, CleanMethod::Delete);
    }

    #[test]
    fn empty_paths_are_rejected() {
        let (_t, input, _output) = dirs();
        let err = app(&input, "", 3).validate().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPath("OUTPUT_PATH")));
        let err = app("  ", &input, 3).validate().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPath("INPUT_PATH")));
    }

    #[test]
    fn missing_values_are_not_defaulted() {
        let (_t, input, output) = dirs();
        let mut cfg = app(&input, &output, 3);
        cfg.notation = None;
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::Missing("NOTATION")
        ));
        cfg.notation = Some(3);
        cfg.input_path = None;
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::Missing("INPUT_PATH")
        ));
    }

    #[test]
    fn nonexistent_and_non_directory_paths_are_rejected() {
        let (t, input, _output) = dirs();
        let missing = t.path().join("nope").to_string_lossy().into_owned();
        assert!(matches!(
            app(&input, &missing, 3).validate().unwrap_err(),
            ConfigError::NotFound { key: "OUTPUT_PATH", .. }
        ));

        let file = t.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let file = file.to_string_lossy().into_owned();
        assert!(matches!(
            app(&file, &input, 3).validate().unwrap_err(),
            ConfigError::NotADirectory { key: "INPUT_PATH", .. }
        ));
    }

    #[test]
    fn threshold_must_be_in_range() {
        let (_t, input, output) = dirs();
        for bad in [-1, 6, 1000] {
            assert!(matches!(
                app(&input, &output, bad).validate().unwrap_err(),
                ConfigError::RatingOutOfRange(n) if n == bad
            ));
        }
        for good in 0..=5 {
            assert!(app(&input, &output, good).validate().is_ok());
        }
    }

    #[test]
    fn nested_folders_are_rejected() {
        let (_t, input, _output) = dirs();
        let nested = std::path::Path::new(&input).join("best");
        fs::create_dir_all(&nested).unwrap();
        let nested = nested.to_string_lossy().into_owned();
        assert!(matches!(
            app(&input, &nested, 3).validate().unwrap_err(),
            ConfigError::Overlap { .. }
        ));
        assert!(matches!(
            app(&input, &input, 3).validate().unwrap_err(),
            ConfigError::Overlap { .. }
        ));
    }

    #[test]
    fn bad_exclude_glob_is_a_config_error() {
        let (_t, input, output) = dirs();
        let mut cfg = app(&input, &output, 3);
        cfg.scan.exclude = vec!["[".to_string()];
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::Exclude { .. }
        ));
    }

    #[test]
    fn loads_original_json_keys() {
        let (t, input, output) = dirs();
        let file = t.path().join("settings.json");
        let doc = serde_json::json!({
            "INPUT_PATH": input,
            "OUTPUT_PATH": output,
            "NOTATION": 2,
        });
        fs::write(&file, doc.to_string()).unwrap();

        let cfg = load(Some(file.to_str().unwrap())).unwrap();
        let settings = cfg.validate().unwrap();
        assert_eq!(settings.min_rating, 2);
        assert_eq!(settings.input, std::path::PathBuf::from(&input));
    }

    #[test]
    fn loads_custom_vocabulary_from_toml() {
        let (t, input, output) = dirs();
        let file = t.path().join("settings.toml");
        let doc = format!(
            r#"
input_path = '{input}'
output_path = '{output}'
notation = 1

[metadata]
rating_field = "Rating"

[[vocabulary]]
label = "Unrated"
rating = 0

[[vocabulary]]
label = "1 Star"
rating = 1
"#
        );
        fs::write(&file, doc).unwrap();

        let settings = load(Some(file.to_str().unwrap()))
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(settings.rating.rating_field, "Rating");
        assert_eq!(settings.rating.vocabulary.lookup("1 Star").unwrap(), 1);
        assert!(settings.rating.vocabulary.lookup("1 étoile").is_err());
    }

    #[test]
    fn environment_overrides_the_file() {
        let (t, input, output) = dirs();
        let file = t.path().join("settings.toml");
        fs::write(&file, format!("output_path = '{output}'\nnotation = 1\n")).unwrap();
        let vars: config::Map<String, String> = [
            ("STARSIFT_INPUT_PATH", input.as_str()),
            ("STARSIFT_NOTATION", "3"),
            ("STARSIFT_SCAN__VERIFY", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg = load_with_env(file.to_str(), environment().source(Some(vars))).unwrap();
        assert_eq!(cfg.input_path.as_deref(), Some(input.as_str()));
        assert_eq!(cfg.notation, Some(3));
        assert!(cfg.scan.verify);
        assert_eq!(cfg.validate().unwrap().min_rating, 3);
    }
}
