use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::scan::{MalformedPolicy, ScanOptions, Schema, DEFAULT_CHUNK_SIZE};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sources: SourcesConfig,
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    /// Attribute files to restrict to the discovered node set.
    /// When empty, defaults are derived from `sources`.
    #[serde(default)]
    pub projection: Vec<ProjectionConfig>,
    #[serde(default)]
    pub dedup: DedupConfig,
}

/// Source file locations
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Relation file (MRREL layout)
    pub edges: PathBuf,
    /// Concept names file (MRCONSO layout)
    pub concepts: Option<PathBuf>,
    /// Semantic types file (MRSTY layout)
    pub semantic_types: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    pub seed: String,
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

fn default_max_hops() -> usize {
    7
}

/// Output locations, file names relative to `dir`
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_edges_file")]
    pub edges_file: String,
    #[serde(default = "default_nodes_file")]
    pub nodes_file: String,
    #[serde(default = "default_neighbors_file")]
    pub neighbors_file: String,
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            edges_file: default_edges_file(),
            nodes_file: default_nodes_file(),
            neighbors_file: default_neighbors_file(),
            report_file: default_report_file(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("umls_output")
}

fn default_edges_file() -> String {
    "nhop_rel.csv".to_string()
}

fn default_nodes_file() -> String {
    "nhop_cuis.txt".to_string()
}

fn default_neighbors_file() -> String {
    "direct_rel.csv".to_string()
}

fn default_report_file() -> String {
    "run_report.json".to_string()
}

/// Scanner tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
    #[serde(default)]
    pub prefetch_chunks: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            delimiter: default_delimiter(),
            on_malformed: MalformedPolicy::default(),
            prefetch_chunks: 0,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_delimiter() -> char {
    '|'
}

/// One attribute projection pass
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionConfig {
    pub name: String,
    pub source: PathBuf,
    /// `concepts`, `semantic_types` or `edges`
    pub schema: String,
    #[serde(default = "default_key_column")]
    pub key_column: String,
    pub filter: Option<FilterConfig>,
    /// File name under `output.dir`
    pub output: String,
}

fn default_key_column() -> String {
    "CUI".to_string()
}

/// Secondary `column == value` condition
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    pub column: String,
    pub value: String,
}

/// Opt-in in-memory deduplication (direct-neighbor rows only)
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dedup_max_rows")]
    pub max_rows: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_rows: default_dedup_max_rows(),
        }
    }
}

fn default_dedup_max_rows() -> usize {
    1_000_000
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in KGEXTRACT_CONFIG environment variable
    /// 2. ./kgextract.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KGEXTRACT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("kgextract.toml"));

        Self::from_path(&config_path)
    }

    /// Load and validate a specific config file
    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scan.chunk_size == 0 {
            anyhow::bail!("scan.chunk_size must be greater than 0");
        }

        if matches!(self.scan.delimiter, '\n' | '\r') {
            anyhow::bail!("scan.delimiter cannot be a line terminator");
        }

        if self.discovery.seed.trim().is_empty() {
            anyhow::bail!("discovery.seed must not be empty");
        }

        require_file("sources.edges", &self.sources.edges)?;

        for projection in self.projections() {
            let schema = Schema::by_name(&projection.schema)
                .with_context(|| format!("projection {}", projection.name))?;
            schema
                .column_index(&projection.key_column)
                .with_context(|| format!("projection {}", projection.name))?;
            if let Some(filter) = &projection.filter {
                schema
                    .column_index(&filter.column)
                    .with_context(|| format!("projection {}", projection.name))?;
            }
            require_file(&format!("projection {} source", projection.name), &projection.source)?;
        }

        let mut names: Vec<&str> = self.projection.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            anyhow::bail!("projection names must be unique");
        }

        Ok(())
    }

    /// Configured projections, or the concept (English only) and semantic
    /// type passes when none are listed.
    pub fn projections(&self) -> Vec<ProjectionConfig> {
        if !self.projection.is_empty() {
            return self.projection.clone();
        }

        let mut defaults = Vec::new();
        if let Some(concepts) = &self.sources.concepts {
            defaults.push(ProjectionConfig {
                name: "concepts".to_string(),
                source: concepts.clone(),
                schema: "concepts".to_string(),
                key_column: default_key_column(),
                filter: Some(FilterConfig {
                    column: "LAT".to_string(),
                    value: "ENG".to_string(),
                }),
                output: "nhop_conso.csv".to_string(),
            });
        }
        if let Some(semantic_types) = &self.sources.semantic_types {
            defaults.push(ProjectionConfig {
                name: "semantic_types".to_string(),
                source: semantic_types.clone(),
                schema: "semantic_types".to_string(),
                key_column: default_key_column(),
                filter: None,
                output: "nhop_sty.csv".to_string(),
            });
        }
        defaults
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            chunk_size: self.scan.chunk_size,
            delimiter: self.scan.delimiter,
            on_malformed: self.scan.on_malformed,
            has_header: false,
            prefetch_chunks: self.scan.prefetch_chunks,
        }
    }

    /// Resolve a file name under the output directory
    pub fn output_path(&self, file: &str) -> PathBuf {
        self.output.dir.join(file)
    }

    /// Output file of the first projection over `schema`, if any.
    pub fn projection_output(&self, schema: &Schema) -> Option<PathBuf> {
        self.projections()
            .into_iter()
            .find(|p| Schema::by_name(&p.schema).ok().as_ref() == Some(schema))
            .map(|p| self.output_path(&p.output))
    }
}

fn require_file(what: &str, path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("{} does not exist: {}", what, path.display());
    }
    if !path.is_file() {
        anyhow::bail!("{} must be a file: {}", what, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{CONCEPTS, SEMANTIC_TYPES};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn toml_path(path: &Path) -> String {
        path.to_str().unwrap().replace('\\', "\\\\")
    }

    fn create_sources(temp_dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let rel = temp_dir.path().join("MRREL.RRF");
        let conso = temp_dir.path().join("MRCONSO.RRF");
        let sty = temp_dir.path().join("MRSTY.RRF");
        for p in [&rel, &conso, &sty] {
            fs::write(p, "").unwrap();
        }
        (rel, conso, sty)
    }

    fn create_test_config(temp_dir: &TempDir) -> String {
        let (rel, conso, sty) = create_sources(temp_dir);
        format!(
            r#"
[sources]
edges = "{}"
concepts = "{}"
semantic_types = "{}"

[discovery]
seed = "C0030567"
max_hops = 3

[scan]
chunk_size = 5000
on_malformed = "fail"
prefetch_chunks = 2
"#,
            toml_path(&rel),
            toml_path(&conso),
            toml_path(&sty)
        )
    }

    fn write_config(temp_dir: &TempDir, content: &str) -> PathBuf {
        let path = temp_dir.path().join("kgextract.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_from_path_success() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, &create_test_config(&temp_dir));

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.discovery.seed, "C0030567");
        assert_eq!(config.discovery.max_hops, 3);
        assert_eq!(config.scan.chunk_size, 5000);
        assert_eq!(config.scan.delimiter, '|');
        assert_eq!(config.scan.on_malformed, MalformedPolicy::Fail);
        assert_eq!(config.output.edges_file, "nhop_rel.csv");
        assert!(!config.dedup.enabled);

        let options = config.scan_options();
        assert_eq!(options.prefetch_chunks, 2);
        assert!(!options.has_header);
    }

    #[test]
    fn test_default_projections_from_sources() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, &create_test_config(&temp_dir));
        let config = Config::from_path(&path).unwrap();

        let projections = config.projections();
        assert_eq!(projections.len(), 2);
        assert_eq!(projections[0].name, "concepts");
        let filter = projections[0].filter.as_ref().unwrap();
        assert_eq!((filter.column.as_str(), filter.value.as_str()), ("LAT", "ENG"));
        assert!(projections[1].filter.is_none());
    }

    #[test]
    fn test_explicit_projection_validated() {
        let temp_dir = TempDir::new().unwrap();
        let (_, conso, _) = create_sources(&temp_dir);
        let mut content = create_test_config(&temp_dir);
        content.push_str(&format!(
            r#"
[[projection]]
name = "spanish"
source = "{}"
schema = "concepts"
output = "spa.csv"
filter = {{ column = "LANG", value = "SPA" }}
"#,
            toml_path(&conso)
        ));
        let path = write_config(&temp_dir, &content);

        let err = Config::from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("LANG"));
    }

    #[test]
    fn test_projection_output_follows_configured_names() {
        let temp_dir = TempDir::new().unwrap();
        let (_, conso, _) = create_sources(&temp_dir);
        let path = write_config(&temp_dir, &create_test_config(&temp_dir));
        let config = Config::from_path(&path).unwrap();
        assert_eq!(
            config.projection_output(&CONCEPTS),
            Some(config.output_path("nhop_conso.csv"))
        );
        assert_eq!(
            config.projection_output(&SEMANTIC_TYPES),
            Some(config.output_path("nhop_sty.csv"))
        );

        let mut content = create_test_config(&temp_dir);
        content.push_str(&format!(
            r#"
[[projection]]
name = "names"
source = "{}"
schema = "mrconso"
output = "labels.csv"
"#,
            toml_path(&conso)
        ));
        let config = Config::from_path(&write_config(&temp_dir, &content)).unwrap();
        assert_eq!(config.projection_output(&CONCEPTS), Some(config.output_path("labels.csv")));
        assert_eq!(config.projection_output(&SEMANTIC_TYPES), None);
    }

    #[test]
    fn test_missing_edges_file() {
        let temp_dir = TempDir::new().unwrap();
        let content = r#"
[sources]
edges = "/definitely/not/here/MRREL.RRF"

[discovery]
seed = "C0030567"
"#;
        let path = write_config(&temp_dir, content);
        let err = Config::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("sources.edges"));
    }

    #[test]
    fn test_rejects_zero_chunk_size_and_empty_seed() {
        let temp_dir = TempDir::new().unwrap();
        let content = create_test_config(&temp_dir).replace("chunk_size = 5000", "chunk_size = 0");
        let path = write_config(&temp_dir, &content);
        assert!(Config::from_path(&path).is_err());

        let content = create_test_config(&temp_dir).replace("C0030567", " ");
        let path = write_config(&temp_dir, &content);
        assert!(Config::from_path(&path).is_err());
    }

    #[test]
    fn test_load_from_env_var() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, &create_test_config(&temp_dir));

        let original = std::env::var("KGEXTRACT_CONFIG").ok();
        std::env::set_var("KGEXTRACT_CONFIG", &path);
        let config = Config::load();
        std::env::remove_var("KGEXTRACT_CONFIG");
        if let Some(v) = original {
            std::env::set_var("KGEXTRACT_CONFIG", v);
        }

        let config = config.unwrap();
        assert_eq!(config.discovery.max_hops, 3);
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("KGEXTRACT_CONFIG").ok();
        std::env::set_var("KGEXTRACT_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("KGEXTRACT_CONFIG");
        if let Some(v) = original {
            std::env::set_var("KGEXTRACT_CONFIG", v);
        }
    }
}
