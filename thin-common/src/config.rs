// thin-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;
use url::Url;

use super::error::{Result, ThinError};

const DEFAULT_NAME: &str = "thin";
const DEFAULT_REPOSITORY: &str = "https://repo.maven.apache.org/maven2/";
const DEFAULT_ROOT_DIRNAME: &str = ".m2";
/// Searched after the package itself: the working directory, then the package root.
const DEFAULT_LOCATIONS: &[&str] = &["file:.", "classpath:/"];

/// Environment variables consulted by [`Config::load`], mapped to option keys.
const ENV_OPTIONS: &[(&str, &str)] = &[
    ("THIN_ROOT", "root"),
    ("THIN_DRYRUN", "dryRun"),
    ("THIN_CLASSPATH", "classpathOnly"),
    ("THIN_MAIN", "mainOverride"),
    ("THIN_PARENT", "parentLocator"),
    ("THIN_NAME", "name"),
    ("THIN_PROFILE", "profile"),
    ("THIN_LOCATION", "extraLocations"),
    ("THIN_ARCHIVE", "archive"),
    ("THIN_OFFLINE", "offline"),
    ("THIN_REPOSITORIES", "repositories"),
    ("THIN_DEBUG", "debug"),
];

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub dry_run: bool,
    pub classpath_only: bool,
    pub main_override: Option<String>,
    pub parent_locator: Option<String>,
    pub archive: Option<String>,
    pub name: String,
    pub profiles: Vec<String>,
    pub extra_locations: Vec<String>,
    pub repositories: Vec<Url>,
    pub offline: bool,
    pub debug: bool,
}

impl Config {
    /// Defaults overlaid with any `THIN_*` environment variables.
    pub fn load() -> Result<Self> {
        debug!("Loading thin configuration");
        let mut config = Self::defaults()?;
        for (var, key) in ENV_OPTIONS {
            if let Ok(value) = env::var(var) {
                debug!("Applying {}={} from environment", var, value);
                config.apply_option(key, &value)?;
            }
        }
        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    pub fn defaults() -> Result<Self> {
        let root = UserDirs::new()
            .map(|ud| ud.home_dir().join(DEFAULT_ROOT_DIRNAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIRNAME));
        Ok(Self {
            root,
            dry_run: false,
            classpath_only: false,
            main_override: None,
            parent_locator: None,
            archive: None,
            name: DEFAULT_NAME.to_string(),
            profiles: Vec::new(),
            extra_locations: DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect(),
            repositories: vec![Url::parse(DEFAULT_REPOSITORY)?],
            offline: false,
            debug: false,
        })
    }

    /// Applies named option pairs in order. Unknown keys are ignored.
    pub fn apply_options<'a, I>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in options {
            self.apply_option(key, value)?;
        }
        Ok(())
    }

    /// Accepts both `dryRun` and `thin.dryrun` style keys.
    pub fn apply_option(&mut self, key: &str, value: &str) -> Result<()> {
        let key = key.strip_prefix("thin.").unwrap_or(key);
        let value = value.trim();
        match key.to_ascii_lowercase().as_str() {
            "root" => {
                if !value.is_empty() {
                    self.root = PathBuf::from(value);
                }
            }
            "dryrun" => self.dry_run = parse_flag(value),
            "classpathonly" | "classpath" => self.classpath_only = parse_flag(value),
            "mainoverride" | "main" => self.main_override = non_empty(value),
            "parentlocator" | "parent" => self.parent_locator = non_empty(value),
            "archive" => self.archive = non_empty(value),
            "name" => {
                self.name = non_empty(value).unwrap_or_else(|| DEFAULT_NAME.to_string());
            }
            "profile" | "profiles" => self.profiles = split_list(value),
            "extralocations" | "location" => self.extra_locations = split_list(value),
            "offline" => self.offline = parse_flag(value),
            "debug" => self.debug = parse_flag(value),
            "repositories" => {
                let urls = split_list(value)
                    .iter()
                    .map(|u| parse_repository(u))
                    .collect::<Result<Vec<_>>>()?;
                if !urls.is_empty() {
                    self.repositories = urls;
                }
            }
            _ => debug!("Ignoring unknown option '{}'", key),
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repository_dir(&self) -> PathBuf {
        self.root.join("repository")
    }

    pub fn thin_dir(&self) -> PathBuf {
        self.root.join("thin")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.thin_dir().join("logs")
    }

    pub fn nested_dir(&self) -> PathBuf {
        self.thin_dir().join("nested")
    }
}

/// Flag-style: empty means set; only `false` (any case) means unset.
pub fn parse_flag(value: &str) -> bool {
    !value.trim().eq_ignore_ascii_case("false")
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

fn parse_repository(value: &str) -> Result<Url> {
    // Url::join treats a base without trailing slash as a file.
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    Url::parse(&normalized)
        .map_err(|e| ThinError::Config(format!("Invalid repository URL '{value}': {e}")))
}
