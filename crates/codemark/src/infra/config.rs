//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".codemark/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub ignore: Ignore,
    #[serde(default)]
    pub header: Header,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "Defaults::default_roots")]
    pub roots: Vec<String>,
    #[serde(default = "Defaults::default_output")]
    pub output: String,
    #[serde(default = "Defaults::default_extensions")]
    pub extensions: Vec<String>,
}

impl Defaults {
    fn default_roots() -> Vec<String> {
        vec!["src".into()]
    }

    fn default_output() -> String {
        "module_code.md".into()
    }

    fn default_extensions() -> Vec<String> {
        vec![".py".into(), ".tsx".into(), ".ts".into()]
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            roots: Self::default_roots(),
            output: Self::default_output(),
            extensions: Self::default_extensions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignore {
    /// Directory names pruned during traversal, matched case-insensitively.
    #[serde(default = "Ignore::default_dirs")]
    pub dirs: Vec<String>,
    /// File globs excluded from discovery. Empty by default.
    #[serde(default)]
    pub globs: Vec<String>,
}

impl Ignore {
    fn default_dirs() -> Vec<String> {
        [
            ".git",
            "__pycache__",
            ".venv",
            "venv",
            ".cache",
            ".bin",
            "node_modules",
            "bin",
            "cache",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

impl Default for Ignore {
    fn default() -> Self {
        Self {
            dirs: Self::default_dirs(),
            globs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Header {
    #[serde(default)]
    template: Option<String>,
}

impl Header {
    fn default_template() -> &'static str {
        "project_header"
    }

    pub fn template(&self) -> String {
        self.template
            .clone()
            .unwrap_or_else(|| Self::default_template().to_owned())
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    output: Option<String>,
    template: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            output: env::var("CODEMARK_OUTPUT").ok(),
            template: env::var("CODEMARK_TEMPLATE").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(output: &str, template: &str) -> Self {
        Self {
            output: Some(output.to_owned()),
            template: Some(template.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace
    /// config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            ignore: merge_ignore(self.ignore, other.ignore),
            header: merge_header(self.header, other.header),
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        roots: if overlay.roots != Defaults::default_roots() {
            overlay.roots
        } else {
            base.roots
        },
        output: if overlay.output != Defaults::default_output() {
            overlay.output
        } else {
            base.output
        },
        extensions: if overlay.extensions != Defaults::default_extensions() {
            overlay.extensions
        } else {
            base.extensions
        },
    }
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut dirs: BTreeSet<String> = base.dirs.into_iter().collect();
    dirs.extend(overlay.dirs);

    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);

    Ignore {
        dirs: dirs.into_iter().collect(),
        globs: globs.into_iter().collect(),
    }
}

fn merge_header(mut base: Header, overlay: Header) -> Header {
    if let Some(template) = overlay.template {
        base.template = Some(template);
    }
    base
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("codemark/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(output) = env.output {
        config.defaults.output = output;
    }
    if let Some(template) = env.template {
        config.header.template = Some(template);
    }
    config
}
