//! Configuration discovery and effective settings resolution.
//!
//! basefix reads `basefix.toml|yaml|yml` from the workspace directory (or the
//! closest ancestor) and merges it with CLI flags into an `Effective` config.
//! Defaults:
//! - `capability`: `IBqlTable`
//! - `base_type`: `PX.Data.PXBqlTable`
//! - `platform_reference`: `PX.Data`
//! - `report`: current directory, `report_prefix`: `basefix`
//! - `apply`: false, `output`: `human`
//! - `[resolver]`: no extra interfaces/classes, `transitive = false`
//!
//! Overrides precedence: CLI > config file > defaults.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CAPABILITY: &str = "IBqlTable";
pub const DEFAULT_BASE_TYPE: &str = "PX.Data.PXBqlTable";
pub const DEFAULT_PLATFORM_REFERENCE: &str = "PX.Data";
pub const DEFAULT_REPORT_PREFIX: &str = "basefix";

const CONFIG_NAMES: [&str; 3] = ["basefix.toml", "basefix.yaml", "basefix.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Resolver hints under `[resolver]`.
pub struct ResolverCfg {
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    pub transitive: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `basefix.toml|yaml`.
pub struct BasefixConfig {
    pub capability: Option<String>,
    pub base_type: Option<String>,
    pub platform_reference: Option<String>,
    pub report: Option<String>,
    pub report_prefix: Option<String>,
    pub apply: Option<bool>,
    pub output: Option<String>,
    #[serde(default)]
    pub resolver: Option<ResolverCfg>,
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub workspace: Option<String>,
    pub report: Option<String>,
    pub apply: Option<bool>,
    pub capability: Option<String>,
    pub base_type: Option<String>,
    pub platform_reference: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by the run after applying precedence.
pub struct Effective {
    /// Directory the config was looked up from.
    pub config_root: PathBuf,
    /// Config file that was loaded, if any.
    pub config_file: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    pub capability: String,
    pub base_type: String,
    pub platform_reference: String,
    pub report: String,
    pub report_prefix: String,
    pub apply: bool,
    pub output: String,
    pub resolver_interfaces: BTreeSet<String>,
    pub resolver_classes: BTreeSet<String>,
    pub resolver_transitive: bool,
}

/// Walk upward from `start` to the directory holding a basefix config or a
/// `.git` directory; `start` itself when neither is found.
pub fn detect_config_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Path of the config file in `root`, if present.
pub fn config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_NAMES
        .iter()
        .map(|n| root.join(n))
        .find(|p| p.is_file())
}

/// Load `BasefixConfig` from `root`. A malformed file is reported and ignored.
pub fn load_config(root: &Path) -> Option<BasefixConfig> {
    let path = config_file(root)?;
    let s = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
            return None;
        }
    };
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    let parsed = if is_toml {
        toml::from_str::<BasefixConfig>(&s).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str::<BasefixConfig>(&s).map_err(|e| e.to_string())
    };
    match parsed {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Directory to start config discovery from for a workspace argument.
fn discovery_start(workspace: Option<&str>) -> PathBuf {
    let Some(ws) = workspace else {
        return PathBuf::from(".");
    };
    let p = PathBuf::from(ws);
    if p.is_dir() {
        return p;
    }
    match p.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &CliOverrides) -> Effective {
    let start = discovery_start(cli.workspace.as_deref());
    let config_root = detect_config_root(&start);
    let config_file = config_file(&config_root);
    let cfg = load_config(&config_root).unwrap_or_default();
    let resolver = cfg.resolver.unwrap_or_default();

    let capability = cli
        .capability
        .clone()
        .or(cfg.capability)
        .unwrap_or_else(|| DEFAULT_CAPABILITY.to_string());
    let base_type = cli
        .base_type
        .clone()
        .or(cfg.base_type)
        .unwrap_or_else(|| DEFAULT_BASE_TYPE.to_string());
    let platform_reference = cli
        .platform_reference
        .clone()
        .or(cfg.platform_reference)
        .unwrap_or_else(|| DEFAULT_PLATFORM_REFERENCE.to_string());
    let report = cli
        .report
        .clone()
        .or(cfg.report)
        .unwrap_or_else(|| ".".to_string());
    let report_prefix = cfg
        .report_prefix
        .unwrap_or_else(|| DEFAULT_REPORT_PREFIX.to_string());
    let apply = cli.apply.or(cfg.apply).unwrap_or(false);
    let output = cli
        .output
        .clone()
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    Effective {
        config_root,
        config_file,
        workspace: cli.workspace.as_ref().map(PathBuf::from),
        capability,
        base_type,
        platform_reference,
        report,
        report_prefix,
        apply,
        output,
        resolver_interfaces: resolver.interfaces.into_iter().collect(),
        resolver_classes: resolver.classes.into_iter().collect(),
        resolver_transitive: resolver.transitive.unwrap_or(false),
    }
}
