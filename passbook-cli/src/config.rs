use anyhow::{Context, Result};
use passbook_ingest::{DialectRegistry, DialectSpec};
use passbook_ledger::DialectSelection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::state::ensure_passbook_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assemble: AssembleSection,
    #[serde(default)]
    pub output: OutputSection,
    /// Extra dialects, registered after the built-in ones. An entry reusing a
    /// built-in id replaces it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dialects: Vec<DialectSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembleSection {
    /// `auto` or a dialect id.
    pub default_dialect: String,
}

impl Default for AssembleSection {
    fn default() -> Self {
        Self {
            default_dialect: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub format: OutputFormat,
    /// Printed before amounts in text output.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_currency_symbol() -> String {
    "R".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl Config {
    pub fn default_selection(&self) -> DialectSelection {
        self.assemble.default_dialect.parse().unwrap_or_default()
    }

    /// Built-in dialects followed by the configured ones.
    pub fn registry(&self) -> Result<DialectRegistry> {
        let mut registry = DialectRegistry::builtin().context("compile built-in dialects")?;
        for spec in &self.dialects {
            registry
                .register(spec.clone())
                .with_context(|| format!("dialect {:?} in config.toml", spec.id))?;
        }
        Ok(registry)
    }
}

/// `~/.passbook/config.toml`, creating `~/.passbook` on the way.
pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_passbook_home()?.join("config.toml"))
}

/// Reads the user's config, or the defaults (auto dialect, text output, `R`)
/// when no config.toml has been written yet.
pub fn load_config() -> Result<Config> {
    read_config(&config_path()?)
}

fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    debug!(
        "Loaded {} with {} extra dialect(s)",
        path.display(),
        cfg.dialects.len()
    );
    Ok(cfg)
}

fn write_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))
}

/// `passbook config init`: writes the default config unless the user
/// already has one, which is never overwritten.
pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    write_config(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_ingest::{SourceLayout, builtin_specs};

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.default_selection(), DialectSelection::Auto);
        assert_eq!(cfg.output.currency_symbol, "R");
    }

    #[test]
    fn test_default_round_trips() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn test_configured_dialects_extend_registry() {
        let s = r#"
[assemble]
default_dialect = "my-bank"

[output]
format = "json"

[[dialects]]
id = "my-bank"
description = "Date, description, debit, credit"
columns = { kind = "debit-credit" }
source = { kind = "text", line_pattern = '^(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<desc>.+?)\s+(?P<a1>[\d,.]*)\s+(?P<a2>[\d,.]*)$' }

[dialects.labels]
opening_balance = ["Balance brought forward"]
"#;
        let cfg: Config = toml::from_str(s).unwrap();
        assert_eq!(cfg.output.format, OutputFormat::Json);
        assert_eq!(
            cfg.default_selection(),
            DialectSelection::Named("my-bank".to_string())
        );
        assert_eq!(cfg.dialects[0].date_formats, vec!["%d/%m/%Y".to_string()]);
        assert_eq!(
            cfg.dialects[0].labels.opening_balance,
            vec!["Balance brought forward".to_string()]
        );
        // Unlisted label fields keep their defaults.
        assert!(!cfg.dialects[0].labels.total_debits.is_empty());

        let registry = cfg.registry().unwrap();
        assert_eq!(registry.len(), builtin_specs().len() + 1);
        assert_eq!(registry.ids().last(), Some(&"my-bank"));
    }

    #[test]
    fn test_configured_dialect_replaces_builtin() {
        let mut spec = builtin_specs().remove(0);
        spec.description = "patched".to_string();
        let cfg = Config {
            dialects: vec![spec.clone()],
            ..Config::default()
        };
        let registry = cfg.registry().unwrap();
        assert_eq!(registry.len(), builtin_specs().len());
        assert_eq!(registry.get(&spec.id).unwrap().spec().description, "patched");
    }

    #[test]
    fn test_invalid_dialect_is_reported() {
        let cfg = Config {
            dialects: vec![DialectSpec {
                source: SourceLayout::Text {
                    line_pattern: "(?P<date>".to_string(),
                },
                ..builtin_specs().remove(0)
            }],
            ..Config::default()
        };
        let err = cfg.registry().unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!(
            "passbook-missing-{}.toml",
            std::process::id()
        ));
        assert_eq!(read_config(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_written_config_is_read_back() {
        let path = std::env::temp_dir().join(format!(
            "passbook-config-{}.toml",
            std::process::id()
        ));
        let cfg = Config {
            assemble: AssembleSection {
                default_dialect: "variable-columns".to_string(),
            },
            output: OutputSection {
                format: OutputFormat::Json,
                currency_symbol: "$".to_string(),
            },
            dialects: vec![],
        };
        write_config(&path, &cfg).unwrap();
        let back = read_config(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(
            back.default_selection(),
            DialectSelection::Named("variable-columns".to_string())
        );
    }

    #[test]
    fn test_broken_config_names_the_file() {
        let path = std::env::temp_dir().join(format!(
            "passbook-broken-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "[output]\nformat = \"yaml\"\n").unwrap();
        let err = read_config(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(format!("{err:#}").contains("passbook-broken-"));
    }
}
