//! `schematic.toml`: named connection profiles

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How to reach one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectionProfile {
    Sqlite {
        path: PathBuf,
        /// Schema name to database file, attached after opening
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        attach: IndexMap<String, PathBuf>,
    },
    Sqlserver {
        connection_string: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_schema: Option<String>,
    },
    /// A snapshot file written by `schematic snapshot`
    Snapshot { path: PathBuf },
}

impl ConnectionProfile {
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionProfile::Sqlite { .. } => "sqlite",
            ConnectionProfile::Sqlserver { .. } => "sqlserver",
            ConnectionProfile::Snapshot { .. } => "snapshot",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_connection: Option<String>,
    #[serde(default)]
    pub connections: IndexMap<String, ConnectionProfile>,
}

impl SchematicConfig {
    /// Starting point written by `schematic init`
    pub fn template() -> Self {
        let mut connections = IndexMap::new();
        connections.insert(
            "local".to_string(),
            ConnectionProfile::Sqlite {
                path: PathBuf::from("app.db"),
                attach: IndexMap::new(),
            },
        );
        connections.insert(
            "warehouse".to_string(),
            ConnectionProfile::Sqlserver {
                connection_string:
                    "server=tcp:localhost,1433;database=master;user id=sa;password=change-me;TrustServerCertificate=true"
                        .to_string(),
                default_schema: Some("dbo".to_string()),
            },
        );
        Self {
            default_connection: Some("local".to_string()),
            connections,
        }
    }

    /// The named profile, or the default one when `name` is `None`
    pub fn profile(&self, name: Option<&str>) -> anyhow::Result<(&str, &ConnectionProfile)> {
        let name = match name.or(self.default_connection.as_deref()) {
            Some(name) => name,
            None => anyhow::bail!("no connection given and no default_connection configured"),
        };
        match self.connections.get_key_value(name) {
            Some((key, profile)) => Ok((key.as_str(), profile)),
            None => anyhow::bail!(
                "unknown connection '{}' (configured: {})",
                name,
                self.connections.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("schematic.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SchematicConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SchematicConfig = toml::from_str(&contents)?;
    tracing::debug!(path = %path.display(), connections = config.connections.len(), "loaded config");
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SchematicConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profiles() {
        let config: SchematicConfig = toml::from_str(
            r#"
default_connection = "app"

[connections.app]
kind = "sqlite"
path = "data/app.db"

[connections.app.attach]
audit = "data/audit.db"

[connections.erp]
kind = "sqlserver"
connection_string = "server=tcp:db,1433;database=erp"

[connections.frozen]
kind = "snapshot"
path = "erp.json"
"#,
        )
        .unwrap();

        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "app");
        match profile {
            ConnectionProfile::Sqlite { path, attach } => {
                assert_eq!(path, &PathBuf::from("data/app.db"));
                assert_eq!(attach.get("audit"), Some(&PathBuf::from("data/audit.db")));
            }
            other => panic!("unexpected profile {:?}", other),
        }

        let (_, erp) = config.profile(Some("erp")).unwrap();
        assert_eq!(erp.kind(), "sqlserver");
        assert!(matches!(erp, ConnectionProfile::Sqlserver { default_schema: None, .. }));
        assert_eq!(config.profile(Some("frozen")).unwrap().1.kind(), "snapshot");
    }

    #[test]
    fn test_unknown_and_missing_profiles() {
        let config = SchematicConfig::template();
        let err = config.profile(Some("nope")).unwrap_err().to_string();
        assert!(err.contains("local, warehouse"), "{}", err);

        let empty = SchematicConfig::default();
        assert!(empty.profile(None).is_err());
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schematic.toml");

        write_config(&path, &SchematicConfig::template(), false).unwrap();
        assert!(write_config(&path, &SchematicConfig::template(), false).is_err());
        write_config(&path, &SchematicConfig::default(), true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, SchematicConfig::default());
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_template_roundtrips() {
        let text = toml::to_string_pretty(&SchematicConfig::template()).unwrap();
        let parsed: SchematicConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, SchematicConfig::template());
    }
}
