//! Loading `.floyd/mcp.json` (or its `.floyd/mcp.config.json` variant).

use std::path::Path;

use floyd_core::McpConfigFile;

use crate::error::{ConfigError, ConfigResult};

const PRIMARY_NAME: &str = "mcp.json";
const ALT_NAME: &str = "mcp.config.json";

/// Load the MCP server list for `working_dir`, trying `.floyd/mcp.json`
/// then `.floyd/mcp.config.json`. Returns an empty server list if neither
/// file exists — an MCP config is optional, not required.
pub fn load_mcp_config(working_dir: &Path) -> ConfigResult<McpConfigFile> {
    let floyd_dir = working_dir.join(".floyd");
    for name in [PRIMARY_NAME, ALT_NAME] {
        let path = floyd_dir.join(name);
        if path.exists() {
            let bytes = std::fs::read(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let parsed: McpConfigFile =
                serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
                    path: path.display().to_string(),
                    source,
                })?;
            return Ok(parsed);
        }
    }
    Ok(McpConfigFile {
        version: "1.0".to_string(),
        servers: Vec::new(),
        extra: serde_json::Map::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use floyd_core::Transport;

    #[test]
    fn missing_config_yields_empty_server_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_mcp_config(dir.path()).unwrap();
        assert!(config.servers.is_empty());
    }

    #[test]
    fn loads_primary_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let floyd_dir = dir.path().join(".floyd");
        std::fs::create_dir_all(&floyd_dir).unwrap();
        std::fs::write(
            floyd_dir.join("mcp.json"),
            r#"{"version":"1.0","servers":[
                {"name":"fs","enabled":true,"transport":{"type":"stdio","command":"mcp-fs","args":[]}}
            ]}"#,
        )
        .unwrap();

        let config = load_mcp_config(dir.path()).unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].name, "fs");
        assert!(matches!(config.servers[0].transport, Transport::Stdio { .. }));
    }

    #[test]
    fn falls_back_to_alt_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let floyd_dir = dir.path().join(".floyd");
        std::fs::create_dir_all(&floyd_dir).unwrap();
        std::fs::write(
            floyd_dir.join("mcp.config.json"),
            r#"{"version":"1.0","servers":[]}"#,
        )
        .unwrap();

        let config = load_mcp_config(dir.path()).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn unknown_top_level_field_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let floyd_dir = dir.path().join(".floyd");
        std::fs::create_dir_all(&floyd_dir).unwrap();
        std::fs::write(
            floyd_dir.join("mcp.json"),
            r#"{"version":"1.0","servers":[],"generatedBy":"desktop-app"}"#,
        )
        .unwrap();

        let config = load_mcp_config(dir.path()).unwrap();
        assert_eq!(
            config.extra.get("generatedBy"),
            Some(&serde_json::json!("desktop-app"))
        );
    }
}
