use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Base path layer blobs are referenced under. Defaults to `<data_dir>/images`.
    pub storage_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("wharf.db")
    }

    #[must_use]
    pub fn layer_base_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("images"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            data_dir: PathBuf::from("./data"),
            storage_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 5000);
        assert_eq!(config.db_path(), PathBuf::from("./data/wharf.db"));
        assert_eq!(config.layer_base_path(), PathBuf::from("./data/images"));
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wharf.toml");
        std::fs::write(
            &path,
            "port = 8080\nstorage_path = \"/srv/registry\"\n",
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.layer_base_path(), PathBuf::from("/srv/registry"));
    }

    #[test]
    fn test_load_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wharf.toml");
        std::fs::write(&path, "port = \"not a number\"\n").unwrap();

        assert!(matches!(ServerConfig::load(&path), Err(Error::Config(_))));
        assert!(matches!(
            ServerConfig::load(&temp.path().join("missing.toml")),
            Err(Error::Io(_))
        ));
    }
}
