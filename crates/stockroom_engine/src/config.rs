use serde::Deserialize;

use stockroom_base::{FilePath, PalHandle, StockroomResult};

/// Configuration for the inventory service.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Host address the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path of the backing inventory file, relative to the working
    /// directory.
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_file() -> String {
    "data/inventory.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_file: default_data_file(),
        }
    }
}

/// Load the configuration from a TOML file.
///
/// A missing file is not an error: the service runs with defaults. A file
/// that exists but does not parse is reported as an error.
pub fn load_config(pal: &PalHandle, path: &FilePath) -> StockroomResult<Config> {
    if !pal.file_exists(path)? {
        return Ok(Config::default());
    }
    let content = pal.read_file_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| stockroom_base::err!("Failed to parse config {}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_base::MockPal;

    #[test]
    fn test_defaults_when_file_missing() {
        let pal = PalHandle::new(MockPal::new());
        let config = load_config(&pal, &FilePath::from("stockroom.toml")).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.data_file, "data/inventory.json");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let mock = MockPal::new();
        mock.add_file(
            FilePath::from("stockroom.toml"),
            b"port = 8080".to_vec(),
        );
        let pal = PalHandle::new(mock);

        let config = load_config(&pal, &FilePath::from("stockroom.toml")).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.data_file, "data/inventory.json");
    }

    #[test]
    fn test_full_config() {
        let mock = MockPal::new();
        mock.add_file(
            FilePath::from("stockroom.toml"),
            b"host = \"0.0.0.0\"\nport = 9000\ndata_file = \"inv/products.json\"\n".to_vec(),
        );
        let pal = PalHandle::new(mock);

        let config = load_config(&pal, &FilePath::from("stockroom.toml")).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_file, "inv/products.json");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("stockroom.toml"), b"port = {".to_vec());
        let pal = PalHandle::new(mock);

        assert!(load_config(&pal, &FilePath::from("stockroom.toml")).is_err());
    }
}
