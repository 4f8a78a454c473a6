use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use medisync_storage::store::ObjectStore;
use medisync_storage::store::local::LocalStore;
use medisync_storage::store::s3::S3Store;
use medisync_storage::{BucketConfig, StorageLifecycleManager};

const CONFIG_FILE: &str = "medisync.toml";
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub buckets: BucketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreConfig {
    #[serde(rename = "local")]
    Local { path: String },
    #[serde(rename = "s3")]
    S3 {
        region: String,
        endpoint: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
        session_token: Option<String>,
    },
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::S3 {
                region: DEFAULT_REGION.to_string(),
                endpoint: None,
                access_key: None,
                secret_key: None,
                session_token: None,
            },
            buckets: BucketConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medisync")
            .join(CONFIG_FILE)
    }

    /// Read the config file, then apply environment overrides.
    ///
    /// Without an explicit path a missing file is not an error: the
    /// configuration then comes from the environment alone.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);
        let mut config = if explicit.is_some() || path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("config not found at {}", path.display()))?;
            Self::parse(&content)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config")
    }

    pub fn save(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(path)
    }

    /// Override settings from environment variables; blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |names: &[&str]| {
            names
                .iter()
                .filter_map(|&name| lookup(name))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        if let Some(input) = var(&["INPUT_BUCKET", "S3_INPUT_BUCKET_NAME"]) {
            self.buckets.input = Some(input);
        }
        if let Some(output) = var(&["OUTPUT_BUCKET", "S3_OUTPUT_BUCKET_NAME"]) {
            self.buckets.output = Some(output);
        }

        if let StoreConfig::S3 {
            region,
            endpoint,
            access_key,
            secret_key,
            session_token,
        } = &mut self.store
        {
            if let Some(value) = var(&["AWS_REGION"]) {
                *region = value;
            }
            if let Some(value) = var(&["S3_ENDPOINT"]) {
                *endpoint = Some(value);
            }
            if let Some(value) = var(&["AWS_ACCESS_KEY_ID"]) {
                *access_key = Some(value);
            }
            if let Some(value) = var(&["AWS_SECRET_ACCESS_KEY"]) {
                *secret_key = Some(value);
            }
            if let Some(value) = var(&["AWS_SESSION_TOKEN"]) {
                *session_token = Some(value);
            }
        }
    }

    pub async fn open_store(&self) -> Result<Arc<dyn ObjectStore>> {
        match &self.store {
            StoreConfig::Local { path } => Ok(Arc::new(LocalStore::new(path)?)),
            StoreConfig::S3 {
                region,
                endpoint,
                access_key,
                secret_key,
                session_token,
            } => {
                let store = S3Store::new(
                    region,
                    endpoint.as_deref(),
                    access_key.as_deref(),
                    secret_key.as_deref(),
                    session_token.as_deref(),
                )
                .await?;
                Ok(Arc::new(store))
            }
        }
    }

    pub async fn open_manager(&self) -> Result<StorageLifecycleManager> {
        Ok(StorageLifecycleManager::new(
            self.open_store().await?,
            self.buckets.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use medisync_storage::BucketRole;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn parses_local_store() {
        let config = AppConfig::parse(
            r#"
            [store]
            type = "local"
            path = "/var/lib/medisync"

            [buckets]
            input = "recordings"
            output = "reports"
            mirror = ["input", "output"]
            "#,
        )
        .unwrap();
        assert!(matches!(config.store, StoreConfig::Local { .. }));
        assert_eq!(config.buckets.resolve(BucketRole::Input).unwrap(), "recordings");
        assert_eq!(
            config.buckets.mirror,
            vec![BucketRole::Input, BucketRole::Output]
        );
    }

    #[test]
    fn env_overrides_buckets_and_credentials() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("S3_INPUT_BUCKET_NAME", "audio-source"),
            ("OUTPUT_BUCKET", "reports"),
            ("AWS_REGION", "ap-south-1"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SESSION_TOKEN", "  "),
        ]));

        assert_eq!(config.buckets.input.as_deref(), Some("audio-source"));
        assert_eq!(config.buckets.output.as_deref(), Some("reports"));
        match config.store {
            StoreConfig::S3 {
                region,
                access_key,
                session_token,
                ..
            } => {
                assert_eq!(region, "ap-south-1");
                assert_eq!(access_key.as_deref(), Some("AKIA"));
                assert_eq!(session_token, None);
            }
            StoreConfig::Local { .. } => panic!("expected s3 store"),
        }
    }

    #[test]
    fn primary_env_name_wins_over_alias() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("INPUT_BUCKET", "primary"),
            ("S3_INPUT_BUCKET_NAME", "alias"),
        ]));
        assert_eq!(config.buckets.input.as_deref(), Some("primary"));
    }

    #[tokio::test]
    async fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medisync.toml");
        let config = AppConfig {
            store: StoreConfig::Local {
                path: dir.path().join("data").display().to_string(),
            },
            buckets: BucketConfig::new("recordings", "reports"),
        };
        config.save(Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let reloaded = AppConfig::parse(&content).unwrap();
        assert_eq!(reloaded.buckets, config.buckets);
        assert!(reloaded.open_manager().await.is_ok());
    }
}
