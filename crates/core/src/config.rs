use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketRole {
    /// Raw uploaded recordings.
    Input,
    /// Derived reports.
    Output,
}

impl std::fmt::Display for BucketRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketRole::Input => write!(f, "input"),
            BucketRole::Output => write!(f, "output"),
        }
    }
}

impl std::str::FromStr for BucketRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "input" => Ok(BucketRole::Input),
            "output" => Ok(BucketRole::Output),
            _ => anyhow::bail!("unknown bucket role: {s}"),
        }
    }
}

/// Bucket names by role, plus the roles `create_prefix` writes placeholders into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub input: Option<String>,
    pub output: Option<String>,
    #[serde(default = "default_mirror")]
    pub mirror: Vec<BucketRole>,
}

fn default_mirror() -> Vec<BucketRole> {
    vec![BucketRole::Input]
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            mirror: default_mirror(),
        }
    }
}

impl BucketConfig {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            output: Some(output.into()),
            mirror: default_mirror(),
        }
    }

    pub fn with_mirror(mut self, roles: Vec<BucketRole>) -> Self {
        self.mirror = roles;
        self
    }

    /// Resolve a role to its bucket name. Blank names count as unset.
    pub fn resolve(&self, role: BucketRole) -> Result<&str, StorageError> {
        let name = match role {
            BucketRole::Input => self.input.as_deref(),
            BucketRole::Output => self.output.as_deref(),
        };
        name.map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(StorageError::ConfigMissing(role))
    }

    /// Every mirrored bucket, deduplicated, in configuration order.
    pub fn mirrored(&self) -> Result<Vec<&str>, StorageError> {
        let mut buckets: Vec<&str> = Vec::with_capacity(self.mirror.len());
        for role in &self.mirror {
            let name = self.resolve(*role)?;
            if !buckets.contains(&name) {
                buckets.push(name);
            }
        }
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bucket_is_missing() {
        let config = BucketConfig {
            input: Some("  ".into()),
            output: Some("reports".into()),
            mirror: default_mirror(),
        };
        assert!(matches!(
            config.resolve(BucketRole::Input),
            Err(StorageError::ConfigMissing(BucketRole::Input))
        ));
        assert_eq!(config.resolve(BucketRole::Output).unwrap(), "reports");
    }

    #[test]
    fn mirror_defaults_to_input_and_dedups() {
        let config: BucketConfig =
            serde_json::from_str(r#"{"input":"rec","output":"rec"}"#).unwrap();
        assert_eq!(config.mirror, vec![BucketRole::Input]);

        let both = config.with_mirror(vec![BucketRole::Input, BucketRole::Output]);
        assert_eq!(both.mirrored().unwrap(), vec!["rec"]);
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Output".parse::<BucketRole>().unwrap(), BucketRole::Output);
        assert!("reports".parse::<BucketRole>().is_err());
    }
}
