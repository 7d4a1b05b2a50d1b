use backup_pipeline::archive::DEFAULT_TIMEOUT;
use backup_pipeline::orchestrator::{
    DEFAULT_OBJECT_EXTENSION, DEFAULT_OBJECT_PREFIX, DEFAULT_STAGING_PATH,
};
use backup_pipeline::PipelineSettings;
use std::path::PathBuf;
use std::time::Duration;

/// 02:00 UTC every day. Six fields, the first is seconds.
pub const DEFAULT_SCHEDULE: &str = "0 0 2 * * *";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveConfig {
    S3 {
        bucket: String,
        endpoint: Option<String>,
        region: Option<String>,
    },
    Local {
        dir: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub schedule: String,
    pub staging_path: PathBuf,
    pub object_prefix: String,
    pub object_extension: String,
    /// Required by `serve` and `backup`; catalog commands run without it
    pub archive: Option<ArchiveConfig>,
    pub storage_timeout: Duration,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let archive = match (get("BACKUP_BUCKET"), get("BACKUP_ARCHIVE_DIR")) {
            (Some(bucket), _) => Some(ArchiveConfig::S3 {
                bucket,
                endpoint: get("BACKUP_ENDPOINT_URL"),
                region: get("BACKUP_REGION"),
            }),
            (None, Some(dir)) => Some(ArchiveConfig::Local {
                dir: PathBuf::from(dir),
            }),
            (None, None) => None,
        };

        let storage_timeout = match get("STORAGE_TIMEOUT_SECS") {
            Some(v) => {
                let secs: u64 = v
                    .parse()
                    .map_err(|_| anyhow::anyhow!("STORAGE_TIMEOUT_SECS is not a number: {v}"))?;
                if secs == 0 {
                    anyhow::bail!("STORAGE_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            db_path: PathBuf::from(get("DB_PATH").unwrap_or_else(|| "entities.db".into())),
            schedule: get("BACKUP_SCHEDULE").unwrap_or_else(|| DEFAULT_SCHEDULE.into()),
            staging_path: PathBuf::from(
                get("BACKUP_STAGING_PATH").unwrap_or_else(|| DEFAULT_STAGING_PATH.into()),
            ),
            object_prefix: get("BACKUP_OBJECT_PREFIX")
                .unwrap_or_else(|| DEFAULT_OBJECT_PREFIX.into()),
            object_extension: get("BACKUP_OBJECT_EXTENSION")
                .unwrap_or_else(|| DEFAULT_OBJECT_EXTENSION.into()),
            archive,
            storage_timeout,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
        })
    }

    pub fn archive(&self) -> anyhow::Result<&ArchiveConfig> {
        self.archive.as_ref().ok_or_else(|| {
            anyhow::anyhow!("no remote archive configured: set BACKUP_BUCKET or BACKUP_ARCHIVE_DIR")
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            staging_path: self.staging_path.clone(),
            object_prefix: self.object_prefix.clone(),
            object_extension: self.object_extension.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_local_archive() {
        let config = load(&[("BACKUP_ARCHIVE_DIR", "/srv/archive")]).unwrap();

        assert_eq!(config.db_path, PathBuf::from("entities.db"));
        assert_eq!(config.schedule, DEFAULT_SCHEDULE);
        assert_eq!(config.staging_path, PathBuf::from("vacuum.sqlite"));
        assert_eq!(config.storage_timeout, Duration::from_secs(60));
        assert_eq!(
            config.archive().unwrap(),
            &ArchiveConfig::Local {
                dir: PathBuf::from("/srv/archive")
            }
        );
        assert_eq!(
            config.pipeline_settings().object_name(chrono::DateTime::from_timestamp(42, 0).unwrap()),
            "entities-backup42.sqlite"
        );
    }

    #[test]
    fn test_bucket_wins_over_local_dir() {
        let config = load(&[
            ("BACKUP_BUCKET", "entities"),
            ("BACKUP_ARCHIVE_DIR", "/srv/archive"),
            ("BACKUP_ENDPOINT_URL", "http://localhost:9000"),
        ])
        .unwrap();

        assert_eq!(
            config.archive().unwrap(),
            &ArchiveConfig::S3 {
                bucket: "entities".into(),
                endpoint: Some("http://localhost:9000".into()),
                region: None,
            }
        );
    }

    #[test]
    fn test_missing_archive_is_reported_on_use() {
        let config = load(&[]).unwrap();
        assert!(config.archive.is_none());
        assert!(config.archive().is_err());

        let config = load(&[("BACKUP_BUCKET", "  ")]).unwrap();
        assert!(config.archive().is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(load(&[("BACKUP_ARCHIVE_DIR", "a"), ("STORAGE_TIMEOUT_SECS", "soon")]).is_err());
        assert!(load(&[("BACKUP_ARCHIVE_DIR", "a"), ("STORAGE_TIMEOUT_SECS", "0")]).is_err());

        let config = load(&[("BACKUP_ARCHIVE_DIR", "a"), ("STORAGE_TIMEOUT_SECS", "15")]).unwrap();
        assert_eq!(config.storage_timeout, Duration::from_secs(15));
    }
}
