use std::path::PathBuf;

/// Startup settings, read from `INNKEEP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub wal_file: String,
    /// Compact on startup once this many WAL entries were replayed.
    pub compact_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            wal_file: "innkeep.wal".into(),
            compact_threshold: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparsable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let data_dir = lookup("INNKEEP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let wal_file = lookup("INNKEEP_WAL_FILE")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.wal_file);
        let compact_threshold = lookup("INNKEEP_COMPACT_THRESHOLD")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.compact_threshold);
        Self {
            data_dir,
            wal_file,
            compact_threshold,
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(&self.wal_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.wal_path(), PathBuf::from("./data/innkeep.wal"));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("INNKEEP_DATA_DIR", "/var/lib/innkeep"),
            ("INNKEEP_WAL_FILE", "hotel.wal"),
            ("INNKEEP_COMPACT_THRESHOLD", "50"),
        ]));
        assert_eq!(config.wal_path(), PathBuf::from("/var/lib/innkeep/hotel.wal"));
        assert_eq!(config.compact_threshold, 50);
    }

    #[test]
    fn bad_threshold_falls_back() {
        let config = Config::from_lookup(lookup(&[("INNKEEP_COMPACT_THRESHOLD", "lots")]));
        assert_eq!(config.compact_threshold, 1000);
    }
}
