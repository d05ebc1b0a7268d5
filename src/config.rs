use chrono::NaiveTime;
use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CSV file holding the event catalog
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// File holding the fitted model snapshot
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Number of events recommended per user
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Whether the daily catalog reset runs
    #[serde(default = "default_reset_enabled")]
    pub reset_enabled: bool,

    /// Local time of the daily catalog reset, `HH:MM:SS` or `HH:MM`
    #[serde(default = "default_reset_time")]
    pub reset_time: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_catalog_path() -> String {
    "eventlist.csv".to_string()
}

fn default_model_path() -> String {
    "festival_recommender.bin".to_string()
}

fn default_top_n() -> usize {
    crate::services::DEFAULT_TOP_N
}

fn default_reset_enabled() -> bool {
    true
}

fn default_reset_time() -> String {
    "22:30:00".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.top_n == 0 {
            anyhow::bail!("TOP_N must be at least 1");
        }
        self.reset_at()?;
        Ok(())
    }

    /// Parsed daily reset time
    pub fn reset_at(&self) -> anyhow::Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.reset_time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&self.reset_time, "%H:%M"))
            .map_err(|e| anyhow::anyhow!("Invalid RESET_TIME {:?}: {}", self.reset_time, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.catalog_path, "eventlist.csv");
        assert_eq!(config.model_path, "festival_recommender.bin");
        assert_eq!(config.top_n, 5);
        assert!(config.reset_enabled);
        assert_eq!(config.reset_at().unwrap(), NaiveTime::from_hms_opt(22, 30, 0).unwrap());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("PORT", "9000"),
            ("TOP_N", "3"),
            ("RESET_ENABLED", "false"),
            ("RESET_TIME", "00:00"),
            ("MODEL_PATH", "/tmp/model.bin"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.top_n, 3);
        assert!(!config.reset_enabled);
        assert_eq!(config.reset_at().unwrap(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(config.model_path, "/tmp/model.bin");
    }

    #[test]
    fn test_zero_top_n_is_rejected() {
        assert!(Config::from_vars(vars(&[("TOP_N", "0")])).is_err());
    }

    #[test]
    fn test_bad_reset_time_is_rejected() {
        assert!(Config::from_vars(vars(&[("RESET_TIME", "25:99")])).is_err());
    }
}
