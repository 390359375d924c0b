use serde::Deserialize;

const ENV_PREFIX: &str = "REKOGNITION";
const DEFAULT_REGION: &str = "us-east-1";

/// Settings read from `REKOGNITION_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Face collection to index into (`REKOGNITION_COLLECTION_ID`).
    /// Empty when unset; the collection is provisioned out of band.
    pub collection_id: String,
    /// Region of the Rekognition endpoint (`REKOGNITION_REGION`).
    pub region: String,
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit set of variables instead of the process environment.
    #[cfg(test)]
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_environment(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("collection_id", "")?
            .set_default("region", DEFAULT_REGION)?
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.collection_id, "");
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn test_reads_prefixed_variables() {
        let config = Config::from_vars([
            ("REKOGNITION_COLLECTION_ID", "employees"),
            ("REKOGNITION_REGION", "eu-west-1"),
            ("COLLECTION_ID", "ignored"),
        ])
        .unwrap();
        assert_eq!(config.collection_id, "employees");
        assert_eq!(config.region, "eu-west-1");
    }

    #[test]
    fn test_each_load_sees_current_values() {
        let first = Config::from_vars([("REKOGNITION_COLLECTION_ID", "before")]).unwrap();
        let second = Config::from_vars([("REKOGNITION_COLLECTION_ID", "after")]).unwrap();
        assert_eq!(first.collection_id, "before");
        assert_eq!(second.collection_id, "after");
    }
}
