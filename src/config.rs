#[derive(Clone, Debug, serde::Deserialize)]
pub struct Configuration {
    pub console: scantemplate_engine::Config,
}

impl Configuration {
    /// Reads the toml file when it exists, then overrides it with the environment (`CONSOLE__URL`).
    pub fn from_path(path: &str) -> Result<Self, config::ConfigError> {
        Self::from_builder(
            config::Config::builder()
                .add_source(config::File::with_name(path).required(false))
                .add_source(config::Environment::default().separator("__")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::Configuration;
    use config::{Config, File, FileFormat};

    fn parse(content: &str) -> Result<Configuration, config::ConfigError> {
        crate::try_init_logs();
        Configuration::from_builder(
            Config::builder().add_source(File::from_str(content, FileFormat::Toml)),
        )
    }

    #[test]
    fn should_read_minimal_file() {
        let config = parse(
            r#"
[console]
url = "https://console.example.com:3780"
"#,
        )
        .unwrap();
        assert_eq!(config.console.url, "https://console.example.com:3780");
        assert_eq!(config.console.timeout, 30_000);
        assert!(!config.console.accept_invalid_cert);
        assert!(config.console.headers.is_empty());
    }

    #[test]
    fn should_read_complete_file() {
        let config = parse(
            r#"
[console]
url = "https://console.example.com:3780"
timeout = 5000
accept_invalid_cert = true

[console.headers]
nexposeCCSessionID = "session-token"

[console.params]
lang = "en"
"#,
        )
        .unwrap();
        assert_eq!(config.console.timeout, 5000);
        assert!(config.console.accept_invalid_cert);
        assert_eq!(config.console.params.get("lang").map(String::as_str), Some("en"));
        assert_eq!(config.console.headers.len(), 1);
        assert!(config.console.build().is_ok());
    }

    #[test]
    fn should_fail_without_console() {
        assert!(parse("").is_err());
    }
}
