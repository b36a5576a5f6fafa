use scantemplate_engine::{console, template};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to load configuration: {0}")]
    Configuration(#[from] config::ConfigError),
    #[error(transparent)]
    Console(#[from] console::Error),
    #[error(transparent)]
    Template(#[from] template::Error),
    #[error(transparent)]
    Engine(#[from] scantemplate_engine::Error),
    #[error("unable to write output: {0}")]
    Output(#[from] std::io::Error),
}
