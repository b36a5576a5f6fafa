pub mod console;
pub mod template;
pub mod xml;

pub use console::{Config, Console};
pub use scantemplate_prelude as prelude;
pub use template::{CheckKind, CheckState, ScanTemplate};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Console(#[from] console::Error),
    #[error(transparent)]
    Template(#[from] template::Error),
}
