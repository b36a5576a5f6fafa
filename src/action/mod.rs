pub mod copy;
pub mod delete;
pub mod edit;
pub mod export;
pub mod list;
pub mod show;

use crate::Error;
use scantemplate_engine::Console;
use std::io::Write;

#[derive(clap::Subcommand)]
pub enum Action {
    /// Lists the ids of the scan templates known by the console
    List(list::Action),
    /// Prints the settings of a scan template
    Show(show::Action),
    /// Prints the xml configuration of a scan template
    Export(export::Action),
    /// Copies a scan template and saves it as a new one
    Copy(copy::Action),
    /// Changes the settings of a scan template
    Edit(edit::Action),
    /// Deletes a scan template from the console
    Delete(delete::Action),
}

impl Action {
    pub async fn execute<W: Write>(self, console: &Console, output: &mut W) -> Result<(), Error> {
        match self {
            Self::List(inner) => inner.execute(console, output).await,
            Self::Show(inner) => inner.execute(console, output).await,
            Self::Export(inner) => inner.execute(console, output).await,
            Self::Copy(inner) => inner.execute(console, output).await,
            Self::Edit(inner) => inner.execute(console, output).await,
            Self::Delete(inner) => inner.execute(console).await,
        }
    }
}
