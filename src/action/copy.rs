use crate::Error;
use scantemplate_engine::{Console, ScanTemplate};
use std::io::Write;

#[derive(clap::Parser, Debug)]
pub struct Action {
    /// Identifier of the template to copy.
    pub id: String,
    /// Title of the copy, defaults to the original title followed by "Copy".
    #[arg(long)]
    pub name: Option<String>,
}

impl Action {
    pub(crate) async fn execute<W: Write>(
        self,
        console: &Console,
        output: &mut W,
    ) -> Result<(), Error> {
        let mut template = ScanTemplate::copy(console, &self.id).await?;
        if let Some(name) = self.name {
            template.set_name(name);
        }
        let id = template.save(console).await?;
        tracing::info!("scan template {} copied to {}", self.id, id);
        writeln!(output, "{id}")?;
        Ok(())
    }
}
