use crate::Error;
use scantemplate_engine::{Console, ScanTemplate};
use std::io::Write;

#[derive(clap::Parser, Debug, Default)]
pub struct Action {
    /// Identifier of the template, the blank template is exported when missing.
    pub id: Option<String>,
}

impl Action {
    pub(crate) async fn execute<W: Write>(
        self,
        console: &Console,
        output: &mut W,
    ) -> Result<(), Error> {
        let template = ScanTemplate::load(console, self.id.as_deref()).await?;
        writeln!(output, "{}", template.to_xml()?)?;
        Ok(())
    }
}
