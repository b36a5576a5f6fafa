use crate::Error;
use scantemplate_engine::Console;
use std::io::Write;

#[derive(clap::Parser, Debug, Default)]
pub struct Action {}

impl Action {
    pub(crate) async fn execute<W: Write>(
        self,
        console: &Console,
        output: &mut W,
    ) -> Result<(), Error> {
        for id in console.list_templates().await? {
            writeln!(output, "{id}")?;
        }
        Ok(())
    }
}
