use crate::Error;
use scantemplate_engine::Console;

#[derive(clap::Parser, Debug)]
pub struct Action {
    /// Identifier of the template, built-in templates cannot be deleted.
    pub id: String,
}

impl Action {
    pub(crate) async fn execute(self, console: &Console) -> Result<(), Error> {
        console.delete_template(&self.id).await?;
        tracing::info!("scan template {} deleted", self.id);
        Ok(())
    }
}
