use crate::Error;
use scantemplate_engine::{CheckKind, CheckState, Console, ScanTemplate};
use std::io::Write;

#[derive(clap::Parser, Debug, Default)]
pub struct Action {
    /// Identifier of the template to change.
    pub id: String,
    /// New title of the template.
    #[arg(long)]
    pub name: Option<String>,
    /// New description of the template.
    #[arg(long)]
    pub description: Option<String>,
    /// Correlate reliable checks with regular checks.
    #[arg(long)]
    pub correlate: Option<bool>,
    /// Run checks that could disrupt the scanned assets.
    #[arg(long)]
    pub unsafe_checks: Option<bool>,
    /// Report potential vulnerabilities.
    #[arg(long)]
    pub potential_checks: Option<bool>,
    #[arg(long = "enable-category", value_name = "NAME")]
    pub enable_categories: Vec<String>,
    #[arg(long = "disable-category", value_name = "NAME")]
    pub disable_categories: Vec<String>,
    #[arg(long = "remove-category", value_name = "NAME")]
    pub remove_categories: Vec<String>,
    #[arg(long = "enable-type", value_name = "NAME")]
    pub enable_types: Vec<String>,
    #[arg(long = "disable-type", value_name = "NAME")]
    pub disable_types: Vec<String>,
    #[arg(long = "remove-type", value_name = "NAME")]
    pub remove_types: Vec<String>,
    #[arg(long = "enable-check", value_name = "ID")]
    pub enable_checks: Vec<String>,
    #[arg(long = "disable-check", value_name = "ID")]
    pub disable_checks: Vec<String>,
    #[arg(long = "remove-check", value_name = "ID")]
    pub remove_checks: Vec<String>,
}

impl Action {
    fn changes(&self) -> [(&[String], CheckKind, CheckState); 9] {
        [
            (self.remove_categories.as_slice(), CheckKind::Category, CheckState::Unset),
            (self.disable_categories.as_slice(), CheckKind::Category, CheckState::Disabled),
            (self.enable_categories.as_slice(), CheckKind::Category, CheckState::Enabled),
            (self.remove_types.as_slice(), CheckKind::Type, CheckState::Unset),
            (self.disable_types.as_slice(), CheckKind::Type, CheckState::Disabled),
            (self.enable_types.as_slice(), CheckKind::Type, CheckState::Enabled),
            (self.remove_checks.as_slice(), CheckKind::Check, CheckState::Unset),
            (self.disable_checks.as_slice(), CheckKind::Check, CheckState::Disabled),
            (self.enable_checks.as_slice(), CheckKind::Check, CheckState::Enabled),
        ]
    }

    fn apply(&self, template: &mut ScanTemplate) {
        if let Some(ref name) = self.name {
            template.set_name(name.as_str());
        }
        if let Some(ref description) = self.description {
            template.set_description(description.as_str());
        }
        if let Some(value) = self.correlate {
            template.set_correlate(value);
        }
        if let Some(value) = self.unsafe_checks {
            template.set_unsafe_checks(value);
        }
        if let Some(value) = self.potential_checks {
            template.set_potential_checks(value);
        }
        for (names, kind, state) in self.changes() {
            for name in names {
                template.set_check_state(name, kind, state);
            }
        }
    }

    pub(crate) async fn execute<W: Write>(
        self,
        console: &Console,
        output: &mut W,
    ) -> Result<(), Error> {
        let mut template = ScanTemplate::load(console, Some(self.id.as_str())).await?;
        self.apply(&mut template);
        let id = template.save(console).await?;
        tracing::info!("scan template {} saved", id);
        writeln!(output, "{id}")?;
        Ok(())
    }
}
