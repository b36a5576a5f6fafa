use crate::Error;
use scantemplate_engine::{CheckKind, Console, ScanTemplate};
use std::io::Write;

#[derive(clap::Parser, Debug)]
pub struct Action {
    /// Identifier of the template.
    pub id: String,
}

const KINDS: [(CheckKind, &str); 3] = [
    (CheckKind::Category, "categories"),
    (CheckKind::Type, "types"),
    (CheckKind::Check, "checks"),
];

impl Action {
    pub(crate) async fn execute<W: Write>(
        self,
        console: &Console,
        output: &mut W,
    ) -> Result<(), Error> {
        let template = ScanTemplate::load(console, Some(self.id.as_str())).await?;
        write_template(&template, output)?;
        Ok(())
    }
}

fn write_template<W: Write>(template: &ScanTemplate, output: &mut W) -> std::io::Result<()> {
    writeln!(output, "id: {}", template.id())?;
    writeln!(output, "name: {}", template.name().unwrap_or_default())?;
    writeln!(
        output,
        "description: {}",
        template.description().unwrap_or_default()
    )?;
    writeln!(output, "correlate: {}", template.correlate())?;
    writeln!(output, "unsafe checks: {}", template.unsafe_checks())?;
    writeln!(output, "potential checks: {}", template.potential_checks())?;
    for (kind, label) in KINDS {
        writeln!(
            output,
            "enabled {label}: {}",
            template.checks_by_kind(kind).join(", ")
        )?;
        writeln!(
            output,
            "disabled {label}: {}",
            template.disabled_checks_by_kind(kind).join(", ")
        )?;
    }
    Ok(())
}
