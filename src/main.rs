use clap::Parser;
use scantemplate::config::Configuration;
use std::io::IsTerminal;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration toml file.
    #[arg(
        short,
        long,
        default_value = "/etc/scantemplate/scantemplate.toml",
        env = "SCANTEMPLATE_CONFIG"
    )]
    config_path: String,
    /// Logging directive, using the tracing-subscriber EnvFilter syntax.
    #[arg(
        long,
        default_value = "scantemplate=info,scantemplate_engine=info",
        env = "LOG"
    )]
    log: String,
    #[command(subcommand)]
    inner: scantemplate::action::Action,
}

impl Args {
    async fn run(self) -> Result<(), scantemplate::Error> {
        let config = Configuration::from_path(&self.config_path)?;
        let console = config.console.build()?;
        let stdout = std::io::stdout();
        self.inner.execute(&console, &mut stdout.lock()).await
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _ = scantemplate::init_logs(&args.log, std::io::stderr().is_terminal());

    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
