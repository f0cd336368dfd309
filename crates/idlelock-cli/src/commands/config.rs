use clap::Subcommand;
use idlelock_core::TrackerConfig;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show {
        /// Config file (defaults to ~/.config/idlelock/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration file path
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show { config } => {
            let cfg = super::load_config(config.as_deref())?;
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigAction::Path => {
            println!("{}", TrackerConfig::path().display());
        }
    }
    Ok(())
}
