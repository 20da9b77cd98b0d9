use clap::Subcommand;

use antisnooze_core::Config;

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Print the config file location
    Path,
    /// Print the effective configuration as TOML
    Show,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigCmd) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigCmd::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigCmd::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCmd::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
