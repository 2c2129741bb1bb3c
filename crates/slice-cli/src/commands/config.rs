use clap::Subcommand;
use slice_core::Config;

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value, e.g. `reminders.grace_time`
    Get {
        /// Dot-separated key
        key: String,
    },
    /// Change one value and save; the result must still validate
    Set {
        /// Dot-separated key
        key: String,
        /// New value (`HH:MM` for times, JSON array for `reminders.task_times`)
        value: String,
    },
    /// Print the whole configuration
    List,
    /// Print where the configuration file lives
    Path,
    /// Overwrite the file with defaults
    Reset,
}

pub fn run(action: ConfigAction, json: bool) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            // Echo the stored form; times are normalized to HH:MM.
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", config.to_toml()?);
            }
        }
        ConfigAction::Path => println!("{}", Config::file_path()?.display()),
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("reminder times and plan service reset to defaults");
        }
    }
    Ok(())
}
