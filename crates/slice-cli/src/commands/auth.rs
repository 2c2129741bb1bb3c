use clap::Subcommand;
use slice_core::plan::credentials;
use slice_core::{Config, HttpPlanClient};

use super::CliResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Obtain an anonymous user id from the plan service
    Login {
        /// Register a new id even if one is stored
        #[arg(long)]
        force: bool,
    },
    /// Forget the stored user id
    Logout,
    /// Show the stored user id
    Status,
}

pub async fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::Login { force } => {
            if !force {
                if let Some(id) = credentials::user_id()? {
                    println!("already registered: {id}");
                    return Ok(());
                }
            }
            let config = Config::load()?;
            let mut client = HttpPlanClient::new(
                &config.plan_service.api_base,
                config.plan_service.request_timeout(),
                None,
            )?;
            let id = client.register_anonymous().await?;
            credentials::set_user_id(&id)?;
            println!("registered: {id}");
        }
        AuthAction::Logout => {
            credentials::clear_user_id()?;
            println!("logged out");
        }
        AuthAction::Status => match credentials::user_id()? {
            Some(id) => println!("registered: {id}"),
            None => println!("not registered"),
        },
    }
    Ok(())
}
