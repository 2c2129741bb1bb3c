use clap::Subcommand;

use super::{print_event, CliResult, Context};

#[derive(Subcommand)]
pub enum RemindersAction {
    /// Turn reminders on for a plan's current day
    Enable {
        /// Plan ID
        plan_id: String,
    },
    /// Turn reminders off for a plan
    Disable {
        /// Plan ID
        plan_id: String,
    },
    /// Show stored reminder state (defaults to the active plan)
    Status {
        /// Plan ID
        plan_id: Option<String>,
    },
    /// List every stored reminder schedule
    List,
    /// Inspect or change the local notification permission
    Permission {
        #[command(subcommand)]
        action: PermissionOp,
    },
    /// List triggers registered with the local scheduler
    Triggers,
}

#[derive(Subcommand)]
pub enum PermissionOp {
    /// Show the recorded decision
    Show,
    /// Grant notification permission
    Grant,
    /// Deny notification permission
    Deny,
    /// Forget the decision so the next request prompts again
    Reset,
}

pub async fn run(action: RemindersAction, json: bool) -> CliResult {
    let ctx = Context::open()?;
    match action {
        RemindersAction::Enable { plan_id } => {
            let event = ctx.engine.enable_reminders(&plan_id).await?;
            print_event(&event, json)?;
        }
        RemindersAction::Disable { plan_id } => {
            let event = ctx.engine.disable_reminders(&plan_id).await?;
            print_event(&event, json)?;
        }
        RemindersAction::Status { plan_id } => {
            let plan_id = match plan_id {
                Some(id) => id,
                None => ctx
                    .engine
                    .active_plan()
                    .await?
                    .ok_or("no active plan; pass a plan ID")?,
            };
            let status = ctx.engine.status(&plan_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                let active = if status.active { " (active)" } else { "" };
                match &status.schedule {
                    Some(s) => println!(
                        "{plan_id}{active}: day {} with {} reminders, updated {}",
                        s.day_number,
                        s.all_trigger_ids().len(),
                        s.updated_at.format("%Y-%m-%d %H:%M")
                    ),
                    None => println!("{plan_id}{active}: reminders off"),
                }
            }
        }
        RemindersAction::List => {
            let schedules = ctx.engine.schedules().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&schedules)?);
            } else if schedules.is_empty() {
                println!("no reminders set");
            } else {
                for s in schedules {
                    println!(
                        "{}  day {}  {} reminders",
                        s.plan_id,
                        s.day_number,
                        s.all_trigger_ids().len()
                    );
                }
            }
        }
        RemindersAction::Permission { action } => {
            match action {
                PermissionOp::Show => {}
                PermissionOp::Grant => ctx.ledger.set_permission(Some(true))?,
                PermissionOp::Deny => ctx.ledger.set_permission(Some(false))?,
                PermissionOp::Reset => ctx.ledger.set_permission(None)?,
            }
            let state = match ctx.ledger.permission()? {
                Some(true) => "granted",
                Some(false) => "denied",
                None => "undecided",
            };
            println!("{state}");
        }
        RemindersAction::Triggers => {
            let triggers = ctx.ledger.triggers()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&triggers)?);
            } else if triggers.is_empty() {
                println!("no triggers");
            } else {
                for t in triggers {
                    println!("{:02}:{:02}  {}  {}", t.hour, t.minute, t.title, t.id);
                }
            }
        }
    }
    Ok(())
}
