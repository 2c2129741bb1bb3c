//! Plan actions. Each one performs the plan service call first and only
//! then tells the reminder engine, the same order the app's screens use.

use clap::Subcommand;

use super::{print_event, CliResult, Context};

#[derive(Subcommand)]
pub enum PlanAction {
    /// List plans from the plan service
    List,
    /// Show a plan and its days
    Show {
        /// Plan ID
        plan_id: String,
    },
    /// Make a plan the active plan
    Select {
        /// Plan ID
        plan_id: String,
    },
    /// Register a just-created plan as the active plan
    Created {
        /// Plan ID
        plan_id: String,
    },
    /// Mark a day done and move reminders on
    Done {
        /// Plan ID
        plan_id: String,
        /// Day number (1-based)
        day: u32,
    },
    /// Delete a plan and its reminders
    Delete {
        /// Plan ID
        plan_id: String,
    },
    /// Re-check the active plan against the plan service
    Refresh,
}

pub async fn run(action: PlanAction, json: bool) -> CliResult {
    let ctx = Context::open()?;
    match action {
        PlanAction::List => {
            let plans = ctx.client.list_plans().await?;
            let active = ctx.engine.active_plan().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plans)?);
            } else if plans.is_empty() {
                println!("no plans");
            } else {
                for p in plans {
                    let marker = if active.as_deref() == Some(p.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{marker} {}  {}  ({} days)", p.id, p.title, p.days);
                }
            }
        }
        PlanAction::Show { plan_id } => {
            let plan = ctx
                .client
                .fetch_plan(&plan_id)
                .await?
                .ok_or_else(|| format!("plan not found: {plan_id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{}  ({}/{} days done)", plan.title, plan.done_count(), plan.items.len());
                for day in &plan.items {
                    let mark = if day.is_done { "x" } else { " " };
                    println!("[{mark}] Day {}: {}", day.day_number, day.label().unwrap_or(""));
                }
            }
        }
        PlanAction::Select { plan_id } => {
            let event = ctx.engine.on_plan_selected(&plan_id).await?;
            print_event(&event, json)?;
        }
        PlanAction::Created { plan_id } => {
            let event = ctx.engine.on_plan_created(&plan_id).await?;
            print_event(&event, json)?;
        }
        PlanAction::Done { plan_id, day } => {
            ctx.client.patch_day_done(&plan_id, day, true).await?;
            let event = ctx.engine.on_day_marked_done(&plan_id, day).await?;
            print_event(&event, json)?;
        }
        PlanAction::Delete { plan_id } => {
            ctx.client.delete_plan(&plan_id).await?;
            let event = ctx.engine.on_plan_deleted(&plan_id).await?;
            print_event(&event, json)?;
        }
        PlanAction::Refresh => match ctx.engine.refresh_active().await? {
            Some(event) => print_event(&event, json)?,
            None => println!("no active plan"),
        },
    }
    Ok(())
}
