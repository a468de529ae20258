//! Manual entry point for the daily lifecycle pass.
//! Run with: `cargo loco task --name lifecycle`

use async_trait::async_trait;
use loco_rs::{
    app::AppContext,
    task::{Task, TaskInfo, Vars},
    Result,
};

use crate::timers;

pub struct LifecycleTask;

#[async_trait]
impl Task for LifecycleTask {
    fn task(&self) -> TaskInfo {
        TaskInfo {
            name: "lifecycle".to_string(),
            detail: "Run the daily trade-subscription and cleanup pass now".to_string(),
        }
    }

    async fn run(&self, ctx: &AppContext, _vars: &Vars) -> Result<()> {
        timers::run_daily_lifecycle(ctx).await?;
        timers::notify_stock_alerts(ctx).await?;
        Ok(())
    }
}
