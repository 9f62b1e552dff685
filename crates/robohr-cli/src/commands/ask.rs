//! `robohr ask` - Run one command through the full pipeline.

use crate::bootstrap;
use anyhow::Result;
use robohr_command::CommandEnvelope;
use robohr_core::{CallerContext, CommandRequest, RobohrConfig, Role};

#[derive(Debug)]
pub struct AskArgs {
    pub text: String,
    pub employee_id: Option<i64>,
    pub role: Role,
    pub lang: String,
    pub offline: bool,
}

pub async fn run(mut config: RobohrConfig, args: AskArgs) -> Result<()> {
    if args.offline {
        bootstrap::go_offline(&mut config);
    }
    let state = bootstrap::build_state(&config).await?;

    let caller = CallerContext::new(args.employee_id, args.role, args.lang.clone());
    let request = CommandRequest::text(args.text, args.lang);
    let response = state.gateway.handle(request, &caller).await?;

    let envelope = CommandEnvelope::from(response);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
