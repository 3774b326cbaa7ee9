//! careermap config - Show the effective configuration

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::error::{CareerError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print as JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    let config = ctx.config.redacted();
    if args.json || ctx.robot_mode {
        return emit_json(&config);
    }
    let rendered = toml::to_string_pretty(&config)
        .map_err(|err| CareerError::Config(format!("render config: {err}")))?;
    print!("{rendered}");
    Ok(())
}
