use anyhow::{Context, Result};
use clap::Parser;
use involve_dashboard_lib::config::Args;
use involve_dashboard_lib::models::Role;
use involve_dashboard_lib::{init_tracing, Dashboard};

fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(error) = init_tracing(&args.data_dir, &args.log_level) {
        eprintln!("failed to initialize tracing: {}", error);
    }

    let role = args
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()
        .context("invalid --role")?;

    let dashboard = Dashboard::open(&args.data_dir)
        .with_context(|| format!("failed to open dashboard data in {}", args.data_dir.display()))?;

    match dashboard.execute(args.command, role) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(error) => {
            tracing::error!(error = %error, "command failed");
            Err(error.into())
        }
    }
}
