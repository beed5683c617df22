//! VisionPilot diagnostic tool
//!
//! Prints the backend comparison table. With the `capture` argument it also
//! opens a context, takes one screenshot and prints the context stats.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visionpilot::backend;
use visionpilot::{AutomationContext, ContextConfig};

fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr to keep stdout clean for the report)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    print!("{}", backend::comparison_table());
    println!("auto selects: {}", backend::auto_select());

    if std::env::args().nth(1).as_deref() == Some("capture") {
        let config = ContextConfig::from_env().cleanup_on_close(false);
        let mut ctx = AutomationContext::new(config)?;

        let shot = ctx.capture(true)?;
        tracing::info!("{}", shot.message);
        if let Some(path) = &shot.path {
            println!("saved: {}", path.display());
        }

        ctx.close();
        println!("{}", ctx.stats().to_json()?);
    }

    Ok(())
}
