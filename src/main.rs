use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mardev::{App, AppConfig, GateOutcome, Route};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "failed to load configuration, using defaults");
            AppConfig::default()
        }
    };

    let app = App::from_config(config).context("failed to wire the application")?;
    app.bootstrap().execute().await;

    let ctx = app.context();
    info!(
        offline = ctx.is_offline(),
        signed_in = ctx.has_session(),
        onboarding_complete = ctx.is_onboarding_complete(),
        "client ready"
    );

    let gate = app.gate();
    for route in [Route::Settings, Route::Chat] {
        match gate.evaluate(route) {
            GateOutcome::Render => info!(route = route.path(), "route available"),
            GateOutcome::RedirectToLanding => {
                info!(route = route.path(), "route requires sign-in")
            }
            GateOutcome::RedirectToOnboarding => {
                info!(route = route.path(), "route requires onboarding")
            }
            GateOutcome::Loading => {}
        }
    }

    Ok(())
}
