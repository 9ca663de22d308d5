use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doppel_core::{Config, DispatchOutcome, PersonaProfile};
use doppel_gateway::broker::ResponseBroker;
use doppel_gateway::providers;
use doppel_gateway::state::AppState;
use doppel_gateway::telegram::TelegramSurface;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    doppel_core::load_dotenv();
    let config = Config::load()?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.settings.logging.level.clone().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Create provider clients for the usable chain
    let chain = providers::build_chain(&config)?;

    // Load the persona profile if replies should be styled
    let persona = if config.settings.persona.enabled {
        let path = config.persona_profile_path()?;
        match PersonaProfile::load(&path) {
            Ok(profile) => {
                info!("Persona profile loaded for '{}'", profile.display_name);
                Some(profile)
            }
            Err(err) => {
                warn!(
                    "Persona enabled but profile could not be loaded from {:?}: {} (run `doppel-cli learn` first)",
                    path, err
                );
                None
            }
        }
    } else {
        None
    };

    let broker = Arc::new(
        ResponseBroker::new(chain, config.per_attempt_timeout()).with_persona(persona),
    );
    info!("Provider chain: {}", broker.provider_names().join(" -> "));
    let state = Arc::new(AppState::new(
        broker,
        config.poll_interval(),
        config.error_backoff(),
    ));

    // Log every completed dispatch
    let mut events = state.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.outcome {
                DispatchOutcome::Replied => info!(
                    "[{}] replied via {}: {}",
                    event.conversation,
                    event.provider.as_deref().unwrap_or("?"),
                    event.reply_text.as_deref().unwrap_or_default()
                ),
                DispatchOutcome::GenerationFailed => {
                    warn!("[{}] no reply generated for: {}", event.conversation, event.inbound_text)
                }
                DispatchOutcome::DeliveryFailed => {
                    warn!("[{}] reply generated but not delivered", event.conversation)
                }
            }
        }
    });

    // Start one watch loop per configured surface
    let mut handles = Vec::new();
    if config.telegram_enabled() {
        if let Some(token) = config.telegram_bot_token() {
            let surface = Arc::new(TelegramSurface::new(token));
            handles.push(state.spawn_watcher(surface));
            info!("Telegram watcher started");
        }
    } else {
        info!("Telegram surface not configured (set TELEGRAM_BOT_TOKEN and enable in config)");
    }

    if handles.is_empty() {
        warn!("No surfaces enabled; gateway is idle. Use `doppel-cli ask` for one-off calls.");
    }

    // Run until ctrl-c, then drain the loops
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    state.stop();
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
