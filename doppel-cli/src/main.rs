use std::path::PathBuf;

use clap::{Parser, Subcommand};

use doppel_core::{Config, InboundMessage, PersonaProfile};
use doppel_gateway::broker::ResponseBroker;
use doppel_gateway::providers;

#[derive(Parser)]
#[command(name = "doppel-cli", about = "Operator commands for the doppel gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration and list usable providers
    Check,
    /// Send a one-off message straight into the response broker,
    /// bypassing any watch loop
    Ask {
        /// Message text to answer
        message: String,
        /// Sender label used in the prompt
        #[arg(long, default_value = "operator")]
        sender: String,
    },
    /// Build a persona profile from an exported chat log
    Learn {
        /// Path to the chat export (lines in `Name: message` form)
        export: PathBuf,
        /// Persona display name (defaults to `[persona] display_name`)
        #[arg(long)]
        name: Option<String>,
        /// Output path (defaults to the configured profile path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    doppel_core::load_dotenv();

    match cli.command {
        Command::Check => check(),
        Command::Ask { message, sender } => ask(message, sender).await,
        Command::Learn { export, name, out } => learn(export, name, out),
    }
}

fn check() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    println!("Configuration OK");
    println!("Provider chain:");
    for name in config.settings.chain.iter() {
        let usable = name
            .parse()
            .map(|kind| config.secrets.has_provider(kind))
            .unwrap_or(false);
        let status = if usable { "ready" } else { "no API key" };
        println!("  - {} ({})", name, status);
    }

    println!(
        "Telegram surface: {}",
        if config.telegram_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let profile_path = config.persona_profile_path()?;
    if config.settings.persona.enabled {
        match PersonaProfile::load(&profile_path) {
            Ok(profile) => println!(
                "Persona: '{}' ({} phrases, {} emoji)",
                profile.display_name,
                profile.common_phrases.len(),
                profile.emoji_frequency.len()
            ),
            Err(err) => println!(
                "Persona: enabled but profile not loadable from {:?}: {}",
                profile_path, err
            ),
        }
    } else {
        println!("Persona: disabled");
    }

    Ok(())
}

async fn ask(message: String, sender: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let chain = providers::build_chain(&config)?;

    let persona = if config.settings.persona.enabled {
        PersonaProfile::load(&config.persona_profile_path()?).ok()
    } else {
        None
    };

    let broker =
        ResponseBroker::new(chain, config.per_attempt_timeout()).with_persona(persona);

    let inbound = InboundMessage::new("cli", sender, message);
    let draft = broker.respond(&inbound).await?;

    println!("[{}] {}", draft.provider, draft.text);
    Ok(())
}

fn learn(
    export: PathBuf,
    name: Option<String>,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let display_name = name
        .or_else(|| config.settings.persona.display_name.clone())
        .ok_or("No persona name given; pass --name or set [persona] display_name")?;

    let export_text = std::fs::read_to_string(&export)?;
    let profile = PersonaProfile::learn_from_export(display_name, &export_text)?;

    let out_path = match out {
        Some(path) => path,
        None => config.persona_profile_path()?,
    };
    profile.save(&out_path)?;

    println!(
        "Learned persona '{}' from {:?}: {} phrases, {} emoji -> {:?}",
        profile.display_name,
        export,
        profile.common_phrases.len(),
        profile.emoji_frequency.len(),
        out_path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
