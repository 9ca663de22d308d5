pub mod config;
pub mod message;
pub mod persona;

// Config re-exports
pub use config::{
    BrokerSettings, Config, ConfigError, PersonaSettings, ProviderChain, ProviderConfig, Secrets,
    SecretsError, Settings, SettingsError, WatchSettings, load_dotenv,
};

// Message re-exports
pub use message::{
    ConversationId, DispatchEvent, DispatchOutcome, InboundMessage, ProviderKind, ReplyDraft,
};

// Persona re-exports
pub use persona::{PersonaError, PersonaProfile};
