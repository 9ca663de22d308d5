pub mod broker;
pub mod prompt;
pub mod providers;
pub mod state;
pub mod surface;
pub mod telegram;
pub mod watch;

pub use broker::{BrokerError, ResponseBroker};
pub use providers::provider::{ProviderError, TextProvider};
pub use state::AppState;
pub use surface::{Surface, SurfaceError};
pub use watch::WatchLoop;
