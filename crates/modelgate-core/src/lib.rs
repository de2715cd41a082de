pub mod error;
pub mod types;
pub mod config;
pub mod transport;
pub mod provider;
pub mod health;
pub mod dispatch;
pub mod fallback;
pub mod router;

pub use dispatch::Dispatcher;
pub use error::{DispatchError, GatewayError, ProviderError};
pub use fallback::FallbackResponder;
pub use router::{OverallHealth, Router, RouterStatus};
pub use types::{ChatRequest, CompletionResult, Message, Role};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
