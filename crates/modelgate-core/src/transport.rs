use reqwest::Client;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::ProviderError;

enum State {
    Idle,
    Open(Client),
    Closed,
}

/// Outbound HTTP client shared by every request of one router.
///
/// The underlying `reqwest::Client` (connection pool, keep-alive) is built on
/// first use. Once closed, the transport refuses to hand out clients.
pub struct PooledTransport {
    state: Mutex<State>,
    user_agent: String,
}

impl PooledTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Idle),
            user_agent: format!("modelgate/{}", crate::VERSION),
        }
    }

    /// Get the pooled client, building it on first call.
    ///
    /// `reqwest::Client` is reference counted, so the clone shares the pool.
    pub fn client(&self) -> Result<Client, ProviderError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| ProviderError::Unavailable(format!("transport lock poisoned: {e}")))?;

        match &*state {
            State::Open(client) => Ok(client.clone()),
            State::Closed => Err(ProviderError::TransportClosed),
            State::Idle => {
                let client = Client::builder()
                    .connect_timeout(Duration::from_secs(5))
                    .pool_max_idle_per_host(16)
                    .pool_idle_timeout(Duration::from_secs(90))
                    .tcp_keepalive(Duration::from_secs(30))
                    .user_agent(self.user_agent.as_str())
                    .build()
                    .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {e}")))?;
                tracing::debug!("HTTP transport opened");
                *state = State::Open(client.clone());
                Ok(client)
            }
        }
    }

    /// Release the connection pool. Safe to call any number of times.
    pub fn close(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if matches!(*state, State::Open(_)) {
            tracing::debug!("HTTP transport closed");
        }
        *state = State::Closed;
    }

    /// Whether a client has been built and not yet closed.
    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .map(|s| matches!(*s, State::Open(_)))
            .unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.state
            .lock()
            .map(|s| matches!(*s, State::Closed))
            .unwrap_or(true)
    }
}

impl Default for PooledTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_open() {
        let transport = PooledTransport::new();
        assert!(!transport.is_open());
        assert!(!transport.is_closed());
        transport.client().unwrap();
        assert!(transport.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let transport = PooledTransport::new();
        transport.client().unwrap();
        transport.close();
        transport.close();
        assert!(transport.is_closed());
        assert!(!transport.is_open());
        assert!(matches!(transport.client(), Err(ProviderError::TransportClosed)));
    }

    #[test]
    fn test_close_before_open() {
        let transport = PooledTransport::new();
        transport.close();
        assert!(matches!(transport.client(), Err(ProviderError::TransportClosed)));
    }
}
