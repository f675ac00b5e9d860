//! # Registry Configuration & Constants
//!
//! Fixed protocol values and the tunable [`ChainConfig`].

/// Payload text of the genesis block: `{"data": "Genesis Block"}`.
pub const GENESIS_DATA: &str = "Genesis Block";

/// Trailing component of every ownership challenge.
pub const CHALLENGE_SUFFIX: &str = "starRegistry";

/// Separator between challenge components: `<address>:<time>:starRegistry`.
pub const CHALLENGE_SEPARATOR: char = ':';

/// How long a signed challenge stays acceptable, in seconds.
pub const DEFAULT_VALIDATION_WINDOW_SECS: u64 = 300;

/// Runtime parameters of a [`crate::storage::Chain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// A challenge is rejected once `now - challenge_time >= window`.
    pub validation_window_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            validation_window_secs: DEFAULT_VALIDATION_WINDOW_SECS,
        }
    }
}

impl ChainConfig {
    /// Override the validation window.
    pub fn with_validation_window(mut self, secs: u64) -> Self {
        self.validation_window_secs = secs;
        self
    }
}
