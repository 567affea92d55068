use serde::{Deserialize, Serialize};

/// Log output settings for the `onthesis` binary.
///
/// `RUST_LOG` always wins over `filter` when it is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit one JSON object per line instead of compact text.
    #[serde(default)]
    pub json: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}
