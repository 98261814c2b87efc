use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical outcome of a gateway operation, independent of the gateway's own vocabulary.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PluginStatus {
    Processed,
    Pending,
    Error,
    Canceled,
    Undefined,
}

impl PluginStatus {
    /// Whether funds may have moved at the gateway for a call with this status.
    pub fn may_have_moved_funds(self) -> bool {
        matches!(self, Self::Processed | Self::Pending)
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processed => "PROCESSED",
            Self::Pending => "PENDING",
            Self::Error => "ERROR",
            Self::Canceled => "CANCELED",
            Self::Undefined => "UNDEFINED",
        };
        f.write_str(s)
    }
}

/// Maps a gateway status string and the error of the call (if any) to a [`PluginStatus`].
///
/// A call error wins over whatever partial status the gateway reported. This is the
/// only place gateway status strings are interpreted.
pub fn normalize(gateway_status: &str, call_error: Option<&str>) -> PluginStatus {
    if call_error.is_some() {
        return PluginStatus::Canceled;
    }

    match gateway_status {
        "succeeded" => PluginStatus::Processed,
        "pending" => PluginStatus::Pending,
        "failed" => PluginStatus::Error,
        "canceled" => PluginStatus::Canceled,
        _ => PluginStatus::Undefined,
    }
}
