use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Paging applied to selects that do not ask for any.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagingSettings {
    /// number of results returned by a select without `$limit`
    #[serde(default = "default_limit_default")]
    pub default_limit: u64,
}

impl PagingSettings {
    pub fn is_default(&self) -> bool {
        *self == PagingSettings::default()
    }
}

impl Default for PagingSettings {
    fn default() -> PagingSettings {
        PagingSettings {
            default_limit: default_limit_default(),
        }
    }
}

// for serde default //
fn default_limit_default() -> u64 {
    10_000
}
