//! Names of the fields holding the position of a unit in the archive graph.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Graph metadata maintained on every unit by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphFields {
    /// identifier of the unit
    #[serde(default = "id_default")]
    pub id: String,
    /// identifiers of the direct parents
    #[serde(default = "parents_default")]
    pub parents: String,
    /// identifiers of every ancestor
    #[serde(default = "ancestors_default")]
    pub ancestors: String,
    /// ancestors grouped by distance: `<field>.<n>` lists the ancestors `n` levels up
    #[serde(default = "ancestors_by_distance_default")]
    pub ancestors_by_distance: String,
    /// smallest depth of the unit, top level units being at depth 0
    #[serde(default = "min_depth_default")]
    pub min_depth: String,
    /// largest depth of the unit
    #[serde(default = "max_depth_default")]
    pub max_depth: String,
}

impl GraphFields {
    pub fn is_default(&self) -> bool {
        *self == GraphFields::default()
    }

    /// Every field name, with the key it is configured under.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("id", self.id.as_str()),
            ("parents", self.parents.as_str()),
            ("ancestors", self.ancestors.as_str()),
            ("ancestorsByDistance", self.ancestors_by_distance.as_str()),
            ("minDepth", self.min_depth.as_str()),
            ("maxDepth", self.max_depth.as_str()),
        ]
    }
}

impl Default for GraphFields {
    fn default() -> GraphFields {
        GraphFields {
            id: id_default(),
            parents: parents_default(),
            ancestors: ancestors_default(),
            ancestors_by_distance: ancestors_by_distance_default(),
            min_depth: min_depth_default(),
            max_depth: max_depth_default(),
        }
    }
}

// for serde default //
fn id_default() -> String {
    "_id".to_string()
}
fn parents_default() -> String {
    "_up".to_string()
}
fn ancestors_default() -> String {
    "_us".to_string()
}
fn ancestors_by_distance_default() -> String {
    "_uds".to_string()
}
fn min_depth_default() -> String {
    "_min".to_string()
}
fn max_depth_default() -> String {
    "_max".to_string()
}
