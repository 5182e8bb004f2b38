//! Version 1 of the configuration format.

use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::values::{GraphFields, PagingSettings};

pub const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";

/// The configuration as written on disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    #[serde(skip_serializing_if = "GraphFields::is_default")]
    #[serde(default)]
    pub graph_fields: GraphFields,
    #[serde(skip_serializing_if = "PagingSettings::is_default")]
    #[serde(default)]
    pub paging: PagingSettings,
    /// Request field names standing for a fixed document field, like `#id` for the
    /// identifier.
    #[serde(default = "reserved_fields_default")]
    pub reserved_fields: BTreeMap<String, String>,
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::empty()
    }

    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            graph_fields: GraphFields::default(),
            paging: PagingSettings::default(),
            reserved_fields: reserved_fields_default(),
        }
    }
}

fn reserved_fields_default() -> BTreeMap<String, String> {
    BTreeMap::from([("#id".to_string(), "_id".to_string())])
}

/// Parse the configuration format from a directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| {
                ParseConfigurationError::IoError(format!(
                    "{}: {}",
                    &configuration_file.display(),
                    err
                ))
            })?;

    let parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    tracing::debug!(
        file = %configuration_file.display(),
        version = parsed_config.version,
        "configuration loaded"
    );
    Ok(parsed_config)
}

/// Write the parsed configuration, and the JSON schema describing it, into a directory on
/// disk.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().to_owned().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    // create the configuration file
    fs::write(
        configuration_file,
        serde_json::to_string_pretty(&parsed_config)? + "\n",
    )
    .await?;

    // create the jsonschema file
    let configuration_jsonschema_file_path = out_dir
        .as_ref()
        .to_owned()
        .join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)? + "\n",
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_take_defaults() {
        let parsed: ParsedConfiguration = serde_json::from_str(r#"{"version": 1}"#).unwrap();
        assert_eq!(parsed, ParsedConfiguration::empty());
    }

    #[test]
    fn test_partial_graph_fields() {
        let parsed: ParsedConfiguration =
            serde_json::from_str(r#"{"version": 1, "graphFields": {"parents": "parents"}}"#)
                .unwrap();
        assert_eq!(parsed.graph_fields.parents, "parents");
        assert_eq!(parsed.graph_fields.ancestors, "_us");
    }

    #[test]
    fn test_schema_accepts_the_initial_configuration() {
        let schema = serde_json::to_value(schemars::schema_for!(ParsedConfiguration)).unwrap();
        let compiled = jsonschema::JSONSchema::compile(&schema).unwrap();
        let initial = serde_json::to_value(ParsedConfiguration::initial()).unwrap();
        assert!(compiled.is_valid(&initial));

        let wrong = serde_json::json!({"version": "one"});
        assert!(!compiled.is_valid(&wrong));
    }

    #[tokio::test]
    async fn test_write_then_parse() {
        let dir = tempfile::tempdir().unwrap();
        let mut parsed = ParsedConfiguration::initial();
        parsed.paging.default_limit = 50;

        write_parsed_configuration(parsed.clone(), dir.path())
            .await
            .unwrap();
        assert!(dir.path().join(CONFIGURATION_JSONSCHEMA_FILENAME).exists());

        let read_back = parse_configuration(dir.path()).await.unwrap();
        assert_eq!(read_back, parsed);
    }

    #[tokio::test]
    async fn test_parse_error_points_at_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIGURATION_FILENAME), "{\"version\": }")
            .await
            .unwrap();
        let error = parse_configuration(dir.path()).await.unwrap_err();
        assert!(matches!(
            error,
            ParseConfigurationError::ParseError { line: 1, .. }
        ));
    }
}
