//! Configuration used by the translator at runtime.

use std::collections::BTreeMap;

use crate::error::MakeRuntimeConfigurationError;
use crate::values::GraphFields;
use crate::version1::{ParsedConfiguration, CURRENT_VERSION};

/// The 'Configuration' type collects all the information necessary to translate requests.
///
/// Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which checks what the on-disk format cannot express.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub graph_fields: GraphFields,
    pub default_limit: u64,
    pub reserved_fields: BTreeMap<String, String>,
}

impl Default for Configuration {
    fn default() -> Self {
        let ParsedConfiguration {
            graph_fields,
            paging,
            reserved_fields,
            ..
        } = ParsedConfiguration::initial();
        Configuration {
            graph_fields,
            default_limit: paging.default_limit,
            reserved_fields,
        }
    }
}

/// Check a parsed configuration and turn it into a runtime one.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    if parsed_config.version != CURRENT_VERSION {
        return Err(MakeRuntimeConfigurationError::UnsupportedVersion(
            parsed_config.version,
        ));
    }

    for (key, field) in parsed_config.graph_fields.entries() {
        if field.trim().is_empty() {
            return Err(MakeRuntimeConfigurationError::InvalidValue {
                field: format!("graphFields.{key}"),
                message: "field name is empty".to_string(),
            });
        }
    }

    if parsed_config.paging.default_limit == 0 {
        return Err(MakeRuntimeConfigurationError::InvalidValue {
            field: "paging.defaultLimit".to_string(),
            message: "the default limit must be positive".to_string(),
        });
    }

    for (token, field) in &parsed_config.reserved_fields {
        if !token.starts_with('#') || field.trim().is_empty() {
            return Err(MakeRuntimeConfigurationError::InvalidValue {
                field: format!("reservedFields.{token}"),
                message: "reserved fields map a '#' name to a document field".to_string(),
            });
        }
    }

    Ok(Configuration {
        graph_fields: parsed_config.graph_fields,
        default_limit: parsed_config.paging.default_limit,
        reserved_fields: parsed_config.reserved_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_configuration_is_valid() {
        let configuration = make_runtime_configuration(ParsedConfiguration::initial()).unwrap();
        assert_eq!(configuration, Configuration::default());
        assert_eq!(configuration.default_limit, 10_000);
    }

    #[test]
    fn test_unknown_version_is_refused() {
        let mut parsed = ParsedConfiguration::initial();
        parsed.version = 2;
        assert!(matches!(
            make_runtime_configuration(parsed),
            Err(MakeRuntimeConfigurationError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_empty_field_names_are_refused() {
        let mut parsed = ParsedConfiguration::initial();
        parsed.graph_fields.ancestors = String::new();
        assert!(make_runtime_configuration(parsed).is_err());

        let mut parsed = ParsedConfiguration::initial();
        parsed
            .reserved_fields
            .insert("id".to_string(), "_id".to_string());
        assert!(make_runtime_configuration(parsed).is_err());
    }
}
