//! Helpers for processing requests and building native fragments.

use archive_query_configuration::Configuration;
use query_engine_dsl::dsl;
use query_engine_dsl::dsl::tokens;
use query_engine_native::native;

use super::error::Error;

/// Static information from the configuration.
pub struct Env<'a> {
    configuration: &'a Configuration,
}

impl<'a> Env<'a> {
    pub fn new(configuration: &'a Configuration) -> Env<'a> {
        Env { configuration }
    }

    /// The document field a request field refers to. Reserved names map to their configured
    /// field, other names are used as is.
    pub fn lookup_field(&self, field: &dsl::query::FieldName) -> native::ast::FieldName {
        match self.configuration.reserved_fields.get(field.as_str()) {
            Some(mapped) => native::helpers::make_field(mapped),
            None => native::helpers::make_field(field.as_str()),
        }
    }

    /// Like 'lookup_field', for fields a predicate is evaluated on. The "all fields" marker
    /// names no field.
    pub fn lookup_queried_field(
        &self,
        field: &dsl::query::FieldName,
    ) -> Result<native::ast::FieldName, Error> {
        if field.as_str() == tokens::ALL_FIELDS {
            Err(Error::Untranslatable(format!(
                "a predicate on {}",
                tokens::ALL_FIELDS
            )))
        } else {
            Ok(self.lookup_field(field))
        }
    }

    pub fn id_field(&self) -> native::ast::FieldName {
        native::helpers::make_field(&self.configuration.graph_fields.id)
    }

    pub fn parents_field(&self) -> native::ast::FieldName {
        native::helpers::make_field(&self.configuration.graph_fields.parents)
    }

    pub fn ancestors_field(&self) -> native::ast::FieldName {
        native::helpers::make_field(&self.configuration.graph_fields.ancestors)
    }

    /// The field listing the ancestors exactly `distance` levels up.
    pub fn ancestors_at_field(&self, distance: u32) -> native::ast::FieldName {
        native::helpers::make_sub_field(
            &native::helpers::make_field(&self.configuration.graph_fields.ancestors_by_distance),
            &distance.to_string(),
        )
    }

    pub fn min_depth_field(&self) -> native::ast::FieldName {
        native::helpers::make_field(&self.configuration.graph_fields.min_depth)
    }

    pub fn max_depth_field(&self) -> native::ast::FieldName {
        native::helpers::make_field(&self.configuration.graph_fields.max_depth)
    }

    pub fn default_limit(&self) -> u64 {
        self.configuration.default_limit
    }
}
