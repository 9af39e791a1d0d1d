//! Serializer settings.

use serde::{Deserialize, Serialize};

/// Controls whether a type discriminator is written to and checked on root
/// JSON objects.
///
/// The discriminator lives in its own field so it never collides with the
/// tag of an internally tagged serde enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeNameHandling {
    /// Never write or check discriminators.
    None,
    /// No root discriminator; a `__type` key in stored data is ordinary
    /// data. Nested polymorphism is left to tagged serde enums.
    #[default]
    Auto,
    /// Write the discriminator on every root object and check it on read.
    Objects,
}

impl TypeNameHandling {
    /// Returns true if root objects carry a discriminator that is written
    /// on encode and checked on decode.
    #[must_use]
    pub const fn tags_root(self) -> bool {
        matches!(self, Self::Objects)
    }
}

/// Immutable encoding options, built once per cache service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerSettings {
    /// Drop object fields whose value is `null`.
    pub omit_null_fields: bool,
    /// Type discriminator handling.
    pub type_names: TypeNameHandling,
}

impl SerializerSettings {
    /// Field name used for the type discriminator.
    pub const TYPE_FIELD: &'static str = "__type";

    /// Settings that encode exactly what serde produces.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            omit_null_fields: false,
            type_names: TypeNameHandling::None,
        }
    }

    /// Returns a copy with null-field handling changed.
    #[must_use]
    pub const fn with_omit_null_fields(mut self, omit: bool) -> Self {
        self.omit_null_fields = omit;
        self
    }

    /// Returns a copy with discriminator handling changed.
    #[must_use]
    pub const fn with_type_names(mut self, handling: TypeNameHandling) -> Self {
        self.type_names = handling;
        self
    }
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            omit_null_fields: true,
            type_names: TypeNameHandling::Auto,
        }
    }
}
