//! Conversion between payloads and the string wire form.
//!
//! Strings (`String`, `&'static str`, `Box<str>`, `Cow<'static, str>`) are
//! stored verbatim. Every other value, including `Arc<str>` and `Rc<str>`,
//! is encoded as JSON according to [`SerializerSettings`].
//!
//! Reading follows three cases:
//! - the value already has the requested type: returned unchanged
//!   ([`passthrough_identity`]);
//! - the value is stored text: decoded ([`from_stored_string`]). Malformed
//!   JSON is a [`CacheError::Decode`]; well-formed JSON of another shape
//!   yields `T::default()`;
//! - anything else yields `T::default()`.

mod null_fields;

use cachet_config::SerializerSettings;
use cachet_core::{CacheError, CacheResult};
use null_fields::OmitNullFields;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;

/// Encodes a value to its wire form.
///
/// A value that encodes to JSON `null` becomes the text `null`; use
/// [`serialize_present`] to detect that case.
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if serde cannot encode the value.
pub fn serialize<T: Serialize + Any>(value: &T, settings: &SerializerSettings) -> CacheResult<String> {
    Ok(serialize_present(value, settings)?.unwrap_or_else(|| Value::Null.to_string()))
}

/// Encodes a value to its wire form, or `None` when the value is null.
///
/// # Errors
///
/// Returns [`CacheError::Serialization`] if serde cannot encode the value.
pub fn serialize_present<T: Serialize + Any>(
    value: &T,
    settings: &SerializerSettings,
) -> CacheResult<Option<String>> {
    if let Some(text) = as_text(value) {
        return Ok(Some(text.to_owned()));
    }

    let encoded = if settings.omit_null_fields {
        serde_json::to_value(OmitNullFields(value))
    } else {
        serde_json::to_value(value)
    };
    let mut json = encoded.map_err(CacheError::Serialization)?;
    if json.is_null() {
        return Ok(None);
    }

    if settings.type_names.tags_root() {
        if let Value::Object(map) = &mut json {
            map.insert(
                SerializerSettings::TYPE_FIELD.to_string(),
                Value::String(type_name::<T>().to_string()),
            );
        }
    }

    serde_json::to_string(&json)
        .map(Some)
        .map_err(CacheError::Serialization)
}

/// Reconstructs a typed value from a stored or already-typed value.
///
/// # Errors
///
/// Returns [`CacheError::Decode`] when `value` is text that is not
/// well-formed JSON and `T` is not a string type.
pub fn deserialize<T, V>(value: V, settings: &SerializerSettings) -> CacheResult<T>
where
    T: DeserializeOwned + Default + Any,
    V: Any,
{
    match passthrough_identity::<T, V>(value) {
        Ok(same) => Ok(same),
        Err(other) => match other.downcast::<String>() {
            Ok(text) => match text_into::<T>(*text) {
                Ok(same) => Ok(same),
                Err(text) => from_stored_string(&text, settings),
            },
            Err(_) => Ok(T::default()),
        },
    }
}

/// Returns `value` unchanged if it already is a `T`.
///
/// On mismatch the value is handed back type-erased so the caller can try
/// another conversion.
///
/// # Errors
///
/// Returns the boxed value when `V` and `T` differ.
pub fn passthrough_identity<T: Any, V: Any>(value: V) -> Result<T, Box<dyn Any>> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed.downcast::<T>().map(|same| *same)
}

/// Decodes stored text into `T`.
///
/// # Errors
///
/// Returns [`CacheError::Decode`] if `text` is not well-formed JSON.
pub fn from_stored_string<T>(text: &str, settings: &SerializerSettings) -> CacheResult<T>
where
    T: DeserializeOwned + Default + Any,
{
    let mut json: Value = serde_json::from_str(text).map_err(CacheError::Decode)?;

    if settings.type_names.tags_root() {
        if let Value::Object(map) = &mut json {
            if let Some(tag) = map.remove(SerializerSettings::TYPE_FIELD) {
                if tag.as_str() != Some(type_name::<T>()) {
                    return Ok(T::default());
                }
            }
        }
    }

    Ok(serde_json::from_value(json).unwrap_or_default())
}

fn as_text<T: Any>(value: &T) -> Option<&str> {
    let value = value as &dyn Any;
    if let Some(text) = value.downcast_ref::<String>() {
        return Some(text.as_str());
    }
    if let Some(text) = value.downcast_ref::<&'static str>() {
        return Some(*text);
    }
    if let Some(text) = value.downcast_ref::<Box<str>>() {
        return Some(&**text);
    }
    value.downcast_ref::<Cow<'static, str>>().map(|text| &**text)
}

/// Converts stored text into `T` when `T` is an owned string type other
/// than `String`; hands the text back otherwise.
fn text_into<T: Any>(text: String) -> Result<T, String> {
    let id = TypeId::of::<T>();
    let converted: Box<dyn Any> = if id == TypeId::of::<Box<str>>() {
        Box::new(text.into_boxed_str())
    } else if id == TypeId::of::<Cow<'static, str>>() {
        Box::new(Cow::<'static, str>::Owned(text))
    } else {
        return Err(text);
    };
    converted.downcast::<T>().map(|same| *same).map_err(|_| String::new())
}
