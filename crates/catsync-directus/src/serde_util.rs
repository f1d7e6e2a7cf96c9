//! Serde adapters for loosely-typed Directus columns.

use catsync_core::ExternalId;
use serde::{Deserialize, Deserializer, Serializer};

/// Writes an id to an integer column: numeric ids as JSON numbers, anything
/// else as a string.
pub(crate) fn external_id_as_number<S: Serializer>(
    id: &ExternalId,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match id.as_number() {
        Some(n) => serializer.serialize_i64(n),
        None => serializer.serialize_str(id.as_str()),
    }
}

#[allow(clippy::ref_option)]
pub(crate) fn optional_external_id_as_number<S: Serializer>(
    id: &Option<ExternalId>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => external_id_as_number(id, serializer),
        None => serializer.serialize_none(),
    }
}

/// Reads a nullable JSON column as a collection, mapping `null` to empty.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
