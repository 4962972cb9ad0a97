//! JSON document encoding for bucket trees.
//!
//! A bucket encodes as an object with four fields:
//!
//! ```text
//! {
//!   "Name":     string,
//!   "Location": string,                 // root path, "" for children
//!   "Store":    { key: base64 string },
//!   "Children": { name: <bucket> }      // same encoding, recursively
//! }
//! ```
//!
//! Values are standard padded base64 so arbitrary bytes survive a text
//! format. On decode, absent or `null` `Store`/`Children` become empty maps,
//! unknown fields are ignored, and `Location` is not trusted: every decoded
//! node is a child until the opener promotes the top one to a root.
//!
//! Nesting depth is not limited. The JSON parser's recursion limit is off,
//! and both directions grow the stack on demand while walking children.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serializer};

use crate::bucket::{Bucket, BucketRole};
use crate::config::DocumentFormat;
use crate::error::{MemDbError, MemDbResult};

/// Remaining stack below which a recursive step moves to a fresh segment.
pub(crate) const STACK_RED_ZONE: usize = 64 * 1024;

/// Size of each stack segment allocated for deep trees (1 MiB).
pub(crate) const STACK_GROWTH: usize = 1024 * 1024;

/// Encode the tree under `bucket` as one JSON document.
pub fn encode(bucket: &Bucket, format: DocumentFormat) -> MemDbResult<Vec<u8>> {
    let result = match format {
        DocumentFormat::Compact => serde_json::to_vec(bucket),
        DocumentFormat::Pretty => serde_json::to_vec_pretty(bucket),
    };
    result.map_err(|e| MemDbError::Encode(e.to_string()))
}

/// Decode a JSON document into a detached tree.
///
/// The whole subtree is rebuilt; nothing is returned unless every nested
/// bucket decoded.
pub fn decode(bytes: &[u8]) -> MemDbResult<Bucket> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    de.disable_recursion_limit();
    let bucket = Bucket::deserialize(&mut de).map_err(|e| MemDbError::Decode(e.to_string()))?;
    de.end().map_err(|e| MemDbError::Decode(e.to_string()))?;
    Ok(bucket)
}

/// Writes the root's path as `Location`, `""` for a child.
///
/// A path that is not valid UTF-8 is written lossily (invalid sequences
/// become U+FFFD). The field is informational only: decoding never reads it
/// back, and the opener's path is what a reopened root writes to.
pub(crate) fn serialize_role<S: Serializer>(role: &BucketRole, s: S) -> Result<S::Ok, S::Error> {
    match role {
        BucketRole::Root { location } => s.serialize_str(&location.to_string_lossy()),
        BucketRole::Child => s.serialize_str(""),
    }
}

pub(crate) fn serialize_store<S: Serializer>(
    store: &BTreeMap<String, Vec<u8>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_map(store.iter().map(|(k, v)| (k, STANDARD.encode(v))))
}

pub(crate) fn serialize_children<S: Serializer>(
    children: &BTreeMap<String, Bucket>,
    s: S,
) -> Result<S::Ok, S::Error> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || s.collect_map(children))
}

/// A `Store` map with base64-decoded values; `null` reads as empty.
struct EncodedStore(BTreeMap<String, Vec<u8>>);

impl<'de> Deserialize<'de> for EncodedStore {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let encoded = Option::<BTreeMap<String, String>>::deserialize(d)?.unwrap_or_default();
        encoded
            .into_iter()
            .map(|(k, v)| match STANDARD.decode(v.as_bytes()) {
                Ok(bytes) => Ok((k, bytes)),
                Err(e) => Err(de::Error::custom(format!(
                    "invalid base64 value for key {k:?}: {e}"
                ))),
            })
            .collect::<Result<_, _>>()
            .map(EncodedStore)
    }
}

/// Decodes straight into [`Bucket`], children included.
///
/// Only JSON objects are accepted: a sequence is not a bucket, even though a
/// derived struct visitor would take one.
impl<'de> Deserialize<'de> for Bucket {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            d.deserialize_map(BucketVisitor)
        })
    }
}

struct BucketVisitor;

impl<'de> Visitor<'de> for BucketVisitor {
    type Value = Bucket;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a bucket document object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Bucket, A::Error> {
        let mut name: Option<String> = None;
        let mut store: Option<EncodedStore> = None;
        let mut children: Option<Option<BTreeMap<String, Bucket>>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "Name" => {
                    if name.is_some() {
                        return Err(de::Error::duplicate_field("Name"));
                    }
                    name = Some(map.next_value()?);
                }
                "Store" => {
                    if store.is_some() {
                        return Err(de::Error::duplicate_field("Store"));
                    }
                    store = Some(map.next_value()?);
                }
                "Children" => {
                    if children.is_some() {
                        return Err(de::Error::duplicate_field("Children"));
                    }
                    children = Some(map.next_value()?);
                }
                // "Location" is derived from the role, never read back.
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(Bucket::from_parts(
            name.unwrap_or_default(),
            store.map(|s| s.0).unwrap_or_default(),
            children.flatten().unwrap_or_default(),
        ))
    }
}
