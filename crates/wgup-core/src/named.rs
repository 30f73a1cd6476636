//! Serde helper storing a name-keyed map as a JSON list.
//!
//! The persisted document keeps interfaces and peers as arrays of objects
//! that carry their own name. In memory they live in a `BTreeMap` keyed by
//! that name so lookups are direct and iteration is sorted.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entity whose identity is its name.
pub(crate) trait Named {
    fn name(&self) -> &str;
}

pub(crate) fn serialize<T, S>(items: &BTreeMap<String, T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    serializer.collect_seq(items.values())
}

pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    T: Named + Deserialize<'de>,
    D: Deserializer<'de>,
{
    let list = Vec::<T>::deserialize(deserializer)?;
    let mut items = BTreeMap::new();
    for item in list {
        let name = item.name().to_string();
        if items.insert(name.clone(), item).is_some() {
            return Err(D::Error::custom(format!("duplicate name \"{name}\"")));
        }
    }
    Ok(items)
}
