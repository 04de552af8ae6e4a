//! Tri-state field updates.
//!
//! Update tools distinguish three cases per optional field:
//!
//! | JSON                    | [`FieldUpdate`] |
//! |-------------------------|-----------------|
//! | key absent              | `Keep`          |
//! | `"field": null`         | `Clear`         |
//! | `"field": <value>`      | `Set(value)`    |
//!
//! Fields must be declared with `#[serde(default)]` so an absent key falls
//! back to `Keep`.

use serde::{Deserialize, Deserializer};

/// A requested change to one optional field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<FieldUpdate<U>, E> {
        Ok(match self {
            Self::Keep => FieldUpdate::Keep,
            Self::Clear => FieldUpdate::Clear,
            Self::Set(v) => FieldUpdate::Set(f(v)?),
        })
    }

    /// Write the update into `slot`. `Keep` leaves it untouched.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Clear => *slot = None,
            Self::Set(v) => *slot = Some(v),
        }
    }
}

impl<'de, T> Deserialize<'de> for FieldUpdate<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Self::Set(v),
            None => Self::Clear,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Args {
        #[serde(default)]
        notes: FieldUpdate<String>,
    }

    fn parse(json: serde_json::Value) -> FieldUpdate<String> {
        serde_json::from_value::<Args>(json).unwrap().notes
    }

    #[test]
    fn absent_is_keep() {
        assert_eq!(parse(serde_json::json!({})), FieldUpdate::Keep);
    }

    #[test]
    fn null_is_clear() {
        assert_eq!(parse(serde_json::json!({"notes": null})), FieldUpdate::Clear);
    }

    #[test]
    fn value_is_set() {
        assert_eq!(
            parse(serde_json::json!({"notes": "milk"})),
            FieldUpdate::Set("milk".to_owned())
        );
    }

    #[test]
    fn apply_respects_each_state() {
        let mut slot = Some("old".to_owned());
        FieldUpdate::Keep.apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("old"));
        FieldUpdate::Set("new".to_owned()).apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));
        FieldUpdate::<String>::Clear.apply_to(&mut slot);
        assert_eq!(slot, None);
    }

    #[test]
    fn try_map_propagates_errors() {
        let update = FieldUpdate::Set("x".to_owned());
        let mapped: Result<FieldUpdate<u8>, &str> = update.try_map(|_| Err("bad"));
        assert_eq!(mapped, Err("bad"));
        let kept: Result<FieldUpdate<u8>, &str> =
            FieldUpdate::<String>::Keep.try_map(|_| Err("bad"));
        assert_eq!(kept, Ok(FieldUpdate::Keep));
    }
}
