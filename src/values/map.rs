use std::sync::Arc;

use hashbrown::HashMap;

use crate::values::Val;

/// A normalized map key. Keys are restricted to bool, int, uint, and string;
/// int and uint keys denoting the same mathematical value normalize to the
/// same key, so `{1: 'a'}[1u]` resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(Arc<str>),
}

impl MapKey {
    /// Normalize a value into a key. `None` for kinds that cannot key a map.
    pub fn from_val(v: &Val) -> Option<MapKey> {
        match v {
            Val::Bool(b) => Some(MapKey::Bool(*b)),
            Val::Int(i) => Some(MapKey::Int(*i)),
            Val::Uint(u) => {
                if *u <= i64::MAX as u64 {
                    Some(MapKey::Int(*u as i64))
                } else {
                    Some(MapKey::Uint(*u))
                }
            }
            Val::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }
}

/// An insertion-ordered map value.
///
/// Iteration yields entries in the order they were inserted; this is the
/// iteration order comprehensions observe, and it is stable across
/// evaluations. Entries remember the key value as it was written even when
/// lookup normalizes it (an uint key stays an uint when iterated).
#[derive(Debug, Clone, Default)]
pub struct MapVal {
    entries: Vec<(Val, Val)>,
    index: HashMap<MapKey, usize>,
}

/// Why a pair could not be inserted.
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    DuplicateKey(Val),
    UnsupportedKey(Val),
}

impl MapVal {
    pub fn new() -> MapVal {
        MapVal::default()
    }

    /// Build a map from key/value pairs, rejecting duplicate and non-keyable
    /// keys.
    pub fn from_entries(pairs: Vec<(Val, Val)>) -> Result<MapVal, MapError> {
        let mut map = MapVal::new();
        for (k, v) in pairs {
            map.insert(k, v)?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, key: Val, value: Val) -> Result<(), MapError> {
        let norm = MapKey::from_val(&key).ok_or_else(|| MapError::UnsupportedKey(key.clone()))?;
        if self.index.contains_key(&norm) {
            return Err(MapError::DuplicateKey(key));
        }
        self.index.insert(norm, self.entries.len());
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &Val) -> Option<&Val> {
        let norm = MapKey::from_val(key)?;
        self.index.get(&norm).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, key: &Val) -> bool {
        MapKey::from_val(key)
            .map(|k| self.index.contains_key(&k))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Val, Val)> {
        self.entries.iter()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Val> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Equal key sets, and an equal value under every key.
    pub fn equals(&self, other: &MapVal) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.get(k).map(|w| v.equals(w)).unwrap_or(false))
    }
}
