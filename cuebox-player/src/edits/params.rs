//! Per-instance edit parameter bag
//!
//! Edit modules coordinate through string-keyed values on the instance they
//! are bound to (the delay edit records whether delays repeat on loops, the
//! duration calculation reads it back). A fresh or reset bag holds only the
//! `dynamicTime = true` seed.

use std::collections::HashMap;

/// Skip the clip's dynamic start offset when playing
pub const DYNAMIC_TIME: &str = "dynamicTime";
/// Initial delay in seconds
pub const DELAY: &str = "delay";
/// Re-apply the delay on every loop
pub const LOOP_WITH_DELAYS: &str = "loopWithDelays";
/// Configured loop count, -1 for infinite
pub const LOOP_COUNT: &str = "loopCount";
/// Return the sequence to the pool on completion
pub const RECYCLE: &str = "recycle";

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Float(f32),
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditParameters {
    values: HashMap<String, ParamValue>,
}

impl EditParameters {
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert(DYNAMIC_TIME.to_string(), ParamValue::Bool(true));
        Self { values }
    }

    pub fn set(&mut self, key: &str, value: ParamValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ParamValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.values.get(key) {
            Some(ParamValue::Float(f)) => Some(*f),
            Some(ParamValue::Int(i)) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ParamValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Drop everything except the `dynamicTime = true` seed
    pub fn reset(&mut self) {
        self.values.clear();
        self.values
            .insert(DYNAMIC_TIME.to_string(), ParamValue::Bool(true));
    }

    /// True when the bag holds exactly the seed
    pub fn is_seed_only(&self) -> bool {
        self.values.len() == 1 && self.get_bool(DYNAMIC_TIME) == Some(true)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for EditParameters {
    fn default() -> Self {
        Self::new()
    }
}
