use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Synthesizer;
use crate::error::{Error, Result};

/// Named parameter values applied once, before the first block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<String, f32>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f32) {
        self.values.insert(name.into(), value);
    }

    /// Parse and insert a `Name=Value` assignment.
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected Name=Value, got '{assignment}'")))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Config(format!("missing parameter name in '{assignment}'")));
        }

        let value: f32 = value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for parameter '{name}': '{value}'")))?;

        self.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Push every value into `synth`. Returns how many names it accepted.
    pub fn apply_to<S: Synthesizer + ?Sized>(&self, synth: &mut S) -> usize {
        let mut applied = 0;
        for (name, value) in self.iter() {
            if synth.set_parameter(name, value) {
                debug!("Set parameter: {name} = {value}");
                applied += 1;
            } else {
                warn!("Unknown parameter '{name}', ignored");
            }
        }
        debug!("Applied {applied} of {} parameters", self.len());
        applied
    }
}

impl<K: Into<String>> FromIterator<(K, f32)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, f32)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}
