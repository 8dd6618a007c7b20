//! Bounded LORA selection with per-adapter weights

use thiserror::Error;

/// Upper bound on simultaneously selected adapters
pub const MAX_LORAS: usize = 3;

/// Weight given to a freshly selected adapter
pub const DEFAULT_WEIGHT: f64 = 0.7;

pub const MIN_WEIGHT: f64 = 0.1;
pub const MAX_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LoraPick {
    pub id: String,
    pub weight: f64,
}

/// What a toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoraToggle {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoraError {
    #[error("at most {MAX_LORAS} LORAs can be selected")]
    CapacityReached,
    #[error("LORA {0} is not selected")]
    NotSelected(String),
    #[error("weight must be between {MIN_WEIGHT} and {MAX_WEIGHT}")]
    WeightOutOfRange(f64),
}

/// Selected adapters in insertion order. Never holds more than [`MAX_LORAS`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoraSelection {
    picks: Vec<LoraPick>,
}

impl LoraSelection {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.picks.iter().any(|p| p.id == id)
    }

    #[cfg(test)]
    pub fn weight(&self, id: &str) -> Option<f64> {
        self.picks.iter().find(|p| p.id == id).map(|p| p.weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoraPick> {
        self.picks.iter()
    }

    /// Remove `id` if selected, otherwise add it at the default weight.
    /// Adding past capacity fails and leaves the selection untouched.
    pub fn toggle(&mut self, id: &str) -> Result<LoraToggle, LoraError> {
        if let Some(pos) = self.picks.iter().position(|p| p.id == id) {
            self.picks.remove(pos);
            return Ok(LoraToggle::Removed);
        }
        if self.picks.len() >= MAX_LORAS {
            return Err(LoraError::CapacityReached);
        }
        self.picks.push(LoraPick {
            id: id.to_string(),
            weight: DEFAULT_WEIGHT,
        });
        Ok(LoraToggle::Added)
    }

    /// Change the weight of an already selected adapter.
    pub fn set_weight(&mut self, id: &str, weight: f64) -> Result<(), LoraError> {
        if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
            return Err(LoraError::WeightOutOfRange(weight));
        }
        let pick = self
            .picks
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| LoraError::NotSelected(id.to_string()))?;
        pick.weight = weight;
        Ok(())
    }

    /// `<lora:ID:WEIGHT>` markers joined by spaces
    pub fn prompt_markers(&self) -> String {
        self.picks
            .iter()
            .map(|p| format!("<lora:{}:{}>", p.id, p.weight))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Comma-joined ids, empty when nothing is selected
    pub fn joined_ids(&self) -> String {
        self.picks
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Comma-joined weights, parallel to [`Self::joined_ids`]
    pub fn joined_weights(&self) -> String {
        self.picks
            .iter()
            .map(|p| p.weight.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
