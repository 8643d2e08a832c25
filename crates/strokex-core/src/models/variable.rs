//! Variable specifications: one question template per extracted column.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Question template driving one extracted variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Unique key; also the output column name.
    pub key: String,

    /// Question asked about the report.
    pub question: String,

    /// Enumerated answer choices with their numeric indices.
    pub answer_choices: String,

    /// Instruction describing the expected output shape.
    pub final_output: String,

    /// Worked chain-of-thought example. `None` when the variable table has
    /// no `cot` column at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cot: Option<String>,
}

impl VariableSpec {
    /// Create a spec with only a key; other fields start empty.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = question.into();
        self
    }

    pub fn with_answer_choices(mut self, choices: impl Into<String>) -> Self {
        self.answer_choices = choices.into();
        self
    }

    pub fn with_final_output(mut self, final_output: impl Into<String>) -> Self {
        self.final_output = final_output.into();
        self
    }

    pub fn with_cot(mut self, cot: impl Into<String>) -> Self {
        self.cot = Some(cot.into());
        self
    }
}

/// Validated, ordered collection of variable specs.
///
/// Order is the input order of the spec table and fixes both the order of
/// inference calls within a report and the order of output columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSet {
    specs: Vec<VariableSpec>,
}

impl VariableSet {
    /// Validate keys and build the set.
    ///
    /// Fails on the first blank or duplicated key. Row numbers in errors are
    /// 1-based data rows (header excluded).
    pub fn new(specs: Vec<VariableSpec>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::with_capacity(specs.len());

        for (i, spec) in specs.iter().enumerate() {
            if spec.key.trim().is_empty() {
                return Err(ConfigError::EmptyKey { row: i + 1 });
            }
            if !seen.insert(spec.key.as_str()) {
                return Err(ConfigError::DuplicateKey(spec.key.clone()));
            }
        }

        Ok(Self { specs })
    }

    /// Check that every spec carries a chain-of-thought example.
    pub fn require_reasoning(&self) -> Result<(), ConfigError> {
        if self.specs.iter().all(|s| s.cot.is_some()) {
            Ok(())
        } else {
            Err(ConfigError::MissingCot)
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariableSpec> {
        self.specs.iter()
    }

    /// Look up a spec by key.
    pub fn get(&self, key: &str) -> Option<&VariableSpec> {
        self.specs.iter().find(|s| s.key == key)
    }

    /// Keys in spec order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.key.as_str())
    }
}

impl<'a> IntoIterator for &'a VariableSet {
    type Item = &'a VariableSpec;
    type IntoIter = std::slice::Iter<'a, VariableSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
