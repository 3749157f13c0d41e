//! Model graph traversal
//!
//! [`ModelWalk`] yields each requested model followed, depth-first, by its
//! inheritance ancestors. A model reachable through several lineages is
//! yielded once per occurrence; the planner deduplicates.

use mockrel_model::ModelRef;
use std::sync::Arc;

/// Lazy depth-first walk over models and their ancestors
#[derive(Debug, Clone)]
pub struct ModelWalk {
    stack: Vec<ModelRef>,
}

impl ModelWalk {
    /// Walk `models` in order
    #[must_use]
    pub fn new(models: &[ModelRef]) -> Self {
        Self {
            stack: models.iter().rev().cloned().collect(),
        }
    }
}

impl Iterator for ModelWalk {
    type Item = ModelRef;

    fn next(&mut self) -> Option<Self::Item> {
        let model = self.stack.pop()?;
        self.stack.extend(model.parents().iter().rev().map(Arc::clone));
        Some(model)
    }
}

/// Every model in `models` plus all their ancestors
#[inline]
#[must_use]
pub fn walk_models(models: &[ModelRef]) -> ModelWalk {
    ModelWalk::new(models)
}
