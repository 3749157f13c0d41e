//! Relation patch planning
//!
//! The planner walks the requested models and their ancestors and queues
//! one [`PatchEntry`] per attribute that would otherwise reach the
//! database: `save`, the `objects` manager, and every relation accessor the
//! model declares itself. Relations inherited from an ancestor are left to
//! the ancestor's own entries.

use crate::cache::IdentityKey;
use crate::chain::PatcherChain;
use crate::config::MockConfig;
use crate::patch::{PatchEntry, Replacement};
use crate::walker::walk_models;
use mockrel_model::{Attribute, Cardinality, ModelRef, RelationField, OBJECTS, SAVE};
use std::collections::HashSet;
use tracing::debug;

/// Builds patcher chains for sets of models
#[derive(Debug, Clone, Default)]
pub struct RelationPatchPlanner {
    config: MockConfig,
}

impl RelationPatchPlanner {
    /// Create planner
    #[must_use]
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Planner configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Chain substituting every database-facing attribute of `models`
    #[must_use]
    pub fn plan(&self, models: &[ModelRef]) -> PatcherChain {
        PatcherChain::from_entries(self.entries(models), &self.config)
    }

    /// Planned entries in activation order
    ///
    /// A model is skipped when its `save` is already a stand-in, or when it
    /// was reached earlier in the same walk.
    #[must_use]
    pub fn entries(&self, models: &[ModelRef]) -> Vec<PatchEntry> {
        let mut planned = HashSet::new();
        let mut entries = Vec::new();

        for model in walk_models(models) {
            if !planned.insert(IdentityKey::of(&model)) {
                continue;
            }
            if model.save_is_stubbed() {
                debug!(model = model.name(), "save already substituted; skipping");
                continue;
            }

            let before = entries.len();
            entries.push(PatchEntry::new(&model, SAVE, Replacement::SaveStub));
            if model.has_attribute(OBJECTS) {
                entries.push(PatchEntry::new(&model, OBJECTS, Replacement::FakeManager));
            }
            self.plan_relations(&model, &mut entries);

            debug!(
                model = model.name(),
                patches = entries.len() - before,
                "planned model patches"
            );
        }
        entries
    }

    fn plan_relations(&self, model: &ModelRef, entries: &mut Vec<PatchEntry>) {
        let mut seen = HashSet::new();
        let relations = model
            .all_related_objects()
            .into_iter()
            .chain(model.all_many_to_many());

        for field in relations {
            let name = self.accessor_name(model, &field);
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(Attribute::Relation(current)) = model.own_attribute(&name) else {
                continue;
            };
            let replacement = match field.cardinality() {
                Cardinality::OneToOne => Replacement::OneToOne(current),
                Cardinality::OneToMany | Cardinality::ManyToMany => {
                    Replacement::OneToMany(current)
                }
            };
            entries.push(PatchEntry::new(model, name, replacement));
        }
    }

    /// Attribute name the relation is bound under on `model`
    fn accessor_name(&self, model: &ModelRef, field: &RelationField) -> String {
        let name = field.name();
        if model.declares(name) || !field.cardinality().is_to_many() {
            name.to_string()
        } else {
            format!("{name}{}", self.config.related_set_suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockrel_model::relation::{foreign_key, many_to_many};
    use mockrel_model::ModelClass;

    fn labels(entries: &[PatchEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| format!("{}.{}", e.target().name(), e.attribute()))
            .collect()
    }

    #[test]
    fn default_reverse_name_gets_suffix() {
        let author = ModelClass::builder("Author").build();
        let book = ModelClass::builder("Book").build();
        foreign_key(&book, "author", &author, None);

        let entries = RelationPatchPlanner::default().entries(&[author]);
        assert_eq!(labels(&entries), ["Author.save", "Author.objects", "Author.book_set"]);
    }

    #[test]
    fn related_name_used_verbatim() {
        let order = ModelClass::builder("Order").build();
        let item = ModelClass::builder("LineItem").build();
        foreign_key(&item, "order", &order, Some("items"));

        let entries = RelationPatchPlanner::default().entries(&[order]);
        assert_eq!(labels(&entries), ["Order.save", "Order.objects", "Order.items"]);
        assert!(matches!(entries[2].replacement(), Replacement::OneToMany(_)));
    }

    #[test]
    fn abstract_model_without_manager() {
        let base = ModelClass::builder("Base").without_manager().build();
        let entries = RelationPatchPlanner::default().entries(&[base]);
        assert_eq!(labels(&entries), ["Base.save"]);
    }

    #[test]
    fn forward_many_to_many_is_to_many() {
        let post = ModelClass::builder("Post").build();
        let tag = ModelClass::builder("Tag").build();
        many_to_many(&post, "tags", &tag, None);

        let entries = RelationPatchPlanner::default().entries(&[post, tag]);
        assert_eq!(
            labels(&entries),
            ["Post.save", "Post.objects", "Post.tags", "Tag.save", "Tag.objects", "Tag.post_set"]
        );
        assert!(matches!(entries[2].replacement(), Replacement::OneToMany(_)));
    }

    #[test]
    fn custom_suffix() {
        let author = ModelClass::builder("Author").build();
        let book = ModelClass::builder("Book").build();
        foreign_key(&book, "author", &author, None);
        // Rebind under the custom suffix so the accessor resolves
        let bound = author.remove_attribute("book_set").unwrap();
        author.replace_attribute("book_list", bound);

        let config = MockConfig::default();
        let planner = RelationPatchPlanner::new(MockConfig {
            related_set_suffix: "_list".into(),
            ..config
        });
        let entries = planner.entries(&[author]);
        assert_eq!(labels(&entries).last().unwrap(), "Author.book_list");
    }
}
