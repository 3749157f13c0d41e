//! Single-attribute substitutions
//!
//! A [`PatchEntry`] is a planned substitution of one attribute on one model
//! class. [`AttributePatch`] applies it by recording the class's own binding
//! before replacing it, and restores exactly that binding on stop. When the
//! attribute was inherited rather than declared, stop removes the
//! substitute so the inherited binding shows through again.

use crate::accessor::{OneToManyAccessor, OneToOneAccessor};
use crate::error::{PatchError, PatchResult};
use mockrel_model::{
    Attribute, Manager, MockSet, ModelRef, RelationDescriptor, SaveOp, SaveStub,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Class and attribute a patch applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchTarget {
    /// Class name
    pub target: String,
    /// Attribute name
    pub attribute: String,
}

impl PatchTarget {
    /// Create target
    #[must_use]
    pub fn new(target: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute)
    }
}

/// Substitution created by starting a patch
#[derive(Debug, Clone)]
pub struct PatchHandle {
    target: PatchTarget,
    replacement: Attribute,
}

impl PatchHandle {
    /// Create handle
    #[must_use]
    pub fn new(target: PatchTarget, replacement: Attribute) -> Self {
        Self {
            target,
            replacement,
        }
    }

    /// Where the substitution was installed
    #[inline]
    #[must_use]
    pub fn target(&self) -> &PatchTarget {
        &self.target
    }

    /// Installed binding
    #[inline]
    #[must_use]
    pub fn replacement(&self) -> &Attribute {
        &self.replacement
    }

    /// Save stand-in, if this handle is one
    #[must_use]
    pub fn save_stub(&self) -> Option<Arc<SaveStub>> {
        match &self.replacement {
            Attribute::Save(SaveOp::Stub(stub)) => Some(Arc::clone(stub)),
            _ => None,
        }
    }

    /// Fake manager collection, if this handle is one
    #[must_use]
    pub fn fake_set(&self) -> Option<MockSet> {
        match &self.replacement {
            Attribute::Manager(Manager::Fake(set)) => Some(set.clone()),
            _ => None,
        }
    }
}

/// One activatable substitution
pub trait Patch: Send + Sync + fmt::Debug {
    /// Where this patch applies
    fn target(&self) -> PatchTarget;

    /// Apply the substitution
    fn start(&self) -> PatchResult<PatchHandle>;

    /// Revert the substitution
    fn stop(&self) -> PatchResult<()>;
}

/// How the substitute binding is produced on each start
#[derive(Debug, Clone)]
pub enum Replacement {
    /// Fresh `save` stand-in named `<Model>.save`
    SaveStub,
    /// Fresh fake collection named `<Model>.objects`
    FakeManager,
    /// [`OneToManyAccessor`] shadowing the given accessor
    OneToMany(Arc<dyn RelationDescriptor>),
    /// [`OneToOneAccessor`] shadowing the given accessor
    OneToOne(Arc<dyn RelationDescriptor>),
    /// Fixed binding
    Fixed(Attribute),
}

impl Replacement {
    /// Produce the binding to install on `target`
    #[must_use]
    pub fn build(&self, target: &ModelRef) -> Attribute {
        match self {
            Self::SaveStub => Attribute::Save(SaveOp::Stub(Arc::new(SaveStub::new(format!(
                "{}.save",
                target.name()
            ))))),
            Self::FakeManager => Attribute::Manager(Manager::Fake(MockSet::named(
                target,
                format!("{}.objects", target.name()),
            ))),
            Self::OneToMany(original) => {
                Attribute::Relation(Arc::new(OneToManyAccessor::new(Arc::clone(original))))
            }
            Self::OneToOne(original) => {
                Attribute::Relation(Arc::new(OneToOneAccessor::new(Arc::clone(original))))
            }
            Self::Fixed(attr) => attr.clone(),
        }
    }
}

/// Planned substitution of one attribute on one model class
#[derive(Debug, Clone)]
pub struct PatchEntry {
    target: ModelRef,
    attribute: String,
    replacement: Replacement,
}

impl PatchEntry {
    /// Create entry
    #[must_use]
    pub fn new(target: &ModelRef, attribute: impl Into<String>, replacement: Replacement) -> Self {
        Self {
            target: Arc::clone(target),
            attribute: attribute.into(),
            replacement,
        }
    }

    /// Class to patch
    #[inline]
    #[must_use]
    pub fn target(&self) -> &ModelRef {
        &self.target
    }

    /// Attribute to patch
    #[inline]
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Substitute producer
    #[inline]
    #[must_use]
    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    /// Activatable patch for this entry
    #[inline]
    #[must_use]
    pub fn into_patch(self) -> AttributePatch {
        AttributePatch::new(self)
    }
}

#[derive(Debug)]
enum Slot {
    Idle,
    Active { previous: Option<Attribute> },
}

/// Registry-and-restore patch of one class attribute
#[derive(Debug)]
pub struct AttributePatch {
    entry: PatchEntry,
    slot: Mutex<Slot>,
}

impl AttributePatch {
    /// Wrap a planned entry
    #[must_use]
    pub fn new(entry: PatchEntry) -> Self {
        Self {
            entry,
            slot: Mutex::new(Slot::Idle),
        }
    }

    /// Planned entry
    #[inline]
    #[must_use]
    pub fn entry(&self) -> &PatchEntry {
        &self.entry
    }

    /// Check if currently applied
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Active { .. })
    }
}

impl Patch for AttributePatch {
    fn target(&self) -> PatchTarget {
        PatchTarget::new(self.entry.target.name(), &self.entry.attribute)
    }

    fn start(&self) -> PatchResult<PatchHandle> {
        let mut slot = self.slot.lock();
        let model = &self.entry.target;
        let attribute = &self.entry.attribute;

        if matches!(*slot, Slot::Active { .. }) {
            return Err(PatchError::AlreadyStarted {
                target: model.name().to_string(),
                attribute: attribute.clone(),
            });
        }
        if !model.has_attribute(attribute) {
            return Err(PatchError::attribute_not_found(model.name(), attribute));
        }

        let replacement = self.entry.replacement.build(model);
        let previous = model.replace_attribute(attribute, replacement.clone());
        *slot = Slot::Active { previous };
        tracing::trace!(model = model.name(), attribute = %attribute, "patched attribute");

        Ok(PatchHandle::new(self.target(), replacement))
    }

    fn stop(&self) -> PatchResult<()> {
        let mut slot = self.slot.lock();
        let model = &self.entry.target;
        let attribute = &self.entry.attribute;

        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Idle => Err(PatchError::NotStarted {
                target: model.name().to_string(),
                attribute: attribute.clone(),
            }),
            Slot::Active { previous } => {
                match previous {
                    Some(original) => {
                        model.replace_attribute(attribute, original);
                    }
                    None => {
                        model.remove_attribute(attribute);
                    }
                }
                tracing::trace!(model = model.name(), attribute = %attribute, "restored attribute");
                Ok(())
            }
        }
    }
}
