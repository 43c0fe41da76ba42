use std::cell::RefCell;

use crate::model::Annotation;

/// Host-side objects remembered per annotation identity, so a host gets its
/// own instances back from display primitives.
///
/// A draft handed to the pre-create hook is dropped again when the editor
/// closes without the host creating it.
pub struct IdentityCache<V> {
    known: RefCell<Vec<(Annotation, V)>>,
    draft: RefCell<Option<Annotation>>,
}

impl<V> Default for IdentityCache<V> {
    fn default() -> Self {
        Self {
            known: RefCell::new(Vec::new()),
            draft: RefCell::new(None),
        }
    }
}

impl<V: Clone> IdentityCache<V> {
    pub fn get(&self, annotation: &Annotation) -> Option<V> {
        self.known
            .borrow()
            .iter()
            .find(|(known, _)| known.same_identity(annotation))
            .map(|(_, value)| value.clone())
    }

    pub fn remember(&self, annotation: &Annotation, value: V) {
        let mut known = self.known.borrow_mut();
        known.retain(|(a, _)| !a.same_identity(annotation));
        known.push((annotation.clone(), value));
    }

    pub fn forget(&self, annotation: &Annotation) {
        self.known
            .borrow_mut()
            .retain(|(a, _)| !a.same_identity(annotation));
    }

    pub fn remember_draft(&self, annotation: &Annotation, value: V) {
        self.remember(annotation, value);
        self.draft.replace(Some(annotation.clone()));
    }

    /// The host created `annotation`; a pending draft is now settled.
    pub fn created(&self, annotation: &Annotation, value: V) {
        if let Some(draft) = self.draft.take() {
            self.forget(&draft);
        }
        self.remember(annotation, value);
    }

    /// The editor closed. A draft that was never created is forgotten.
    pub fn editor_hidden(&self) {
        if let Some(draft) = self.draft.take() {
            log::debug!("Forgetting uncreated draft on {}", draft.target);
            self.forget(&draft);
        }
    }

    pub fn len(&self) -> usize {
        self.known.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.borrow().is_empty()
    }
}
