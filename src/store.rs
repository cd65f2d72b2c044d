use crate::error::PersistError;
use crate::note::{Note, NoteDocument};
use crate::save::Persist;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// Keeps the last saved copy of every note in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    notes: RefCell<BTreeMap<String, Note>>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Note> {
        self.notes.borrow().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.notes.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.notes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.borrow().is_empty()
    }

    /// Total number of successful writes, including overwrites.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl Persist<NoteDocument> for MemoryStore {
    fn persist(&self, document: &NoteDocument) -> Result<(), PersistError> {
        let note = document.note();
        if note.id.is_empty() {
            return Err(PersistError::new("<unnamed>", "note has no id"));
        }
        self.notes.borrow_mut().insert(note.id.clone(), note.clone());
        self.saves.set(self.saves.get() + 1);
        tracing::trace!(id = %note.id, saves = self.saves.get(), "note stored");
        Ok(())
    }
}
