//! Debounced, exclusive save scheduling for an editing surface.
//!
//! A [`SaveCoordinator`] watches one document at a time. The first change
//! notification arms a deadline; later notifications inside the same window
//! leave that deadline alone, so the worst-case delay between the first edit
//! and the save is bounded by the configured delay. Rebinding, flushing and
//! teardown commit any pending edit before returning.

use crate::error::{Error, PersistError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(2000);

/// The editable thing a coordinator saves.
pub trait Document {
    /// True while the live content has edits that were not committed.
    fn is_dirty(&self) -> bool;

    /// Copy the live editable content into the persisted representation.
    fn serialize(&mut self);

    /// Clear the dirty flag.
    fn set_clean(&mut self);

    /// Short label for log lines.
    fn describe(&self) -> String {
        String::from("document")
    }
}

/// Storage backend a commit hands the document to.
pub trait Persist<D: ?Sized> {
    fn persist(&self, document: &D) -> Result<(), PersistError>;
}

impl<D: ?Sized, F> Persist<D> for F
where
    F: Fn(&D) -> Result<(), PersistError>,
{
    fn persist(&self, document: &D) -> Result<(), PersistError> {
        self(document)
    }
}

/// Source of "now" for deadlines.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Cell::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// When a commit clears the document's dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirtyPolicy {
    /// Clear before asking the store to persist. A failed write leaves the
    /// document looking clean.
    #[default]
    BeforePersist,
    /// Clear only once the store confirmed the write.
    AfterPersist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveConfig {
    pub delay: Duration,
    pub dirty_policy: DirtyPolicy,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { delay: DEFAULT_SAVE_DELAY, dirty_policy: DirtyPolicy::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Pending,
}

/// Coalesces change notifications for one bound document into single
/// commits.
pub struct SaveCoordinator<D: Document, P: Persist<D>, C: Clock = SystemClock> {
    document: Option<Rc<RefCell<D>>>,
    armed: bool,
    /// `None` while armed means the delay does not fit in an `Instant`; only
    /// an explicit flush commits then.
    deadline: Option<Instant>,
    store: Rc<P>,
    clock: C,
    config: SaveConfig,
}

impl<D: Document, P: Persist<D>> SaveCoordinator<D, P, SystemClock> {
    pub fn new(store: Rc<P>, config: SaveConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<D: Document, P: Persist<D>, C: Clock> SaveCoordinator<D, P, C> {
    pub fn with_clock(store: Rc<P>, config: SaveConfig, clock: C) -> Self {
        Self { document: None, armed: false, deadline: None, store, clock, config }
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&Rc<RefCell<D>>> {
        self.document.as_ref()
    }

    pub fn state(&self) -> SaveState {
        if self.armed { SaveState::Pending } else { SaveState::Idle }
    }

    /// When the armed save will run, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Watch `document` instead of the current one.
    ///
    /// A pending edit on the previous document is committed first. If that
    /// commit fails the error is returned, but the coordinator is still
    /// rebound and idle.
    pub fn bind(&mut self, document: Option<Rc<RefCell<D>>>) -> Result<(), Error> {
        let same = match (&self.document, &document) {
            (Some(current), Some(next)) => Rc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if same {
            return Ok(());
        }

        let flushed = self.flush();
        if let Some(doc) = &document {
            tracing::debug!(document = %doc.borrow().describe(), "bound document");
        }
        self.document = document;
        flushed.map(|_| ())
    }

    /// Record that the bound document changed. Returns `true` if this call
    /// armed the save deadline.
    pub fn notify_changed(&mut self) -> bool {
        if self.armed {
            return false;
        }
        let Some(doc) = &self.document else {
            return false;
        };
        if !doc.borrow().is_dirty() {
            return false;
        }

        self.armed = true;
        self.deadline = self.clock.now().checked_add(self.config.delay);
        tracing::debug!(
            document = %doc.borrow().describe(),
            delay_ms = self.config.delay.as_millis() as u64,
            "save armed"
        );
        true
    }

    /// Run the armed save if its deadline has passed. Event loops call this
    /// on every turn. Returns whether a commit happened.
    pub fn tick(&mut self) -> Result<bool, Error> {
        match self.deadline {
            Some(deadline) if self.armed && self.clock.now() >= deadline => {
                self.disarm();
                self.commit()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Commit immediately if a save is armed. Does nothing otherwise.
    pub fn flush(&mut self) -> Result<bool, Error> {
        if !self.armed {
            return Ok(false);
        }
        self.disarm();
        self.commit()?;
        Ok(true)
    }

    /// Flush and let go of the document.
    pub fn teardown(mut self) -> Result<(), Error> {
        let flushed = self.flush();
        self.document = None;
        flushed.map(|_| ())
    }

    fn disarm(&mut self) {
        self.armed = false;
        self.deadline = None;
    }

    fn commit(&mut self) -> Result<(), Error> {
        let Some(doc) = &self.document else {
            return Ok(());
        };
        let mut doc = doc.borrow_mut();
        let label = doc.describe();

        doc.serialize();
        if self.config.dirty_policy == DirtyPolicy::BeforePersist {
            doc.set_clean();
        }

        match self.store.persist(&doc) {
            Ok(()) => {
                if self.config.dirty_policy == DirtyPolicy::AfterPersist {
                    doc.set_clean();
                }
                tracing::debug!(document = %label, "saved");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(document = %label, error = %err, "save failed");
                Err(err.into())
            }
        }
    }
}

impl<D: Document, P: Persist<D>, C: Clock> Drop for SaveCoordinator<D, P, C> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::warn!(error = %err, "pending save failed during drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Draft {
        name: &'static str,
        live: String,
        saved: String,
        dirty: bool,
    }

    impl Draft {
        fn named(name: &'static str) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self { name, ..Self::default() }))
        }

        fn type_text(&mut self, text: &str) {
            self.live.push_str(text);
            self.dirty = true;
        }
    }

    impl Document for Draft {
        fn is_dirty(&self) -> bool {
            self.dirty
        }

        fn serialize(&mut self) {
            self.saved = self.live.clone();
        }

        fn set_clean(&mut self) {
            self.dirty = false;
        }

        fn describe(&self) -> String {
            self.name.to_string()
        }
    }

    #[derive(Default)]
    struct Recorder {
        commits: RefCell<Vec<(String, String)>>,
        fail: Cell<bool>,
    }

    impl Persist<Draft> for Recorder {
        fn persist(&self, doc: &Draft) -> Result<(), PersistError> {
            if self.fail.get() {
                return Err(PersistError::new(doc.name, "backend unavailable"));
            }
            self.commits
                .borrow_mut()
                .push((doc.name.to_string(), doc.saved.clone()));
            Ok(())
        }
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.commits.borrow().len()
        }
    }

    type TestCoordinator = SaveCoordinator<Draft, Recorder, Rc<ManualClock>>;

    fn setup(policy: DirtyPolicy) -> (TestCoordinator, Rc<Recorder>, Rc<ManualClock>) {
        let store = Rc::new(Recorder::default());
        let clock = Rc::new(ManualClock::new());
        let config = SaveConfig { delay: Duration::from_millis(2000), dirty_policy: policy };
        let coordinator =
            SaveCoordinator::with_clock(Rc::clone(&store), config, Rc::clone(&clock));
        (coordinator, store, clock)
    }

    #[test]
    fn test_single_change_commits_once_on_deadline() {
        let (mut co, store, clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();

        doc.borrow_mut().type_text("hello");
        assert!(co.notify_changed());
        assert_eq!(co.state(), SaveState::Pending);

        clock.advance(Duration::from_millis(1999));
        assert!(!co.tick().unwrap());
        assert_eq!(store.count(), 0);

        clock.advance(Duration::from_millis(1));
        assert!(co.tick().unwrap());
        assert_eq!(store.count(), 1);
        assert_eq!(co.state(), SaveState::Idle);
        assert!(!doc.borrow().is_dirty());

        clock.advance(Duration::from_secs(10));
        assert!(!co.tick().unwrap());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_burst_coalesces_and_commits_last_state() {
        let (mut co, store, clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();

        for word in ["one ", "two ", "three"] {
            doc.borrow_mut().type_text(word);
            co.notify_changed();
            clock.advance(Duration::from_millis(500));
            assert!(!co.tick().unwrap());
        }
        clock.advance(Duration::from_millis(500));
        assert!(co.tick().unwrap());

        let commits = store.commits.borrow();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].1, "one two three");
    }

    #[test]
    fn test_notify_while_pending_keeps_original_deadline() {
        let (mut co, _store, clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();

        doc.borrow_mut().type_text("x");
        co.notify_changed();
        let first = co.deadline().unwrap();

        clock.advance(Duration::from_millis(1500));
        doc.borrow_mut().type_text("y");
        assert!(!co.notify_changed());
        assert_eq!(co.deadline(), Some(first));
    }

    #[test]
    fn test_unrepresentable_deadline_waits_for_flush() {
        let store = Rc::new(Recorder::default());
        let clock = Rc::new(ManualClock::new());
        let config = SaveConfig { delay: Duration::MAX, ..SaveConfig::default() };
        let mut co = SaveCoordinator::with_clock(Rc::clone(&store), config, Rc::clone(&clock));
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();

        doc.borrow_mut().type_text("x");
        assert!(co.notify_changed());
        assert_eq!(co.state(), SaveState::Pending);
        assert_eq!(co.deadline(), None);

        clock.advance(Duration::from_secs(86_400));
        assert!(!co.tick().unwrap());
        assert!(!co.notify_changed());
        assert_eq!(store.count(), 0);

        assert!(co.flush().unwrap());
        assert_eq!(store.count(), 1);
        assert_eq!(co.state(), SaveState::Idle);
    }

    #[test]
    fn test_notify_ignored_without_document_or_when_clean() {
        let (mut co, _store, _clock) = setup(DirtyPolicy::BeforePersist);
        assert!(!co.notify_changed());

        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        assert!(!co.notify_changed());
        assert_eq!(co.state(), SaveState::Idle);
    }

    #[test]
    fn test_flush_idle_is_noop() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        assert!(!co.flush().unwrap());
        co.bind(Some(Draft::named("a"))).unwrap();
        assert!(!co.flush().unwrap());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_flush_pending_commits_and_is_idempotent() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("x");
        co.notify_changed();

        assert!(co.flush().unwrap());
        assert!(!co.flush().unwrap());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_rebind_flushes_old_document_only() {
        let (mut co, store, clock) = setup(DirtyPolicy::BeforePersist);
        let old = Draft::named("old");
        let new = Draft::named("new");
        co.bind(Some(Rc::clone(&old))).unwrap();
        old.borrow_mut().type_text("draft");
        co.notify_changed();

        co.bind(Some(Rc::clone(&new))).unwrap();
        assert_eq!(co.state(), SaveState::Idle);
        assert_eq!(
            *store.commits.borrow(),
            vec![("old".to_string(), "draft".to_string())]
        );

        clock.advance(Duration::from_secs(5));
        assert!(!co.tick().unwrap());
        assert_eq!(store.count(), 1);

        new.borrow_mut().type_text("fresh");
        co.notify_changed();
        clock.advance(Duration::from_secs(2));
        assert!(co.tick().unwrap());
        assert_eq!(store.commits.borrow()[1].0, "new");
    }

    #[test]
    fn test_rebind_same_document_is_noop() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("x");
        co.notify_changed();

        co.bind(Some(Rc::clone(&doc))).unwrap();
        assert_eq!(co.state(), SaveState::Pending);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_unbind_flushes() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("x");
        co.notify_changed();

        co.bind(None).unwrap();
        assert!(co.document().is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_teardown_pending_commits_once() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("bye");
        co.notify_changed();

        co.teardown().unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(doc.borrow().saved, "bye");
        assert_eq!(Rc::strong_count(&doc), 1);
    }

    #[test]
    fn test_teardown_idle_commits_nothing() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        co.bind(Some(Draft::named("a"))).unwrap();
        co.teardown().unwrap();

        let (co, store2, _clock) = setup(DirtyPolicy::BeforePersist);
        co.teardown().unwrap();
        assert_eq!(store.count() + store2.count(), 0);
    }

    #[test]
    fn test_drop_flushes_pending_edit() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("unsaved");
        co.notify_changed();

        drop(co);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_persist_failure_surfaces_and_clears_dirty_first() {
        let (mut co, store, clock) = setup(DirtyPolicy::BeforePersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("x");
        co.notify_changed();

        store.fail.set(true);
        clock.advance(Duration::from_secs(2));
        let err = co.tick().unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
        assert_eq!(co.state(), SaveState::Idle);
        assert!(!doc.borrow().is_dirty());
        assert_eq!(doc.borrow().saved, "x");
    }

    #[test]
    fn test_after_persist_policy_keeps_dirty_on_failure() {
        let (mut co, store, clock) = setup(DirtyPolicy::AfterPersist);
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("x");
        co.notify_changed();

        store.fail.set(true);
        clock.advance(Duration::from_secs(2));
        assert!(co.tick().is_err());
        assert!(doc.borrow().is_dirty());

        store.fail.set(false);
        assert!(co.notify_changed());
        clock.advance(Duration::from_secs(2));
        assert!(co.tick().unwrap());
        assert!(!doc.borrow().is_dirty());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_rebind_reports_flush_failure_but_still_rebinds() {
        let (mut co, store, _clock) = setup(DirtyPolicy::BeforePersist);
        let old = Draft::named("old");
        let new = Draft::named("new");
        co.bind(Some(Rc::clone(&old))).unwrap();
        old.borrow_mut().type_text("x");
        co.notify_changed();

        store.fail.set(true);
        assert!(co.bind(Some(Rc::clone(&new))).is_err());
        assert!(Rc::ptr_eq(co.document().unwrap(), &new));
        assert_eq!(co.state(), SaveState::Idle);
    }

    #[test]
    fn test_closure_store() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let store = Rc::new(move |_: &Draft| -> Result<(), PersistError> {
            counter.set(counter.get() + 1);
            Ok(())
        });
        let mut co = SaveCoordinator::new(store, SaveConfig::default());
        let doc = Draft::named("a");
        co.bind(Some(Rc::clone(&doc))).unwrap();
        doc.borrow_mut().type_text("x");
        co.notify_changed();
        co.teardown().unwrap();
        assert_eq!(hits.get(), 1);
    }
}
