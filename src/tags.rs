//! Case-insensitive, deduplicated tag registry.
//!
//! Every tag is identified by its case-folded name. The registry interns
//! those keys so that two tags can be told apart by pointer identity of the
//! key instead of repeated string comparison.

use crate::Error;
use crate::color::{Rgba, palette_color};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Fold a tag name into its registry key.
///
/// Each character is upper-cased and then lower-cased on its own, so there
/// are no context rules: final `ς` and `σ` share a key, and `ß` folds to
/// `ss` like `SS` does.
pub fn fold_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_uppercase)
        .flat_map(char::to_lowercase)
        .collect()
}

/// A label that notes can carry. Only [`TagRegistry::insert_or_fetch`]
/// creates these.
pub struct Tag {
    name: String,
    key: Arc<str>,
    color: Option<Rgba>,
}

impl Tag {
    /// The name as it was first supplied.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The case-folded intern key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn color(&self) -> Option<Rgba> {
        self.color
    }

    /// Color to paint the tag with: its own, or a stable palette pick.
    pub fn display_color(&self) -> (u8, u8, u8) {
        self.color.map_or_else(|| palette_color(&self.key), |c| c.to_rgb8())
    }

    fn same_key(&self, key: &Arc<str>) -> bool {
        Arc::ptr_eq(&self.key, key)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("name", &self.name)
            .field("key", &&*self.key)
            .field("color", &self.color)
            .finish()
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Tag {}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

/// Total order over tags: byte-wise comparison of the case-folded keys.
pub fn compare(a: &Tag, b: &Tag) -> Ordering {
    a.key.as_bytes().cmp(b.key.as_bytes())
}

/// Display names sorted by key and joined with `", "`, or `None` when there
/// is nothing to show.
pub fn subtitle(tags: &[Arc<Tag>]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    let mut sorted: Vec<&Arc<Tag>> = tags.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));
    let names: Vec<&str> = sorted.iter().map(|t| t.name()).collect();
    Some(names.join(", "))
}

/// Change notification delivered to registry observers.
#[derive(Debug, Clone)]
pub enum TagEvent {
    Inserted { position: usize, tag: Arc<Tag> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&TagEvent)>;

/// Ordered set of tags with case-insensitive identity.
#[derive(Default)]
pub struct TagRegistry {
    tags: Vec<Arc<Tag>>,
    interned: HashSet<Arc<str>>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the tag named `name`, creating it if no case-fold-equal tag
    /// exists yet.
    ///
    /// When the tag already exists `color` is ignored: the first insert
    /// decides the color for good.
    pub fn insert_or_fetch(
        &mut self,
        name: &str,
        color: Option<Rgba>,
    ) -> Result<Arc<Tag>, Error> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("tag name must not be empty".into()));
        }

        let key = self.intern(fold_name(name));
        if let Some(position) = self.position_of(&key) {
            return Ok(Arc::clone(&self.tags[position]));
        }

        let tag = Arc::new(Tag { name: name.to_string(), key, color });
        let position = self.tags.len();
        self.tags.push(Arc::clone(&tag));
        tracing::debug!(name = %tag.name, key = %tag.key, position, "tag registered");

        self.emit(&TagEvent::Inserted { position, tag: Arc::clone(&tag) });
        Ok(tag)
    }

    /// Position of the tag whose key matches `name` once folded.
    ///
    /// This never grows the intern table: a key that was never interned
    /// cannot belong to any tag.
    pub fn find(&self, name: &str) -> Option<usize> {
        let key = self.interned.get(fold_name(name).as_str())?;
        self.position_of(key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Tag>> {
        self.find(name).map(|i| Arc::clone(&self.tags[i]))
    }

    /// Live, read-only view of the tags in insertion order.
    pub fn as_sequence(&self) -> &[Arc<Tag>] {
        &self.tags
    }

    /// Point-in-time copy of the sequence.
    pub fn snapshot(&self) -> Vec<Arc<Tag>> {
        self.tags.clone()
    }

    /// Tags ordered by [`compare`].
    pub fn sorted(&self) -> Vec<Arc<Tag>> {
        let mut tags = self.snapshot();
        tags.sort_by(|a, b| compare(a, b));
        tags
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tag>> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of distinct keys in the intern table.
    pub fn interned_len(&self) -> usize {
        self.interned.len()
    }

    /// Register a callback that runs after every newly inserted tag.
    pub fn subscribe(&mut self, observer: impl FnMut(&TagEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Drop an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn intern(&mut self, folded: String) -> Arc<str> {
        if let Some(existing) = self.interned.get(folded.as_str()) {
            return Arc::clone(existing);
        }
        tracing::trace!(key = %folded, "interning tag key");
        let key: Arc<str> = Arc::from(folded);
        self.interned.insert(Arc::clone(&key));
        key
    }

    // Linear scan; registries hold tens of tags, not millions.
    fn position_of(&self, key: &Arc<str>) -> Option<usize> {
        self.tags.iter().position(|tag| tag.same_key(key))
    }

    fn emit(&mut self, event: &TagEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.tags)
            .field("observers", &self.observers.len())
            .finish()
    }
}
