use crate::save::Document;
use crate::tags::{Tag, TagRegistry};
use chrono::{DateTime, Local};
use pulldown_cmark::{Event, Parser};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex, OnceLock};

pub const TIME_FMT: &str = "%d%b%y %H:%M %:z";
pub const ID_TS_WIDTH: usize = 9;
pub const UNTITLED: &str = "Untitled";

/// The persisted side of a note.
#[derive(Debug, Clone, Default)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<Arc<Tag>>,
    pub updated: Option<DateTime<Local>>,
}

impl Note {
    /// A note that has never been saved.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() { UNTITLED } else { &self.title }
    }

    pub fn updated_string(&self) -> Option<String> {
        self.updated.map(|dt| dt.format(TIME_FMT).to_string())
    }

    /// Time-ordered base62 id. Ids handed out by one process never repeat.
    pub fn generate_id() -> String {
        static LAST: OnceLock<Mutex<i64>> = OnceLock::new();
        let last = LAST.get_or_init(|| Mutex::new(0));
        let mut guard = last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Local::now().timestamp_micros();
        let ts = if now <= *guard { *guard + 1 } else { now };
        *guard = ts;
        encode_base62_width(ts.max(0) as u64, ID_TS_WIDTH)
    }
}

/// Title of a markdown text: the inline text of its first line.
pub fn title_from_markdown(text: &str) -> String {
    let first = text.lines().next().unwrap_or_default();
    let mut title = String::new();
    for event in Parser::new(first) {
        match event {
            Event::Text(t) | Event::Code(t) => title.push_str(&t),
            _ => {}
        }
    }
    title.trim().to_string()
}

/// Live editing state for the note being shown.
#[derive(Debug, Default)]
struct NoteBuffer {
    text: String,
    tag_names: Vec<String>,
    tags_changed: bool,
    modified: bool,
}

/// A note paired with its live buffer. Tag names typed into the buffer are
/// resolved against the shared registry when the note is serialized.
#[derive(Debug)]
pub struct NoteDocument {
    note: Note,
    buffer: NoteBuffer,
    registry: Rc<RefCell<TagRegistry>>,
}

impl NoteDocument {
    /// Load `note` into a fresh buffer. Loading is not an edit, so the
    /// document starts clean.
    pub fn open(note: Note, registry: Rc<RefCell<TagRegistry>>) -> Self {
        let buffer = NoteBuffer {
            text: note.content.clone(),
            tag_names: note.tags.iter().map(|t| t.name().to_string()).collect(),
            tags_changed: false,
            modified: false,
        };
        Self { note, buffer, registry }
    }

    /// Convenience for binding into a save coordinator.
    pub fn shared(note: Note, registry: Rc<RefCell<TagRegistry>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::open(note, registry)))
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn id(&self) -> &str {
        &self.note.id
    }

    pub fn text(&self) -> &str {
        &self.buffer.text
    }

    /// Title derived from the live buffer, for window chrome.
    pub fn live_title(&self) -> String {
        let title = title_from_markdown(&self.buffer.text);
        if title.is_empty() { UNTITLED.to_string() } else { title }
    }

    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.buffer.text.push_str(text);
        self.buffer.modified = true;
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer.text = text.to_string();
        self.buffer.modified = true;
    }

    pub fn set_tags<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buffer.tag_names = names.into_iter().map(Into::into).collect();
        self.buffer.tags_changed = true;
        self.buffer.modified = true;
    }

    fn resolve_tags(&mut self) {
        let mut registry = self.registry.borrow_mut();
        let mut resolved: Vec<Arc<Tag>> = Vec::new();
        for name in &self.buffer.tag_names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            // Only an empty name is rejected, and those were skipped above.
            let Ok(tag) = registry.insert_or_fetch(name, None) else {
                continue;
            };
            if !resolved.iter().any(|t| Arc::ptr_eq(t, &tag)) {
                resolved.push(tag);
            }
        }
        self.note.tags = resolved;
    }
}

impl Document for NoteDocument {
    fn is_dirty(&self) -> bool {
        self.buffer.modified
    }

    fn serialize(&mut self) {
        self.note.content = self.buffer.text.clone();
        self.note.title = title_from_markdown(&self.buffer.text);
        if self.buffer.tags_changed {
            self.resolve_tags();
            self.buffer.tags_changed = false;
        }
        self.note.updated = Some(Local::now());
    }

    fn set_clean(&mut self) {
        self.buffer.modified = false;
    }

    fn describe(&self) -> String {
        self.note.id.clone()
    }
}

fn encode_base62(num: u64) -> String {
    const ALPHABET: &[u8] =
        b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    if num == 0 {
        return "0".to_string();
    }
    let mut n = num;
    let base = ALPHABET.len() as u64;
    let mut out = Vec::new();
    while n > 0 {
        out.push(ALPHABET[(n % base) as usize] as char);
        n /= base;
    }
    out.iter().rev().collect()
}

fn encode_base62_width(num: u64, width: usize) -> String {
    format!("{:0>width$}", encode_base62(num))
}
