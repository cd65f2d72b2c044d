use crate::args::{parse_tag_spec, split_tag_list};
use crate::error::PersistError;
use crate::formatting::FormatContext;
use crate::note::{Note, NoteDocument};
use crate::save::{Persist, SaveConfig, SaveCoordinator};
use crate::store::MemoryStore;
use crate::tags::{TagEvent, TagRegistry};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::io::BufRead;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

/// Register every `name[=color]` spec in order and print the result.
pub fn register_tags(specs: Vec<String>, ctx: &FormatContext) -> Result<(), Box<dyn Error>> {
    if specs.is_empty() {
        return Err("Provide at least one tag, e.g. `notekeep tags Work=#ff0000 Home`".into());
    }

    let mut registry = TagRegistry::new();
    let added = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&added);
    registry.subscribe(move |_: &TagEvent| counter.set(counter.get() + 1));

    for spec in &specs {
        let (name, color) = parse_tag_spec(spec)?;
        let tag = registry.insert_or_fetch(&name, color)?;
        if tag.name() != name {
            tracing::info!(requested = %name, existing = %tag.name(), "merged into existing tag");
        }
    }

    let width = registry.iter().map(|t| t.name().chars().count()).max().unwrap_or(0);
    for tag in registry.as_sequence() {
        println!("{}", ctx.format_tag_row(tag, width));
    }
    println!(
        "{} {}",
        ctx.format_header("sorted:"),
        ctx.format_tag_list(registry.as_sequence())
    );
    for line in ctx.format_chips(&registry.sorted()) {
        println!("{line}");
    }

    let added = added.get();
    println!(
        "{}",
        ctx.format_muted(&format!("{} added, {} merged", added, specs.len() - added))
    );
    Ok(())
}

/// Options for an interactive edit session.
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    pub id: Option<String>,
    pub save: SaveConfig,
}

/// Drive a save coordinator from edit lines.
///
/// `:tags a, b` replaces the note's tags, `:wait <ms>` lets time pass,
/// `:switch [id]` moves to a fresh note, `:flush` forces a save. Anything
/// else is appended to the note text. Returns the number of saves.
pub fn edit_session<R: BufRead>(
    input: R,
    options: EditOptions,
    ctx: &FormatContext,
) -> Result<usize, Box<dyn Error>> {
    let registry = Rc::new(RefCell::new(TagRegistry::new()));
    let store = Rc::new(MemoryStore::new());

    let sink = Rc::clone(&store);
    let report = move |doc: &NoteDocument| -> Result<(), PersistError> {
        sink.persist(doc)?;
        let note = doc.note();
        println!(
            "saved {} \"{}\" tags: {}",
            note.id,
            note.display_title(),
            ctx.format_tag_list(&note.tags)
        );
        Ok(())
    };
    let mut coordinator = SaveCoordinator::new(Rc::new(report), options.save);

    let first_id = options.id.unwrap_or_else(Note::generate_id);
    let mut current = NoteDocument::shared(Note::new(first_id), Rc::clone(&registry));
    coordinator.bind(Some(Rc::clone(&current)))?;

    for line in input.lines() {
        let line = line?;
        if let Some(rest) = line.strip_prefix(":tags") {
            current.borrow_mut().set_tags(split_tag_list(rest));
            coordinator.notify_changed();
        } else if let Some(rest) = line.strip_prefix(":wait") {
            let ms: u64 = rest
                .trim()
                .parse()
                .map_err(|_| format!("`:wait` expects milliseconds, got {:?}", rest.trim()))?;
            thread::sleep(Duration::from_millis(ms));
        } else if let Some(rest) = line.strip_prefix(":switch") {
            let id = match rest.trim() {
                "" => Note::generate_id(),
                id => id.to_string(),
            };
            let next = NoteDocument::shared(Note::new(id), Rc::clone(&registry));
            match coordinator.bind(Some(Rc::clone(&next))) {
                Ok(()) => current = next,
                Err(err) => {
                    eprintln!("warning: {err}; staying on {:?}", current.borrow().id());
                    coordinator.bind(Some(Rc::clone(&current)))?;
                    coordinator.notify_changed();
                }
            }
        } else if line.trim() == ":flush" {
            warn_on_err(coordinator.flush());
        } else {
            current.borrow_mut().insert_text(&format!("{line}\n"));
            coordinator.notify_changed();
        }
        warn_on_err(coordinator.tick());
    }

    coordinator.teardown()?;
    println!("registry: {}", ctx.format_tag_list(registry.borrow().as_sequence()));
    Ok(store.save_count())
}

fn warn_on_err<T>(result: Result<T, crate::Error>) {
    if let Err(err) = result {
        eprintln!("warning: {err}");
    }
}
