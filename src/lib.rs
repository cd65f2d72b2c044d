//! Tag registry and debounced save coordination for a note editor.
//!
//! [`TagRegistry`] hands out one shared [`Tag`] per case-insensitive name.
//! [`SaveCoordinator`] turns a stream of "document changed" notifications
//! into a single deferred commit per burst, and commits any pending edit
//! before it is rebound or torn down.

pub mod args;
pub mod color;
pub mod config;
pub mod error;
pub mod formatting;
pub mod note;
pub mod operations;
pub mod save;
pub mod store;
pub mod tags;

pub use color::Rgba;
pub use config::Config;
pub use error::{Error, PersistError};
pub use note::{Note, NoteDocument};
pub use save::{
    Clock, DirtyPolicy, Document, ManualClock, Persist, SaveConfig, SaveCoordinator, SaveState,
    SystemClock,
};
pub use store::MemoryStore;
pub use tags::{Tag, TagEvent, TagRegistry, compare, subtitle};

use args::ArgParser;
use formatting::FormatContext;
use operations::EditOptions;
use std::env;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn entry() -> Result<(), Box<dyn StdError>> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_help();
        return Ok(());
    }

    init_tracing();
    let config = Config::from_env()?;

    let cmd = args.remove(0);
    match cmd.as_str() {
        "tags" => {
            let ctx = FormatContext::new(config.use_color);
            operations::register_tags(args, &ctx)?;
        }
        "edit" => edit(args, config)?,
        "help" | "--help" | "-h" => print_help(),
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
        }
    }

    Ok(())
}

fn edit(args: Vec<String>, config: Config) -> Result<(), Box<dyn StdError>> {
    let mut options = EditOptions { id: None, save: config.save };
    let mut use_color = config.use_color;

    let mut parser = ArgParser::new(args, "edit");
    while let Some(arg) = parser.next() {
        match arg.as_str() {
            "--id" => options.id = Some(parser.extract_value("--id")?),
            "--delay" => {
                options.save.delay = Duration::from_millis(parser.extract_millis("--delay")?);
            }
            "--after-persist" => options.save.dirty_policy = DirtyPolicy::AfterPersist,
            "--plain" => use_color = false,
            other => return Err(format!("Unexpected argument for edit: {other}").into()),
        }
    }

    let ctx = FormatContext::new(use_color);
    let stdin = io::stdin();
    operations::edit_session(stdin.lock(), options, &ctx)?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(io::stderr))
        .try_init();
}

fn print_help() {
    println!(
        "\
notekeep: tag registry and save scheduling playground
Usage:
  notekeep tags <name[=color]>...   Register tags in order, then show them sorted
  notekeep edit [--id <id>] [--delay <ms>] [--after-persist] [--plain]
                                    Read edit lines from stdin. A save falls due once the
                                    delay has passed since the first unsaved edit, and runs
                                    when the next line arrives or at end of input
  notekeep help                     Show this message

Edit lines:
  :tags a, b     Replace the tags of the current note
  :wait <ms>     Let time pass before the next line
  :switch [id]   Save the current note and start another
  :flush         Save now if a save is pending
  anything else  Appended to the current note

Environment:
  NOTEKEEP_SAVE_DELAY_MS          Save delay in milliseconds (default: 2000)
  NOTEKEEP_CLEAR_DIRTY            before|after: when a save clears the dirty flag
  NOTEKEEP_LOG                    Log filter, e.g. notekeep=debug (default: warn)
  NO_COLOR                        Disable colored output
"
    );
}
