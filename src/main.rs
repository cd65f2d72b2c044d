//! `notekeep` binary; all behavior lives in the library.

fn main() {
    if let Err(err) = notekeep::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
