//! Headless demo driver for the snippet engine.
//!
//! Expands a snippet trigger into a document held in the reference rope
//! buffer, then replays a scripted key sequence through the navigation
//! controller, printing the buffer, selection and session state after every
//! step:
//!
//! ```text
//! tabspan for --lang cpp --keys tab,tab,esc
//! tabspan fn --file src/lib.rs --offset 120
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use tabspan::buffer::{EditBuffer, Key, Notification};
use tabspan::config::EngineConfig;
use tabspan::engine::CompletionEngine;
use tabspan::error::ResultExt;
use tabspan::logging;
use tabspan::rope_buffer::RopeBuffer;
use tabspan::store::{CompletionStore, DocId};

#[derive(Parser)]
#[command(name = "tabspan", about = "Expand a snippet and walk its hot spots")]
struct Args {
    /// Snippet trigger to expand
    trigger: String,

    /// Language to look the trigger up under
    #[arg(short, long, default_value = "rust")]
    lang: String,

    /// Completion data file, loaded before the built-in defaults
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Engine configuration file (falls back to defaults when unreadable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document to expand into (defaults to an empty buffer)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Offset the trigger is typed at (defaults to the end of the document)
    #[arg(short, long)]
    offset: Option<usize>,

    /// Comma-separated keys to replay: tab, shift-tab, enter, esc
    #[arg(short, long, default_value = "tab,tab")]
    keys: String,
}

fn parse_key(name: &str) -> Result<Key> {
    match name {
        "tab" => Ok(Key::Tab),
        "shift-tab" => Ok(Key::ShiftTab),
        "enter" => Ok(Key::Enter),
        "esc" | "escape" => Ok(Key::Escape),
        other => bail!("unknown key '{other}' (expected tab, shift-tab, enter or esc)"),
    }
}

fn print_state(label: &str, buf: &RopeBuffer, engine: &CompletionEngine) {
    println!("-- {label}");
    println!("   text:       {:?}", buf.text());
    println!("   selections: {:?}", buf.selections());
    match engine.session() {
        Some(session) => {
            println!("   session:    on spot {}", session.current_spot());
            for (id, regions) in session.spots() {
                let spans: Vec<(usize, usize)> =
                    regions.iter().map(|r| (r.start, r.end)).collect();
                println!("     {id:?}: {spans:?}");
            }
        }
        None => println!("   session:    inactive"),
    }
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let store = CompletionStore::new();
    if let Some(path) = &args.store {
        store
            .load_file(path)
            .with_context(|| format!("loading completion data from {}", path.display()))?;
    }
    store.load_defaults()?;

    if store.lookup_snippet(&args.lang, &args.trigger).is_none() {
        bail!(
            "no snippet '{}' for language '{}'",
            args.trigger,
            args.lang
        );
    }

    let mut buf = match &args.file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            RopeBuffer::from_text(&text)
        }
        None => RopeBuffer::new(),
    };
    let offset = args.offset.unwrap_or(buf.len_chars()).min(buf.len_chars());

    // type the trigger the way a user would, then accept the popup row
    buf.set_caret(offset);
    buf.insert_text(&args.trigger);
    let _ = buf.take_edits();

    let config = args
        .config
        .as_deref()
        .and_then(|path| EngineConfig::load(path).log_err())
        .unwrap_or_default();
    let mut engine = CompletionEngine::new(store, config);
    engine.set_document(DocId(1), args.lang.as_str());
    engine.handle_notification(
        &mut buf,
        Notification::CompletionAccepted {
            text: format!("{}: ", args.trigger),
            position: offset,
        },
    );
    print_state("expanded", &buf, &engine);

    for name in args.keys.split(',').filter(|s| !s.is_empty()) {
        let key = parse_key(name.trim())?;
        let consumed = engine.handle_key(&mut buf, key);
        if !consumed {
            println!("-- {name}: passed through to the editor");
            continue;
        }
        print_state(name, &buf, &engine);
    }
    Ok(())
}
