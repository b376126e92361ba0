//! Command-line front end for the RudraPad core.
//!
//! # Responsibility
//! - Drive one notes session against a SQLite-backed origin store.
//! - Keep output line-oriented so scripts can consume it.
//!
//! Usage: `rudrapad [--db PATH] [--log-dir DIR] [--log-level LEVEL] <command> [args]`

use log::info;
use rudrapad_core::{
    content_preview, core_version, init_logging, ping, plain_text, title_label, Clock, CoreConfig,
    KeyValueStore, Mutation, Note, NotePatch, NotesSession, Origin, Theme,
};
use std::process::ExitCode;

const DEFAULT_DB_FILE: &str = "rudrapad.sqlite3";
const ENV_PASSWORD: &str = "RUDRAPAD_PASSWORD";
const ENV_DB: &str = "RUDRAPAD_DB";

const USAGE: &str = "usage: rudrapad [--db PATH] [--log-dir DIR] [--log-level LEVEL] <command>

commands:
  ping | version
  new
  list [QUERY]
  show ID
  title ID TEXT
  content ID MARKUP
  delete ID
  export ID
  theme [light|dark|toggle]

all commands except ping and version read the passphrase from RUDRAPAD_PASSWORD";

struct Options {
    db_path: String,
    log_dir: Option<String>,
    log_level: Option<String>,
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("rudrapad: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let options = parse_options(args)?;
    let Some((command, rest)) = options.command.split_first() else {
        return Err(USAGE.to_string());
    };

    match command.as_str() {
        "ping" => {
            println!("rudrapad_core ping={}", ping());
            return Ok(());
        }
        "version" => {
            println!("rudrapad_core version={}", core_version());
            return Ok(());
        }
        "help" | "--help" | "-h" => {
            println!("{USAGE}");
            return Ok(());
        }
        _ => {}
    }

    let mut config =
        CoreConfig::from_lookup(|name| std::env::var(name).ok()).map_err(|err| err.to_string())?;
    if let Some(level) = options.log_level.as_deref() {
        config = config.with_log_level(level).map_err(|err| err.to_string())?;
    }
    if let Some(log_dir) = options.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }

    let origin = Origin::open(&options.db_path, config.storage_quota_bytes)
        .map_err(|err| format!("cannot open `{}`: {err}", options.db_path))?;
    let mut session = NotesSession::attach(&origin, &config).map_err(|err| err.to_string())?;
    info!(
        "event=cli_command module=cli status=start command={}",
        command
    );

    let password = std::env::var(ENV_PASSWORD)
        .map_err(|_| format!("set {ENV_PASSWORD} to unlock notes"))?;
    session.unlock(&password).map_err(|err| err.to_string())?;

    match (command.as_str(), rest) {
        ("theme", args) => run_theme(&mut session, args)?,
        ("new", []) => {
            let created = session.new_note().map_err(|err| err.to_string())?;
            report_saved(&created)?;
            println!("{}", created.value.id);
        }
        ("list", query) => {
            session.set_search_query(query.join(" "));
            for note in session.visible_notes().map_err(|err| err.to_string())? {
                print_summary(&note);
            }
        }
        ("show", [id]) => {
            session.select_note(id).map_err(|err| err.to_string())?;
            if let Some(draft) = session.draft() {
                let stats = draft.stats();
                println!("id: {}", draft.note_id());
                println!("title: {}", title_label(draft.title()));
                println!("words: {} characters: {}", stats.words, stats.characters);
                println!();
                println!("{}", plain_text(draft.content()));
            }
        }
        ("title", [id, text @ ..]) if !text.is_empty() => {
            let updated = session
                .update_note(id, &NotePatch::title(text.join(" ")))
                .map_err(|err| err.to_string())?;
            report_update(id, &updated)?;
        }
        ("content", [id, markup @ ..]) if !markup.is_empty() => {
            let updated = session
                .update_note(id, &NotePatch::content(markup.join(" ")))
                .map_err(|err| err.to_string())?;
            report_update(id, &updated)?;
        }
        ("delete", [id]) => {
            let deleted = session.delete_note(id).map_err(|err| err.to_string())?;
            report_saved(&deleted)?;
            match deleted.value {
                Some(note) => println!("deleted {}", note.id),
                None => println!("no note {id}"),
            }
        }
        ("export", [id]) => {
            let file = session.export_note(id).map_err(|err| err.to_string())?;
            std::fs::write(&file.file_name, file.body.as_bytes())
                .map_err(|err| format!("cannot write `{}`: {err}", file.file_name))?;
            println!("{}", file.file_name);
        }
        _ => return Err(USAGE.to_string()),
    }

    Ok(())
}

fn run_theme<S, C>(session: &mut NotesSession<S, C>, rest: &[String]) -> Result<(), String>
where
    S: KeyValueStore,
    C: Clock,
{
    let theme = match rest {
        [] => session.theme(),
        [value] if value == "toggle" => {
            let toggled = session.toggle_theme().map_err(|err| err.to_string())?;
            report_saved(&toggled)?;
            toggled.value
        }
        [value] if value == "light" || value == "dark" => {
            let set = session
                .set_theme(Theme::from_stored(value))
                .map_err(|err| err.to_string())?;
            report_saved(&set)?;
            set.value
        }
        _ => return Err(USAGE.to_string()),
    };
    println!("{theme}");
    Ok(())
}

fn parse_options(args: Vec<String>) -> Result<Options, String> {
    let mut options = Options {
        db_path: std::env::var(ENV_DB).unwrap_or_else(|_| DEFAULT_DB_FILE.to_string()),
        log_dir: None,
        log_level: None,
        command: Vec::new(),
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--db" => options.db_path = flag_value(&mut iter, "--db")?,
            "--log-dir" => options.log_dir = Some(flag_value(&mut iter, "--log-dir")?),
            "--log-level" => options.log_level = Some(flag_value(&mut iter, "--log-level")?),
            _ => {
                options.command.push(arg);
                options.command.extend(iter.by_ref());
                break;
            }
        }
    }
    Ok(options)
}

fn flag_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    iter.next().ok_or_else(|| format!("{flag} requires a value"))
}

fn print_summary(note: &Note) {
    println!(
        "{}\t{}\t{}\t{}",
        note.id,
        note.last_modified,
        title_label(&note.title),
        content_preview(&note.content)
    );
}

fn report_update(id: &str, updated: &Mutation<Option<Note>>) -> Result<(), String> {
    report_saved(updated)?;
    match &updated.value {
        Some(note) => println!("updated {} at {}", note.id, note.last_modified),
        None => println!("no note {id}"),
    }
    Ok(())
}

fn report_saved<T>(mutation: &Mutation<T>) -> Result<(), String> {
    match &mutation.saved {
        Ok(()) => Ok(()),
        Err(err) => Err(format!("change kept in memory but not saved: {err}")),
    }
}
