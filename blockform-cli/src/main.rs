use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use crossterm::event::KeyEvent;
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use blockform::{
    BlockChange, BlockForm, DocumentFormat, FieldPath, FormSchema, FormSession, KeyCombo,
    KeyOrigin, Keymap, OutputTarget, parse_document_str, write_document,
};

#[derive(Debug, Parser)]
#[command(
    name = "blockform",
    version,
    about = "Normalize, edit and validate block-based content documents"
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct DocumentArgs {
    /// Field schema spec: file path, inline payload, or "-" for stdin
    #[arg(short = 's', long = "schema", value_name = "SPEC")]
    schema: String,

    /// Document spec: file path, inline payload, or "-" for stdin
    #[arg(short = 'd', long = "data", value_name = "SPEC")]
    data: String,
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Write the document to this file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Emit compact output rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Backfill missing block fields and print the document
    Normalize {
        #[command(flatten)]
        input: DocumentArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Apply block operations to one blocks field, in order
    Edit {
        #[command(flatten)]
        input: DocumentArgs,
        /// Path of the blocks field, e.g. `layout` or `layout.2.items`
        #[arg(short = 'p', long = "path", value_name = "PATH")]
        path: String,
        /// add:TYPE:AT, remove:I, move:FROM:TO, duplicate:I, collapse:I, select:I, key:COMBO
        #[arg(long = "op", value_name = "OP", action = ArgAction::Append, required = true)]
        ops: Vec<EditOp>,
        /// Emit compact JSON
        #[arg(long = "no-pretty")]
        no_pretty: bool,
    },
    /// List every visible path with its rendered summary
    Paths {
        #[command(flatten)]
        input: DocumentArgs,
    },
    /// Check value shapes; exits non-zero when issues are found
    Validate {
        #[command(flatten)]
        input: DocumentArgs,
    },
    /// Print the JSON Schema of the field schema format
    ConfigSchema,
    /// Print the keyboard bindings of block lists
    Keys,
}

/// One `--op` argument.
#[derive(Debug, Clone, PartialEq)]
enum EditOp {
    Add { block_type: String, at: usize },
    Remove(usize),
    Move { from: usize, to: usize },
    Duplicate(usize),
    Collapse(usize),
    Select(usize),
    Key(KeyEvent),
}

impl FromStr for EditOp {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        let op = match parts.as_slice() {
            ["add", block_type, at] => EditOp::Add {
                block_type: block_type.to_string(),
                at: parse_index(at)?,
            },
            ["remove", index] => EditOp::Remove(parse_index(index)?),
            ["move", from, to] => EditOp::Move {
                from: parse_index(from)?,
                to: parse_index(to)?,
            },
            ["duplicate", index] => EditOp::Duplicate(parse_index(index)?),
            ["collapse", index] => EditOp::Collapse(parse_index(index)?),
            ["select", index] => EditOp::Select(parse_index(index)?),
            ["key", combo] => EditOp::Key(parse_key(combo)?),
            _ => return Err(format!("unrecognised operation '{raw}'")),
        };
        Ok(op)
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a row index"))
}

fn parse_key(combo: &str) -> Result<KeyEvent, String> {
    combo
        .parse::<KeyCombo>()
        .map(|combo| combo.to_event())
        .map_err(|err| format!("key combo '{combo}': {err}"))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Normalize { input, output } => run_normalize(&input, &output),
        Command::Edit {
            input,
            path,
            ops,
            no_pretty,
        } => run_edit(&input, &path, &ops, !no_pretty),
        Command::Paths { input } => run_paths(&input),
        Command::Validate { input } => run_validate(&input),
        Command::ConfigSchema => {
            let schema = schemars::schema_for!(FormSchema);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Keys => {
            for line in Keymap::shared_default().help_text().split(" • ") {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_normalize(input: &DocumentArgs, output: &OutputArgs) -> Result<()> {
    let session = open_session(input)?;
    match session.backfilled() {
        0 => eprintln!("document already normalized"),
        count => eprintln!("backfilled defaults in {count} blocks field(s)"),
    }
    let target = match &output.output {
        Some(path) => OutputTarget::File(path.clone()),
        None => OutputTarget::Stdout,
    };
    let format = output
        .output
        .as_deref()
        .and_then(DocumentFormat::from_path)
        .unwrap_or(DocumentFormat::Json);
    write_document(&session.value(), format, !output.no_pretty, &target)
        .map_err(|err| eyre!("{err:#}"))
}

fn run_edit(input: &DocumentArgs, path: &str, ops: &[EditOp], pretty: bool) -> Result<()> {
    let mut session = open_session(input)?;
    let path = FieldPath::parse(path);
    let mut changes: Vec<BlockChange> = Vec::new();
    for op in ops {
        debug!(?op, "applying operation");
        if let Some(change) = apply_op(&mut session, &path, op)? {
            changes.push(change);
        }
    }
    let report = json!({
        "document": session.value(),
        "editor": session.editor_state(&path),
        "changes": changes,
    });
    let rendered = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{rendered}");
    Ok(())
}

fn apply_op(session: &mut FormSession, path: &FieldPath, op: &EditOp) -> Result<Option<BlockChange>> {
    let change = match op {
        EditOp::Add { block_type, at } => session.add_block(path, block_type, *at),
        EditOp::Remove(index) => session.remove_block(path, *index),
        EditOp::Move { from, to } => session.move_block(path, *from, *to),
        EditOp::Duplicate(index) => session.duplicate_block(path, *index),
        EditOp::Collapse(index) => session.toggle_block_collapse(path, *index),
        EditOp::Select(index) => session.select_block(path, Some(*index)),
        EditOp::Key(key) => session.handle_key(path, key, &KeyOrigin::default()),
    };
    change.wrap_err_with(|| format!("cannot edit '{path}'"))
}

fn run_paths(input: &DocumentArgs) -> Result<()> {
    let session = open_session(input)?;
    for view in session.views() {
        let indent = "  ".repeat(view.depth);
        println!("{indent}{}\t{}", view.path, session.render(&view));
    }
    Ok(())
}

fn run_validate(input: &DocumentArgs) -> Result<()> {
    let mut session = open_session(input)?;
    let report = session.validate();
    if report.is_valid() {
        println!("document is valid");
        return Ok(());
    }
    for issue in &report.issues {
        for error in &issue.errors {
            let message = error.message.as_deref().unwrap_or("value is required");
            println!("{}: {message}", issue.path);
        }
    }
    Err(eyre!("{} issue(s) found", report.error_count()))
}

fn open_session(input: &DocumentArgs) -> Result<FormSession> {
    if input.schema == "-" && input.data == "-" {
        return Err(eyre!("cannot read schema and data from stdin simultaneously"));
    }
    let schema = load_value(&input.schema, "schema")?;
    let document = load_value(&input.data, "data")?;
    let form = BlockForm::from_value(&schema).wrap_err("invalid field schema")?;
    form.load(&document).wrap_err("cannot load document")
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

fn load_value(spec: &str, label: &str) -> Result<Value> {
    if spec == "-" {
        let contents = read_from_source(&InputSource::Stdin)?;
        return parse_contents(&contents, DocumentFormat::Json, label);
    }
    let path = Path::new(spec);
    if !path.exists() {
        return parse_contents(spec, DocumentFormat::Json, &format!("inline {label}"));
    }
    let contents = read_from_source(&InputSource::File(path.to_path_buf()))?;
    let format = DocumentFormat::from_path(path).unwrap_or(DocumentFormat::Json);
    parse_contents(&contents, format, label)
}

fn read_from_source(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("failed to read from stdin")?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read file {}", path.display())),
    }
}

/// Tries `format` first, then every other compiled-in format.
fn parse_contents(contents: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    match parse_document_str(contents, format) {
        Ok(value) => Ok(value),
        Err(primary) => {
            for candidate in DocumentFormat::available() {
                if *candidate == format {
                    continue;
                }
                if let Ok(value) = parse_document_str(contents, *candidate) {
                    return Ok(value);
                }
            }
            Err(eyre!(
                "failed to parse {label}: tried {} (first error: {primary:#})",
                format_list()
            ))
        }
    }
}

fn format_list() -> String {
    DocumentFormat::available()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};

    use super::*;

    #[test]
    fn parses_operations() {
        assert_eq!(
            "add:hero:0".parse::<EditOp>(),
            Ok(EditOp::Add {
                block_type: "hero".into(),
                at: 0
            })
        );
        assert_eq!("move:2:0".parse::<EditOp>(), Ok(EditOp::Move { from: 2, to: 0 }));
        assert_eq!("remove:1".parse::<EditOp>(), Ok(EditOp::Remove(1)));
        assert!("remove:-1".parse::<EditOp>().is_err());
        assert!("rotate:1".parse::<EditOp>().is_err());
    }

    #[test]
    fn parses_key_combos() {
        assert_eq!(
            "key:Ctrl+Down".parse::<EditOp>(),
            Ok(EditOp::Key(KeyEvent::new(KeyCode::Down, KeyModifiers::CONTROL)))
        );
        assert_eq!(
            "key:space".parse::<EditOp>(),
            Ok(EditOp::Key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE)))
        );
        assert_eq!(
            "key:Ctrl+D".parse::<EditOp>(),
            Ok(EditOp::Key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL)))
        );
        assert!("key:Hyper+Up".parse::<EditOp>().is_err());
        assert!("key:Ctrl+".parse::<EditOp>().is_err());
    }
}
