//! `modelver` command-line interface
//!
//! Usage:
//!   modelver migrate [--config FILE] [--out-dir DIR] [--json] FILES...
//!   modelver chain
//!   modelver schema TYPE --version V

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use modelver_document::{Document, Fingerprint};
use modelver_engine::{EngineConfig, MigrationEngine, MigrationFailure, MigrationOutcome};
use modelver_rules::UpdateRule;
use modelver_schema::{SchemaAccessor, Version};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn cli() -> Command {
    Command::new("modelver")
        .version(modelver_engine::VERSION)
        .about("Migrate building-model documents to the latest schema release")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("migrate")
                .about("Migrate JSON documents")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine configuration (TOML)"),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for migrated files, default next to each input"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the per-file report as JSON"),
                )
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Documents to migrate"),
                ),
        )
        .subcommand(Command::new("chain").about("List releases and update rules"))
        .subcommand(
            Command::new("schema")
                .about("Print the fields of an object type")
                .arg(Arg::new("type").required(true).help("Object type, e.g. OS:Material"))
                .arg(
                    Arg::new("version")
                        .long("version")
                        .required(true)
                        .value_parser(|s: &str| Version::parse(s).map_err(|e| e.to_string()))
                        .help("Schema release"),
                ),
        )
}

fn main() -> ExitCode {
    init_logging();
    let matches = cli().get_matches();

    let result = match matches.subcommand() {
        Some(("migrate", args)) => migrate(args),
        Some(("chain", _)) => chain().map(|()| true),
        Some(("schema", args)) => schema(args).map(|()| true),
        _ => Err(anyhow::anyhow!("unknown subcommand")),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Initialize logging with tracing, `RUST_LOG` overriding the `info` default
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Per-file line of the migrate report
#[derive(Debug, Serialize)]
struct FileReport {
    file: PathBuf,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    diagnostics: Vec<String>,
}

impl FileReport {
    fn failed(file: &Path, error: String, diagnostics: Vec<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            status: "failed",
            output: None,
            fingerprint: None,
            original_version: None,
            final_version: None,
            error: Some(error),
            diagnostics,
        }
    }

    fn print(&self) {
        match (&self.error, self.original_version, self.final_version) {
            (Some(error), ..) => println!("{}: failed: {error}", self.file.display()),
            (None, Some(from), Some(to)) => {
                println!("{}: {} ({from} -> {to})", self.file.display(), self.status);
            }
            _ => println!("{}: {}", self.file.display(), self.status),
        }
        for line in &self.diagnostics {
            println!("  {line}");
        }
    }
}

/// Returns whether every file migrated
fn migrate(args: &ArgMatches) -> Result<bool> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let engine = MigrationEngine::with_builtin(config)?;
    let out_dir = args.get_one::<PathBuf>("out-dir");
    let files: Vec<&PathBuf> = args.get_many::<PathBuf>("files").into_iter().flatten().collect();

    // reports stay in argument order; unreadable files never reach the engine
    let mut reports: Vec<Option<FileReport>> = Vec::with_capacity(files.len());
    let mut loaded = Vec::new();
    let mut documents = Vec::new();
    for (index, file) in files.iter().enumerate() {
        match read_document(file) {
            Ok(doc) => {
                loaded.push(index);
                documents.push(doc);
                reports.push(None);
            }
            Err(e) => reports.push(Some(FileReport::failed(file, format!("{e:#}"), Vec::new()))),
        }
    }

    let results = engine.migrate_batch(&documents);
    for (index, result) in loaded.into_iter().zip(results) {
        let file = files[index];
        let report = match result {
            Ok(outcome) => match write_outcome(file, out_dir.map(PathBuf::as_path), &outcome) {
                Ok(written) => migrated_report(file, written, &outcome),
                Err(e) => FileReport::failed(file, format!("{e:#}"), lines(&outcome.diagnostics)),
            },
            Err(failure) => failed_report(file, &failure),
        };
        reports[index] = Some(report);
    }
    let reports: Vec<FileReport> = reports.into_iter().flatten().collect();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            report.print();
        }
    }
    Ok(reports.iter().all(|r| r.error.is_none()))
}

fn read_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("cannot parse {}", path.display()))
}

/// Write the migrated document when anything changed
///
/// Returns the output path and the fingerprint of what was written.
fn write_outcome(
    file: &Path,
    out_dir: Option<&Path>,
    outcome: &MigrationOutcome,
) -> Result<Option<(PathBuf, Fingerprint)>> {
    if !outcome.did_migrate {
        return Ok(None);
    }
    let output = output_path(file, out_dir);
    let fingerprint = outcome.document.fingerprint()?;
    let json = serde_json::to_string_pretty(&outcome.document)?;
    std::fs::write(&output, json).with_context(|| format!("cannot write {}", output.display()))?;
    tracing::debug!(
        output = %output.display(),
        fingerprint = %fingerprint.short(),
        "wrote migrated document"
    );
    Ok(Some((output, fingerprint)))
}

/// `<stem>.migrated.json`, in `out_dir` or next to `file`
fn output_path(file: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = file.file_stem().map_or_else(
        || "document".to_string(),
        |s| s.to_string_lossy().into_owned(),
    );
    let name = format!("{stem}.migrated.json");
    match out_dir {
        Some(dir) => dir.join(name),
        None => file.with_file_name(name),
    }
}

fn lines(diagnostics: &modelver_rules::Diagnostics) -> Vec<String> {
    diagnostics.entries().iter().map(ToString::to_string).collect()
}

fn migrated_report(
    file: &Path,
    written: Option<(PathBuf, Fingerprint)>,
    outcome: &MigrationOutcome,
) -> FileReport {
    let (output, fingerprint) = written.unzip();
    FileReport {
        file: file.to_path_buf(),
        status: if outcome.did_migrate { "migrated" } else { "current" },
        output,
        fingerprint: fingerprint.map(|f| f.short()),
        original_version: Some(outcome.original_version),
        final_version: Some(outcome.final_version),
        error: None,
        diagnostics: lines(&outcome.diagnostics),
    }
}

fn failed_report(file: &Path, failure: &MigrationFailure) -> FileReport {
    FileReport::failed(file, failure.to_string(), lines(&failure.diagnostics))
}

fn chain() -> Result<()> {
    let engine = MigrationEngine::with_builtin(EngineConfig::default())?;
    let chain = engine.chain();
    println!(
        "{} releases, {} -> {}",
        chain.all_versions_in_order().len(),
        chain.oldest(),
        chain.latest()
    );
    for rule in chain.rules() {
        println!("  {}  {}", rule.revision(), rule.description());
    }
    Ok(())
}

fn schema(args: &ArgMatches) -> Result<()> {
    let engine = MigrationEngine::with_builtin(EngineConfig::default())?;
    let object_type = args
        .get_one::<String>("type")
        .context("missing object type")?;
    let version = args
        .get_one::<Version>("version")
        .context("missing version")?;

    let layout = engine.schema().object_schema(object_type, version)?;
    println!("{object_type} @ {version}");
    for (index, name) in layout.field_names().iter().enumerate() {
        let choices = layout
            .allowed_values(index)
            .map(|values| {
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                format!("  [{}]", values.join(", "))
            })
            .unwrap_or_default();
        println!("  {index:>3}  {name}{choices}");
    }
    for name in layout.extensible_fields() {
        println!("  ...  {name} (extensible)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn output_next_to_input_by_default() {
        let path = output_path(Path::new("/models/office.json"), None);
        assert_eq!(path, PathBuf::from("/models/office.migrated.json"));
    }

    #[test]
    fn output_in_out_dir() {
        let path = output_path(Path::new("/models/office.json"), Some(Path::new("/out")));
        assert_eq!(path, PathBuf::from("/out/office.migrated.json"));
    }

    #[test]
    fn migrate_writes_only_changed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.json");
        let current = dir.path().join("current.json");
        std::fs::write(&old, r#"{"version":"2.4.1","records":[]}"#).unwrap();
        std::fs::write(&current, r#"{"version":"3.1.0","records":[]}"#).unwrap();

        let matches = cli().get_matches_from([
            "modelver",
            "migrate",
            old.to_str().unwrap(),
            current.to_str().unwrap(),
        ]);
        let (_, args) = matches.subcommand().unwrap();
        assert!(migrate(args).unwrap());

        let written = read_document(&dir.path().join("old.migrated.json")).unwrap();
        assert_eq!(written.version(), Version::new(3, 1, 0));
        assert!(!dir.path().join("current.migrated.json").exists());
    }

    #[test]
    fn report_carries_fingerprint_of_written_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("old.json");
        let engine = MigrationEngine::with_builtin(EngineConfig::default()).unwrap();
        let outcome = engine.migrate(&Document::new(Version::new(2, 4, 1))).unwrap();

        let written = write_outcome(&file, None, &outcome).unwrap();
        let report = migrated_report(&file, written, &outcome);

        let on_disk = read_document(&dir.path().join("old.migrated.json")).unwrap();
        assert_eq!(report.status, "migrated");
        assert_eq!(report.fingerprint, Some(on_disk.fingerprint().unwrap().short()));
    }

    #[test]
    fn migrate_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();

        let matches = cli().get_matches_from(["modelver", "migrate", bad.to_str().unwrap()]);
        let (_, args) = matches.subcommand().unwrap();
        assert!(!migrate(args).unwrap());
    }
}
