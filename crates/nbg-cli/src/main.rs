//! `nbg`: author and check nbgrader grading metadata in `.ipynb` files

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use nbg_check::ValidationReport;
use nbg_metadata::NamespaceMode;
use nbg_notebook::{
    GradingSession, NbgConfig, NotebookDocument, PatchOutcome, SaveOptions, SavePatcher,
};
use nbg_schema::CellType;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "nbgrader.toml";

fn file_arg() -> Arg {
    Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Notebook file (.ipynb)")
}

fn cell_arg() -> Arg {
    Arg::new("cell")
        .long("cell")
        .required(true)
        .value_parser(value_parser!(usize))
        .help("Zero-based cell index")
}

fn build_cli() -> Command {
    Command::new("nbg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("nbgrader grading metadata for notebook files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: ./nbgrader.toml if present)"),
        )
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .global(true)
                .value_parser(["custom", "plain"])
                .help("Where the editor keeps grading records"),
        )
        .subcommand(
            Command::new("validate")
                .about("Report schema errors and warnings")
                .arg(file_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("fix")
                .about("Repair every grading record in place")
                .arg(file_arg())
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show what would change without writing"),
                ),
        )
        .subcommand(
            Command::new("set-type")
                .about("Set the grading type of a cell")
                .arg(file_arg())
                .arg(cell_arg())
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .value_parser(value_parser!(CellType))
                        .help("manual, task, solution, tests, readonly or none"),
                )
                .arg(
                    Arg::new("points")
                        .long("points")
                        .allow_negative_numbers(true)
                        .value_parser(nbg_schema::validate_points)
                        .help("Points for gradable types"),
                ),
        )
        .subcommand(
            Command::new("clear")
                .about("Remove the grading record of a cell")
                .arg(file_arg())
                .arg(cell_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("List the grading type of every cell")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("debug")
                .about("Print the full metadata of a cell")
                .arg(file_arg())
                .arg(cell_arg()),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let matches = build_cli().get_matches();

    match run(&matches).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(matches: &ArgMatches) -> Result<NbgConfig> {
    let path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = NbgConfig::load(&path).with_context(|| format!("loading {}", path.display()))?;

    if let Some(namespace) = matches.get_one::<String>("namespace") {
        let namespace: NamespaceMode = namespace.parse().map_err(anyhow::Error::msg)?;
        config = config.with_namespace(namespace);
    }
    Ok(config)
}

fn open(path: &Path, config: NbgConfig) -> Result<GradingSession<NotebookDocument>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let doc = NotebookDocument::from_ipynb_str(&text, config.namespace)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(GradingSession::new(doc, config))
}

/// Write the document the way the editor would, then run the save patch
async fn save(path: &Path, session: GradingSession<NotebookDocument>) -> Result<()> {
    let config = session.config().clone();
    let doc = session.into_host();
    let options = SaveOptions {
        drop_custom_metadata: config.namespace == NamespaceMode::Plain,
    };

    let text = doc.to_ipynb_string(config.namespace, options)?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    match SavePatcher::from_config(&config).on_did_save(path, &doc, config.namespace).await {
        PatchOutcome::Failed { reason } => bail!("patching {}: {reason}", path.display()),
        outcome => {
            tracing::debug!("Save patch: {:?}", outcome);
            Ok(())
        }
    }
}

fn print_report(report: &ValidationReport) {
    for error in report.error_messages() {
        println!("error: {error}");
    }
    for warning in report.warning_messages() {
        println!("warning: {warning}");
    }
    println!("{}", report.summary());
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, id: &str) -> Result<&'a T> {
    args.get_one::<T>(id).with_context(|| format!("missing --{id}"))
}

/// Run the selected command; `Ok(false)` when validation errors remain
async fn run(matches: &ArgMatches) -> Result<bool> {
    let config = load_config(matches)?;

    match matches.subcommand() {
        Some(("validate", args)) => {
            let session = open(required::<PathBuf>(args, "file")?, config)?;
            let report = session.validate_notebook();
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(report.is_valid())
        }
        Some(("fix", args)) => {
            let path = required::<PathBuf>(args, "file")?;
            let mut session = open(path, config)?;

            if args.get_flag("dry-run") {
                let preview = session.preview_fix();
                println!("Would fix {} cell(s): {:?}", preview.fix_count(), preview.fixed);
                return Ok(true);
            }

            let report = session.fix_notebook().await;
            for (index, reason) in &report.failed {
                println!("failed: cell {index}: {reason}");
            }
            println!("{}", report.summary());

            let remaining = session.validate_notebook();
            if report.fix_count() > 0 {
                save(path, session).await?;
            }
            Ok(remaining.is_valid())
        }
        Some(("set-type", args)) => {
            let path = required::<PathBuf>(args, "file")?;
            let index = *required::<usize>(args, "cell")?;
            let cell_type = *required::<CellType>(args, "type")?;
            let points = args.get_one::<f64>("points").copied();

            let mut session = open(path, config)?;
            let message = session.set_cell_type(index, cell_type, points).await?;
            save(path, session).await?;
            println!("{message}");
            Ok(true)
        }
        Some(("clear", args)) => {
            let path = required::<PathBuf>(args, "file")?;
            let index = *required::<usize>(args, "cell")?;

            let mut session = open(path, config)?;
            if session.clear_metadata(index).await? {
                save(path, session).await?;
                println!("nbgrader metadata cleared");
            } else {
                println!("Cell has no nbgrader metadata");
            }
            Ok(true)
        }
        Some(("show", args)) => {
            let session = open(required::<PathBuf>(args, "file")?, config)?;
            for index in 0..session.host().cells.len() {
                println!("[{index}] {}", session.describe_cell(index)?);
            }
            Ok(true)
        }
        Some(("debug", args)) => {
            let path = required::<PathBuf>(args, "file")?;
            let index = *required::<usize>(args, "cell")?;
            let session = open(path, config)?;
            println!("{}", session.debug_metadata(index)?);
            Ok(true)
        }
        _ => bail!("unknown command"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbg_test_utils::{code, markdown, notebook_text, tests_json};
    use serde_json::{json, Value};

    fn matches(args: &[&str]) -> ArgMatches {
        build_cli().try_get_matches_from(args).unwrap()
    }

    fn notebook(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("nb.ipynb");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn config_file(dir: &Path) -> String {
        let path = dir.join("nbgrader.toml");
        std::fs::write(&path, "save_patch_delay_ms = 0\n").unwrap();
        path.display().to_string()
    }

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn type_accepts_tags_and_labels() {
        let m = matches(&["nbg", "set-type", "a.ipynb", "--cell", "0", "--type", "tests"]);
        let (_, args) = m.subcommand().unwrap();
        assert_eq!(args.get_one::<CellType>("type"), Some(&CellType::Tests));

        let m = matches(&["nbg", "set-type", "a.ipynb", "--cell", "0", "--type", "Read-only"]);
        let (_, args) = m.subcommand().unwrap();
        assert_eq!(args.get_one::<CellType>("type"), Some(&CellType::Readonly));
    }

    #[test]
    fn negative_points_rejected_by_parser() {
        let result = build_cli().try_get_matches_from([
            "nbg", "set-type", "a.ipynb", "--cell", "0", "--type", "tests", "--points", "-2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn namespace_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_file(dir.path());
        let m = matches(&["nbg", "--config", &config, "--namespace", "plain", "show", "a.ipynb"]);
        assert_eq!(load_config(&m).unwrap().namespace, NamespaceMode::Plain);
    }

    #[tokio::test]
    async fn set_type_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_file(dir.path());
        let path = notebook(dir.path(), &notebook_text(&[code(None)]));
        let file = path.display().to_string();

        let m = matches(&[
            "nbg", "--config", &config, "set-type", &file, "--cell", "0", "--type", "tests",
            "--points", "4",
        ]);
        assert!(run(&m).await.unwrap());
        assert_eq!(read_json(&path)["cells"][0]["metadata"]["nbgrader"]["points"], json!(4));

        let m = matches(&["nbg", "--config", &config, "validate", &file]);
        assert!(run(&m).await.unwrap());
    }

    #[tokio::test]
    async fn fix_rewrites_file_and_validate_fails_before() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_file(dir.path());
        let text = notebook_text(&[
            code(Some(tests_json("q", 1.0))),
            code(Some(tests_json("q", 1.0))),
        ]);
        let path = notebook(dir.path(), &text);
        let file = path.display().to_string();

        let m = matches(&["nbg", "--config", &config, "validate", &file]);
        assert!(!run(&m).await.unwrap());

        let m = matches(&["nbg", "--config", &config, "validate", "--json", &file]);
        assert!(!run(&m).await.unwrap());

        let m = matches(&["nbg", "--config", &config, "fix", &file, "--dry-run"]);
        run(&m).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);

        let m = matches(&["nbg", "--config", &config, "fix", &file]);
        assert!(run(&m).await.unwrap());

        let saved = read_json(&path);
        assert_ne!(
            saved["cells"][0]["metadata"]["nbgrader"]["grade_id"],
            saved["cells"][1]["metadata"]["nbgrader"]["grade_id"]
        );
    }

    #[tokio::test]
    async fn plain_namespace_file_keeps_records_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_file(dir.path());
        let path = notebook(dir.path(), &notebook_text(&[markdown(None)]));
        let file = path.display().to_string();

        let m = matches(&[
            "nbg", "--config", &config, "--namespace", "plain", "set-type", &file, "--cell", "0",
            "--type", "manual",
        ]);
        run(&m).await.unwrap();
        assert_eq!(read_json(&path)["cells"][0]["metadata"]["nbgrader"]["solution"], json!(true));
    }

    #[tokio::test]
    async fn clear_and_bad_cell() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_file(dir.path());
        let path = notebook(dir.path(), &notebook_text(&[code(Some(tests_json("q", 1.0)))]));
        let file = path.display().to_string();

        let m = matches(&["nbg", "--config", &config, "clear", &file, "--cell", "0"]);
        run(&m).await.unwrap();
        assert_eq!(read_json(&path)["cells"][0]["metadata"], json!({}));

        let m = matches(&["nbg", "--config", &config, "debug", &file, "--cell", "9"]);
        assert!(run(&m).await.is_err());
    }
}
