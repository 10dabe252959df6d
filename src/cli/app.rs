//! Main CLI application

use crate::config::{parse_config_auto, parse_config_file};
use crate::error::{ResolveError, Result};
use crate::value::{Deferred, ParsedValue, Value};
use crate::{Argument, Command, CommandOption};
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Name used for the binary and for config file discovery
pub const APP_NAME: &str = "deferred-args";

/// Options whose values are never printed
const SECRET_KEYS: &[&str] = &["token"];

/// CLI application
#[derive(Debug)]
pub struct App {
    /// The command tree
    command: Command,
    /// Config file the tree was configured from, if any
    config_path: Option<PathBuf>,
}

impl App {
    /// Create a new app, discovering the config file automatically
    pub fn new() -> Result<Self> {
        let mut command = build_command();
        let config_path = match parse_config_auto(APP_NAME)? {
            Some((config, path)) => {
                command.apply_config(&config)?;
                Some(path)
            }
            None => None,
        };

        Ok(App {
            command,
            config_path,
        })
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self> {
        let config = parse_config_file(&path)?;
        let mut command = build_command();
        command.apply_config(&config)?;

        Ok(App {
            command,
            config_path: Some(path),
        })
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// Parse `argv`, resolving deferred values, and render what was parsed
    pub async fn run_from<I, T>(mut self, argv: I) -> Result<String>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let parsed = self.command.parse_from_async(argv).await?;
        Ok(render_report(parsed))
    }
}

/// Build the demo command tree
pub fn build_command() -> Command {
    Command::new(APP_NAME)
        .version(crate::VERSION)
        .about("Show how option values resolve, including ones read asynchronously")
        .subcommand_required(true)
        .option(
            CommandOption::new("config")
                .short('c')
                .value_name("FILE")
                .help("Path to a deferred-args.yml config file"),
        )
        .option(
            CommandOption::new("profile")
                .short('p')
                .env("DEFERRED_ARGS_PROFILE")
                .default_value("default")
                .help("Profile to use"),
        )
        .subcommand(
            Command::new("secrets")
                .about("Work with secrets")
                .subcommand_required(true)
                .option(
                    CommandOption::new("token")
                        .short('t')
                        .env("DEFERRED_ARGS_TOKEN")
                        .value_name("TOKEN")
                        .help("Access token, or @FILE to read it from a file")
                        .coerce(read_token),
                )
                .subcommand(
                    Command::new("get")
                        .about("Fetch one secret")
                        .argument(Argument::new("name").required().help("Secret name"))
                        .action(|cmd| {
                            let name = cmd
                                .argument_value("name")
                                .and_then(ParsedValue::as_ready)
                                .and_then(Value::as_str)
                                .unwrap_or_default();
                            anyhow::ensure!(!name.is_empty(), "secret name must not be empty");
                            Ok(())
                        }),
                )
                .subcommand(
                    Command::new("list")
                        .alias("ls")
                        .about("List secrets")
                        .option(
                            CommandOption::new("prefix")
                                .help("Only names starting with this prefix, or @FILE")
                                .coerce(read_token),
                        )
                        .option(
                            CommandOption::new("tag")
                                .multiple()
                                .help("Filter by tag, or @FILE per tag")
                                .coerce(read_token),
                        ),
                ),
        )
}

/// Coerce `@path` into a deferred read of that file; anything else is kept as is
pub fn read_token(raw: &str) -> ParsedValue {
    match raw.strip_prefix('@') {
        Some(path) => {
            let path = PathBuf::from(path);
            Deferred::new(async move {
                let contents = tokio::fs::read_to_string(&path).await.map_err(ResolveError::from)?;
                Ok(Value::from(contents.trim().to_string()))
            })
            .into()
        }
        None => ParsedValue::from(raw),
    }
}

/// One line per option and argument of each command in the dispatch chain
pub fn render_report(root: &Command) -> String {
    let mut out = String::new();

    for command in root.dispatch_chain() {
        let _ = writeln!(out, "[{}]", command.name());

        let mut keys: Vec<&String> = command.opts().keys().collect();
        keys.sort();
        for key in keys {
            let source = command
                .get_option_value_source(key)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unset".to_string());
            let shown = match command.get_option_value(key) {
                Some(_) if SECRET_KEYS.contains(&key.as_str()) => "********".to_string(),
                Some(value) => display_value(value),
                None => String::new(),
            };
            let _ = writeln!(out, "  --{} = {} ({})", key, shown, source);
        }

        for (argument, value) in command.arguments().iter().zip(command.processed_args()) {
            let _ = writeln!(out, "  <{}> = {}", argument.name(), display_value(value));
        }
    }

    out
}

fn display_value(value: &ParsedValue) -> String {
    match value {
        ParsedValue::Pending(_) => "<pending>".to_string(),
        ParsedValue::Ready(Value::String(s)) => s.clone(),
        ParsedValue::Ready(Value::Null) => "-".to_string(),
        ParsedValue::Ready(Value::Sequence(items)) => items
            .iter()
            .map(|item| display_value(&ParsedValue::Ready(item.clone())))
            .collect::<Vec<_>>()
            .join(", "),
        ParsedValue::Ready(other) => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Run the CLI application with the process arguments
pub async fn run() -> Result<()> {
    let args: Vec<OsString> = std::env::args_os().collect();
    let app = match extract_config_arg(&args) {
        Some(path) => App::with_config_file(path)?,
        None => App::new()?,
    };

    let report = app.run_from(args).await?;
    print!("{}", report);
    Ok(())
}

/// Extract --config before the full parse so the tree can be configured
fn extract_config_arg(args: &[OsString]) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--config" || arg == "-c" {
            return args.get(i + 1).map(PathBuf::from);
        }
        if let Some(value) = arg.to_str().and_then(|s| s.strip_prefix("--config=")) {
            return Some(PathBuf::from(value));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_demo_tree_is_consistent() {
        parser::build(&build_command()).debug_assert();
    }

    #[test]
    fn test_extract_config_arg() {
        let args: Vec<OsString> = vec!["deferred-args".into(), "--config".into(), "x.yml".into()];
        assert_eq!(extract_config_arg(&args), Some(PathBuf::from("x.yml")));
    }

    #[test]
    fn test_extract_config_arg_short_and_equals() {
        let args: Vec<OsString> = vec!["deferred-args".into(), "-c".into(), "a.yml".into()];
        assert_eq!(extract_config_arg(&args), Some(PathBuf::from("a.yml")));

        let args: Vec<OsString> = vec!["deferred-args".into(), "--config=b.yml".into()];
        assert_eq!(extract_config_arg(&args), Some(PathBuf::from("b.yml")));

        let args: Vec<OsString> = vec!["deferred-args".into(), "secrets".into()];
        assert_eq!(extract_config_arg(&args), None);
    }

    #[test]
    fn test_read_token_plain() {
        let value = read_token("abc");
        assert_eq!(value.as_ready(), Some(&Value::from("abc")));
    }

    #[tokio::test]
    async fn test_read_token_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token");
        fs::write(&path, "s3cret\n").unwrap();

        let value = read_token(&format!("@{}", path.display()));
        assert!(value.is_pending());
        assert_eq!(value.settle().await.unwrap(), Value::from("s3cret"));
    }

    #[tokio::test]
    async fn test_report_masks_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token");
        fs::write(&path, "s3cret").unwrap();

        let mut command = build_command();
        let token = format!("@{}", path.display());
        command
            .parse_from_async(["deferred-args", "secrets", "--token", token.as_str(), "get", "db"])
            .await
            .unwrap();

        let report = render_report(&command);
        assert!(report.contains("[get]"));
        assert!(report.contains("  <name> = db"));
        assert!(report.contains("  --token = ******** (cli)"));
        assert!(!report.contains("s3cret"));
        assert_eq!(
            command.find_subcommand("secrets").unwrap().value_of("token"),
            Some(&Value::from("s3cret"))
        );
    }

    #[tokio::test]
    async fn test_prefix_read_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prefix");
        fs::write(&path, "db/\n").unwrap();

        let mut command = build_command();
        let prefix = format!("@{}", path.display());
        command
            .parse_from_async(["deferred-args", "secrets", "list", "--prefix", prefix.as_str()])
            .await
            .unwrap();

        let report = render_report(&command);
        assert!(report.contains("  --prefix = db/ (cli)"));
    }
}
