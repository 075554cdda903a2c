mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use autodetect_core::{
    AppConfig, AutodetectError, AutomationReport, DETECTOR_NAME, ExitCode, GlobalScope,
    PayloadManager, StaticEnvironment, register,
};
use autodetect_nst::{NstClient, NstError};

/// User agent reported when neither the flag nor the env var supplies one.
const DEFAULT_USER_AGENT: &str = concat!("autodetect-cli/", env!("CARGO_PKG_VERSION"));

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "autodetect",
    about = "Browser automation detection challenge toolkit",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting AUTODETECT_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the standard location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the automation detector against a user agent.
    Detect {
        /// Falls back to AUTODETECT_USER_AGENT, then a built-in default.
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Challenge sequence and scoring.
    Challenge {
        #[command(subcommand)]
        action: ChallengeAction,
    },

    /// NSTBrowser profile management.
    Nst {
        #[command(subcommand)]
        action: NstAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ChallengeAction {
    /// Print the task sequence.
    Sequence {
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Score a JSON file of submissions against the sequence for a seed.
    Score {
        file: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand)]
enum NstAction {
    /// Create a one-shot browser profile.
    CreateProfile,
    /// Delete a browser profile.
    DeleteProfile { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective config.
    List,
    /// Show the config file path.
    Path,
    /// Write the default config to the config path.
    Init {
        #[arg(long)]
        force: bool,
    },
}

/// One entry of a submissions file.
#[derive(Debug, Deserialize)]
struct SubmissionEntry {
    order_number: usize,
    #[serde(default)]
    framework_names: Vec<String>,
    #[serde(default)]
    automation: AutomationReport,
}

#[derive(Serialize)]
struct DetectOutput<'a> {
    user_agent: &'a str,
    detected: bool,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code(&err) as i32);
    }
}

fn run(cli: Cli) -> Result<()> {
    let json_output = cli.json || std::env::var("AUTODETECT_JSON").as_deref() == Ok("1");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);

    // These must work even when the file on disk does not parse or validate.
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Path => {
                println!("{}", config_path.display());
                return Ok(());
            }
            ConfigAction::Init { force } => return init_config(&config_path, *force),
            ConfigAction::List => {}
        }
    }

    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    logging::init(&config.logging);

    match cli.command {
        Commands::Detect { user_agent } => {
            let user_agent = user_agent
                .or_else(|| std::env::var("AUTODETECT_USER_AGENT").ok())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
            run_detect(&user_agent, json_output)
        }
        Commands::Challenge { action } => match action {
            ChallengeAction::Sequence { seed } => {
                let manager = build_manager(&config, seed);
                if json_output {
                    let tasks: Vec<_> = manager.tasks().collect();
                    println!("{}", serde_json::to_string_pretty(&tasks)?);
                } else {
                    println!("session {}", manager.session_id());
                    for task in manager.tasks() {
                        println!("{:>3}  {:<12} {}", task.order_number, task.name, task.image);
                    }
                }
                Ok(())
            }
            ChallengeAction::Score { file, seed } => {
                run_score(&config, &file, seed, json_output)
            }
        },
        Commands::Nst { action } => {
            let client = NstClient::from_config(&config.nstbrowser)?;
            let runtime = tokio::runtime::Runtime::new()?;
            match action {
                NstAction::CreateProfile => {
                    let Some(id) = runtime.block_on(client.create_profile())? else {
                        bail!("NSTBrowser did not return a profile id");
                    };
                    if json_output {
                        println!("{}", serde_json::json!({ "profile_id": id }));
                    } else {
                        println!("{id}");
                    }
                }
                NstAction::DeleteProfile { id } => {
                    runtime.block_on(client.delete_profile(&id))?;
                }
            }
            Ok(())
        }
        Commands::Config { .. } => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}

fn init_config(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite",
            config_path.display()
        );
    }
    AppConfig::default().save_to(config_path)?;
    println!("Wrote {}", config_path.display());
    Ok(())
}

/// Publish the detector on a fresh scope and call it through that binding.
fn detect(user_agent: &str) -> Result<DetectOutput<'_>> {
    let mut scope = GlobalScope::new();
    register(Some(&mut scope));

    let env = StaticEnvironment::new(user_agent);
    let Some(detected) = scope.invoke(DETECTOR_NAME, &env) else {
        bail!("{DETECTOR_NAME} is not registered");
    };
    Ok(DetectOutput {
        user_agent,
        detected,
    })
}

fn render_detect(out: &DetectOutput<'_>, json_output: bool) -> Result<String> {
    if json_output {
        Ok(serde_json::to_string(out)?)
    } else {
        Ok(format!("automation detected: {}", out.detected))
    }
}

fn run_detect(user_agent: &str, json_output: bool) -> Result<()> {
    let out = detect(user_agent)?;
    println!("{}", render_detect(&out, json_output)?);
    Ok(())
}

fn run_score(config: &AppConfig, file: &Path, seed: Option<u64>, json_output: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading submissions from {}", file.display()))?;
    let entries: Vec<SubmissionEntry> = serde_json::from_str(&raw)
        .map_err(AutodetectError::from)
        .with_context(|| format!("parsing {}", file.display()))?;

    let mut manager = build_manager(config, seed);
    for entry in &entries {
        manager.submit_task(&entry.framework_names, entry.order_number, entry.automation)?;
    }
    let score = manager.calculate_score();

    if json_output {
        let out = serde_json::json!({
            "session_id": manager.session_id(),
            "score": score,
            "submissions": manager.submission_report(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (order, submission) in manager.submission_report() {
            println!(
                "{order:>3}  expected {:<12} detected={:<5} collided={:<5} automation={}",
                submission.expected_framework,
                submission.detected,
                submission.collided,
                submission.automation,
            );
        }
        println!("score: {score:.3}");
    }
    Ok(())
}

fn build_manager(config: &AppConfig, seed: Option<u64>) -> PayloadManager {
    let challenge = config.challenge.clone();
    match seed {
        Some(seed) => PayloadManager::with_rng(challenge, &mut StdRng::seed_from_u64(seed)),
        None => {
            tracing::warn!("no --seed given, sequence is not reproducible");
            PayloadManager::new(challenge)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    if let Some(err) = err.downcast_ref::<AutodetectError>() {
        return err.exit_code();
    }
    if let Some(err) = err.downcast_ref::<NstError>() {
        return if err.is_network() {
            ExitCode::NetworkError
        } else {
            ExitCode::InvalidArgs
        };
    }
    ExitCode::GeneralError
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_detect() {
        let cli = Cli::try_parse_from(["autodetect", "--json", "detect", "--user-agent", "UA/1"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Detect { user_agent } => assert_eq!(user_agent.as_deref(), Some("UA/1")),
            _ => panic!("expected detect"),
        }
    }

    #[test]
    fn test_cli_parses_score() {
        let cli =
            Cli::try_parse_from(["autodetect", "challenge", "score", "subs.json", "--seed", "4"])
                .unwrap();
        match cli.command {
            Commands::Challenge {
                action: ChallengeAction::Score { file, seed },
            } => {
                assert_eq!(file, PathBuf::from("subs.json"));
                assert_eq!(seed, Some(4));
            }
            _ => panic!("expected challenge score"),
        }
    }

    #[test]
    fn test_detect_reports_no_automation() {
        let out = detect("TestAgent/1.0").unwrap();
        assert!(!out.detected);
        assert_eq!(out.user_agent, "TestAgent/1.0");

        let json: serde_json::Value =
            serde_json::from_str(&render_detect(&out, true).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "user_agent": "TestAgent/1.0", "detected": false })
        );
        assert_eq!(
            render_detect(&out, false).unwrap(),
            "automation detected: false"
        );
    }

    #[test]
    fn test_config_init_force_replaces_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[challenge]\nrepeated_framework_count = 0\n").unwrap();
        let path_arg = path.to_str().unwrap();

        let cli =
            Cli::try_parse_from(["autodetect", "--config", path_arg, "config", "path"]).unwrap();
        run(cli).unwrap();

        let cli = Cli::try_parse_from([
            "autodetect", "--config", path_arg, "config", "init", "--force",
        ])
        .unwrap();
        run(cli).unwrap();

        let repaired = AppConfig::load_from(&path).unwrap();
        assert_eq!(repaired.challenge.repeated_framework_count, 3);
    }

    #[test]
    fn test_config_list_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[challenge]\nrepeated_framework_count = 0\n").unwrap();

        let cli = Cli::try_parse_from([
            "autodetect", "--config", path.to_str().unwrap(), "config", "list",
        ])
        .unwrap();
        assert!(run(cli).is_err());
    }

    #[test]
    fn test_config_init_keeps_existing_file_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        assert!(init_config(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");
    }

    #[test]
    fn test_score_unknown_order_exits_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subs.json");
        std::fs::write(&path, r#"[{"order_number": 999, "framework_names": []}]"#).unwrap();

        let err = run_score(&AppConfig::default(), &path, Some(1), false).unwrap_err();
        assert_eq!(exit_code(&err), ExitCode::NotFound);
    }

    #[test]
    fn test_score_reads_submissions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subs.json");
        std::fs::write(
            &path,
            r#"[
                {"order_number": 0, "framework_names": ["selenium"], "automation": {"detected": true}},
                {"order_number": 1}
            ]"#,
        )
        .unwrap();

        run_score(&AppConfig::default(), &path, Some(1), true).unwrap();
    }

    #[test]
    fn test_malformed_submissions_are_invalid_args() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subs.json");
        std::fs::write(&path, "{").unwrap();

        let err = run_score(&AppConfig::default(), &path, Some(1), false).unwrap_err();
        assert_eq!(exit_code(&err), ExitCode::InvalidArgs);
    }

    #[test]
    fn test_missing_api_key_is_invalid_args() {
        let err = anyhow::Error::from(NstError::MissingApiKey("X".into()));
        assert_eq!(exit_code(&err), ExitCode::InvalidArgs);
    }
}
