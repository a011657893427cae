//! pubmend - version reconciliation and dependency repair for Flutter projects
//!
//! Command-line entry point: parses the plain argument list and dispatches
//! to the command implementations.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use pubmend::commands::{BackupsCommand, DoctorCommand, ResolveCommand, RestoreCommand};
use pubmend_core::{APP_NAME, VERSION};

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    match dispatch(std::env::args().skip(1).collect()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(args: Vec<String>) -> Result<()> {
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "doctor" => {
            let opts = CommonOpts::parse(&args[1..])?;
            DoctorCommand {
                project_path: opts.project_path,
            }
            .execute()
            .await
        }
        "resolve" => {
            let opts = CommonOpts::parse(&args[1..])?;
            ResolveCommand {
                project_path: opts.project_path,
                registry_endpoint: opts.registry,
                sdk_version: opts.sdk,
            }
            .execute()
            .await
        }
        "backups" => {
            let opts = CommonOpts::parse(&args[1..])?;
            BackupsCommand {
                project_path: opts.project_path,
            }
            .execute()
            .await
        }
        "restore" => {
            let id = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("restore requires a backup id"))?
                .clone();
            let opts = CommonOpts::parse(&args[2..])?;
            RestoreCommand {
                project_path: opts.project_path,
                id,
            }
            .execute()
            .await
        }
        "--version" | "version" => {
            println!("{} v{}", APP_NAME, VERSION);
            Ok(())
        }
        _ => {
            print_usage();
            Err(anyhow::anyhow!("unknown command: {}", command))
        }
    }
}

/// Options shared by every command: a project path and a couple of
/// overrides for the project configuration.
struct CommonOpts {
    project_path: PathBuf,
    registry: Option<String>,
    sdk: Option<String>,
}

impl CommonOpts {
    fn parse(args: &[String]) -> Result<Self> {
        let mut opts = Self {
            project_path: PathBuf::from("."),
            registry: None,
            sdk: None,
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--registry" => {
                    opts.registry = Some(
                        iter.next()
                            .ok_or_else(|| anyhow::anyhow!("--registry requires a URL"))?
                            .clone(),
                    );
                }
                "--sdk" => {
                    opts.sdk = Some(
                        iter.next()
                            .ok_or_else(|| anyhow::anyhow!("--sdk requires a version"))?
                            .clone(),
                    );
                }
                flag if flag.starts_with("--") => {
                    return Err(anyhow::anyhow!("unknown flag: {}", flag));
                }
                path => opts.project_path = PathBuf::from(path),
            }
        }

        Ok(opts)
    }
}

fn print_usage() {
    println!("{} v{}", APP_NAME, VERSION);
    println!();
    println!("Usage: pubmend <command> [path] [options]");
    println!();
    println!("Commands:");
    println!("  doctor   [path]       Report version signals and the reconciled recommendation");
    println!("  resolve  [path]       Run a full backup/detect/resolve/verify cycle");
    println!("  backups  [path]       List manifest backups");
    println!("  restore  <id> [path]  Restore the manifest from a backup");
    println!();
    println!("Options:");
    println!("  --registry <url>      Override the package registry endpoint");
    println!("  --sdk <version>       Resolve against this Flutter version");
}
