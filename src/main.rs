use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use log::{error, info};
use snare::configuration::config::{overlay_explicit, Config};
use snare::configuration::types::{ApiConfig, TrapConfig};
use snare::controller::controller_handler::{Controller, Role};
use snare::error_handling::types::ConfigError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snare")]
#[command(version)]
#[command(about = "Decoy SSH listener and capture API")]
struct Args {
    /// TOML file with `[trap]` and `[api]` tables; explicit flags and environment variables
    /// take precedence over it
    #[arg(long, global = true, env = "SNARE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the decoy listener, once the capture API answers
    Trap(TrapConfig),
    /// Run the capture API
    Api(ApiConfig),
}

/// Builds the role to run from the parsed arguments and the optional configuration file.
fn resolve_role(args: Args, matches: &ArgMatches) -> Result<Role, ConfigError> {
    let file = match &args.config {
        Some(path) => {
            info!("Importing configuration from {}", path.display());
            Some(Config::from_file(path)?)
        }
        None => None,
    };

    let role = match (args.command, file, matches.subcommand()) {
        (Command::Trap(cli), Some(file), Some((_, sub))) => {
            Role::Trap(overlay_explicit(&file.trap, &cli, sub)?)
        }
        (Command::Api(cli), Some(file), Some((_, sub))) => {
            Role::Api(overlay_explicit(&file.api, &cli, sub)?)
        }
        (Command::Trap(cli), _, _) => Role::Trap(cli),
        (Command::Api(cli), _, _) => Role::Api(cli),
    };
    Ok(role)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    println!(
        "
 ____  _   _    _    ____  _____
/ ___|| \\ | |  / \\  |  _ \\| ____|
\\___ \\|  \\| | / _ \\ | |_) |  _|
 ___) | |\\  |/ ___ \\|  _ <| |___
|____/|_| \\_/_/   \\_\\_| \\_\\_____|
==================================
  Decoy SSH listener v{}
==================================
",
        env!("CARGO_PKG_VERSION")
    );

    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let role = resolve_role(args, &matches).unwrap_or_else(|e| {
        error!("Unable to import configuration: {}", e);
        std::process::exit(1);
    });

    info!("Configuration imported successfully");

    let controller = Controller::new(role).unwrap_or_else(|e| {
        error!(
            "Unable to create a controller instance: {}, exiting...",
            e
        );
        std::process::exit(1);
    });

    if let Err(e) = controller.run().await {
        error!("Error occured in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn resolve(argv: &[&str]) -> Result<Role, ConfigError> {
        let matches = Args::command().try_get_matches_from(argv).unwrap();
        let args = Args::from_arg_matches(&matches).unwrap();
        resolve_role(args, &matches)
    }

    #[test]
    #[serial]
    fn test_trap_without_file() {
        let role = resolve(&["snare", "trap", "--listen-port", "2022"]).unwrap();
        match role {
            Role::Trap(config) => {
                assert_eq!(config.listen_port, 2022);
                assert_eq!(config.probe_attempts, 30);
            }
            other => panic!("unexpected role {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_api_with_file_and_flag() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[api]\nport = 8080\ndatabase_url = \"sqlite://from-file.db\""
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let role = resolve(&["snare", "api", "--config", &path, "--port", "9000"]).unwrap();
        assert_eq!(
            role,
            Role::Api(ApiConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 9000,
                database_url: "sqlite://from-file.db".to_string(),
            })
        );
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        let result = resolve(&["snare", "--config", "/nonexistent/snare.toml", "trap"]);
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Args::command().try_get_matches_from(["snare"]).is_err());
    }
}
