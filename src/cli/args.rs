use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, subcommand_negates_reqs = true)]
pub struct Cli {
    /// Read the request document from a file instead of stdin
    #[arg(long, global = true, env = "TFSTATE_REQUEST")]
    pub request: Option<PathBuf>,

    /// Storage request timeout in seconds
    #[arg(long, global = true, env = "TFSTATE_TIMEOUT", default_value_t = 60)]
    pub timeout: u64,

    /// Directory receiving the state file and metadata (same as `in <DESTINATION>`)
    #[arg(required = true)]
    pub destination: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The operation to run. A bare `<DESTINATION>` is the `in` operation.
    pub fn into_command(self) -> Option<Command> {
        match (self.command, self.destination) {
            (Some(command), _) => Some(command),
            (None, Some(destination)) => Some(Command::In(InArgs { destination })),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the state file into a directory
    In(InArgs),
    /// Report the current state file version
    Check,
}

#[derive(clap::Args, Debug)]
pub struct InArgs {
    /// Directory receiving the state file and metadata
    pub destination: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    #[test]
    fn test_in_destination_positional() {
        let cli = Cli::parse_from(["tfstate-resource", "in", "/tmp/build/get"]);

        match cli.into_command() {
            Some(Command::In(args)) => assert_eq!(args.destination, PathBuf::from("/tmp/build/get")),
            other => panic!("Expected In command, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_destination_runs_in() {
        let cli = Cli::parse_from(["tfstate-resource", "/tmp/build/get"]);

        match cli.into_command() {
            Some(Command::In(args)) => assert_eq!(args.destination, PathBuf::from("/tmp/build/get")),
            other => panic!("Expected In command, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_destination_with_flags() {
        let cli = Cli::parse_from(["tfstate-resource", "--timeout=5", "out"]);
        assert_eq!(cli.timeout, 5);
        assert!(matches!(cli.into_command(), Some(Command::In(_))));
    }

    #[test]
    fn test_no_arguments_rejected() {
        let result = Cli::try_parse_from(["tfstate-resource"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_in_requires_destination() {
        let result = Cli::try_parse_from(["tfstate-resource", "in"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::parse_from(["tfstate-resource", "check"]);
        assert!(matches!(cli.into_command(), Some(Command::Check)));
    }

    #[test]
    fn test_request_flag_after_subcommand() {
        let cli = Cli::parse_from([
            "tfstate-resource",
            "in",
            "out",
            "--request=req.json",
            "--timeout=5",
        ]);
        assert_eq!(cli.request, Some(PathBuf::from("req.json")));
        assert_eq!(cli.timeout, 5);
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        let request_backup = std::env::var("TFSTATE_REQUEST").ok();
        let timeout_backup = std::env::var("TFSTATE_TIMEOUT").ok();
        unsafe {
            std::env::remove_var("TFSTATE_REQUEST");
            std::env::remove_var("TFSTATE_TIMEOUT");
        }

        let cli = Cli::parse_from(["tfstate-resource", "check"]);

        unsafe {
            if let Some(request) = request_backup {
                std::env::set_var("TFSTATE_REQUEST", request);
            }
            if let Some(timeout) = timeout_backup {
                std::env::set_var("TFSTATE_TIMEOUT", timeout);
            }
        }

        assert!(cli.request.is_none());
        assert_eq!(cli.timeout, 60);
    }

    #[test]
    #[serial]
    fn test_timeout_from_env_var_fallback() {
        let timeout_backup = std::env::var("TFSTATE_TIMEOUT").ok();

        unsafe {
            std::env::set_var("TFSTATE_TIMEOUT", "15");
        }

        let cli = Cli::parse_from(["tfstate-resource", "check"]);

        unsafe {
            match timeout_backup {
                Some(timeout) => std::env::set_var("TFSTATE_TIMEOUT", timeout),
                None => std::env::remove_var("TFSTATE_TIMEOUT"),
            }
        }

        assert_eq!(cli.timeout, 15);
    }

    #[test]
    #[serial]
    fn test_cli_flag_takes_precedence_over_env() {
        let timeout_backup = std::env::var("TFSTATE_TIMEOUT").ok();

        unsafe {
            std::env::set_var("TFSTATE_TIMEOUT", "15");
        }

        let cli = Cli::parse_from(["tfstate-resource", "check", "--timeout=30"]);

        unsafe {
            match timeout_backup {
                Some(timeout) => std::env::set_var("TFSTATE_TIMEOUT", timeout),
                None => std::env::remove_var("TFSTATE_TIMEOUT"),
            }
        }

        assert_eq!(cli.timeout, 30);
    }
}
