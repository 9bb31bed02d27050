use std::path::PathBuf;

use clap::Parser;

use crate::config::WorkbenchConfig;
use crate::error::WorkbenchError;

#[derive(Parser)]
#[command(name = "agent-workbench")]
#[command(version = "0.3.0")]
#[command(about = "Local workbench UI and client for a code-agent backend")]
pub struct Args {
    /// Base URL of the agent backend
    #[arg(long)]
    pub backend: Option<String>,

    /// Launch the web UI on localhost instead of the terminal session
    #[arg(long)]
    pub web: bool,

    /// Port for the web UI server
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to a workbench.toml config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Don't open the browser when the web UI starts
    #[arg(long)]
    pub no_browser: bool,

    /// Verbose logging (debug level)
    #[arg(long, short)]
    pub verbose: bool,
}

/// Load the config file (if any) and overlay the CLI flags on top.
pub fn effective_config(args: &Args) -> Result<WorkbenchConfig, WorkbenchError> {
    let mut cfg = WorkbenchConfig::load(args.config.as_deref())?;
    if let Some(backend) = &args.backend {
        cfg.backend_url = backend.trim_end_matches('/').to_string();
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if args.no_browser {
        cfg.open_browser = false;
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_BACKEND_URL, DEFAULT_PORT};

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from(["agent-workbench"]);
        assert!(args.backend.is_none());
        assert!(!args.web);
        assert!(args.port.is_none());
        assert!(args.config.is_none());
        assert!(!args.no_browser);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "agent-workbench",
            "--backend",
            "http://10.0.0.5:5000",
            "--web",
            "--port",
            "9000",
            "--no-browser",
            "--verbose",
        ]);
        assert_eq!(args.backend.as_deref(), Some("http://10.0.0.5:5000"));
        assert!(args.web);
        assert_eq!(args.port, Some(9000));
        assert!(args.no_browser);
        assert!(args.verbose);
    }

    #[test]
    fn test_args_parse_short_verbose() {
        let args = Args::parse_from(["agent-workbench", "-v"]);
        assert!(args.verbose);
    }

    #[test]
    fn test_effective_config_defaults() {
        let args = Args::parse_from(["agent-workbench"]);
        let cfg = effective_config(&args).expect("config");
        assert_eq!(cfg.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert!(cfg.open_browser);
    }

    #[test]
    fn test_effective_config_backend_override_trims_slash() {
        let args = Args::parse_from(["agent-workbench", "--backend", "http://host:5000/"]);
        let cfg = effective_config(&args).expect("config");
        assert_eq!(cfg.backend_url, "http://host:5000");
    }

    #[test]
    fn test_effective_config_port_override() {
        let args = Args::parse_from(["agent-workbench", "--port", "3000"]);
        let cfg = effective_config(&args).expect("config");
        assert_eq!(cfg.port, 3000);
    }

    #[test]
    fn test_effective_config_no_browser() {
        let args = Args::parse_from(["agent-workbench", "--no-browser"]);
        let cfg = effective_config(&args).expect("config");
        assert!(!cfg.open_browser);
    }

    #[test]
    fn test_effective_config_missing_config_file_fails() {
        let args = Args::parse_from(["agent-workbench", "--config", "/no/such/file.toml"]);
        assert!(effective_config(&args).is_err());
    }
}
