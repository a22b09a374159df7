pub mod cart;

use clap::{Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "ecofinds.toml";

#[derive(Parser)]
#[command(name = "ecofinds")]
#[command(about = "EcoFinds second-hand marketplace", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the marketplace API server
    Serve {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
        /// Overrides server.port from the config file
        #[arg(long)]
        port: Option<u16>,
    },
    /// Write a default config file
    InitConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: String,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Work with your cart on a running server
    Cart {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// Bearer token from a login
        #[arg(long)]
        token: String,
        #[command(subcommand)]
        cmd: cart::CartCommands,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            config: DEFAULT_CONFIG_PATH.to_string(),
            port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["ecofinds"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(
            cli.command.unwrap_or_default(),
            Commands::Serve { port: None, .. }
        ));
    }

    #[test]
    fn test_cart_arguments() {
        let cli = Cli::try_parse_from([
            "ecofinds",
            "cart",
            "--token",
            "abc.def",
            "set",
            "0b6f3b9e-4d7e-4a64-9d1f-0d8a1f6b2c11",
            "-1",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Cart {
                server,
                token,
                cmd: cart::CartCommands::Set { quantity, .. },
            }) => {
                assert_eq!(server, "http://127.0.0.1:8080");
                assert_eq!(token, "abc.def");
                assert_eq!(quantity, -1);
            }
            _ => panic!("unexpected parse"),
        }
    }

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::try_parse_from(["ecofinds", "serve", "--port", "9001"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Serve { port: Some(9001), .. })
        ));
    }
}
