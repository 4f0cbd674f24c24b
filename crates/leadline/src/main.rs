// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadline - multi-tenant SMS lead engagement server.
//!
//! This is the binary entry point: the webhook server plus the provisioning
//! commands that seed tenants and leads.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use leadline_config::model::LeadlineConfig;

/// Leadline - multi-tenant SMS lead engagement server.
#[derive(Parser, Debug)]
#[command(name = "leadline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default search path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server.
    Serve,
    /// Manage tenants.
    Tenant {
        #[command(subcommand)]
        action: TenantCommands,
    },
    /// Manage leads.
    Lead {
        #[command(subcommand)]
        action: LeadCommands,
    },
    /// Print the messages of a conversation.
    History {
        /// Conversation id.
        conversation_id: String,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration and exit.
    Check,
}

#[derive(Subcommand, Debug)]
enum TenantCommands {
    /// Register a tenant and its sending number.
    Add(TenantAddArgs),
    /// List registered tenants.
    List,
}

#[derive(Args, Debug)]
pub(crate) struct TenantAddArgs {
    /// Tenant id. Generated when omitted.
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub name: String,
    /// Telephony account identifier.
    #[arg(long)]
    pub account_sid: String,
    /// Telephony auth token, also the webhook signing secret.
    #[arg(long)]
    pub auth_token: String,
    /// Sending number in E.164 form.
    #[arg(long)]
    pub number: String,
    #[arg(long, default_value = "")]
    pub system_prompt: String,
    #[arg(long, default_value = "")]
    pub preferences: String,
    /// Tenant's own completion API key.
    #[arg(long)]
    pub api_key: Option<String>,
    /// Completion model override.
    #[arg(long)]
    pub model: Option<String>,
    /// Agent assigned to this tenant's new conversations.
    #[arg(long)]
    pub default_agent: Option<String>,
}

#[derive(Subcommand, Debug)]
enum LeadCommands {
    /// Register a lead under a tenant.
    Add(LeadAddArgs),
}

#[derive(Args, Debug)]
pub(crate) struct LeadAddArgs {
    /// Owning tenant id.
    #[arg(long)]
    pub tenant: String,
    /// Lead phone number in E.164 form.
    #[arg(long)]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub name: String,
    /// Lead id. Generated when omitted.
    #[arg(long)]
    pub id: Option<String>,
}

fn load_config(path: Option<&std::path::Path>) -> LeadlineConfig {
    let result = match path {
        Some(path) => leadline_config::load_and_validate_path(path),
        None => leadline_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            leadline_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Tenant { action }) => match action {
            TenantCommands::Add(args) => admin::add_tenant(&config, args).await,
            TenantCommands::List => admin::list_tenants(&config).await,
        },
        Some(Commands::Lead { action }) => match action {
            LeadCommands::Add(args) => admin::add_lead(&config, args).await,
        },
        Some(Commands::History {
            conversation_id,
            json,
        }) => admin::print_history(&config, &conversation_id, json).await,
        Some(Commands::Check) => {
            println!(
                "leadline: config ok (listen {}:{}, reply mode {:?}, database {})",
                config.server.host,
                config.server.port,
                config.reply.mode,
                config.storage.database_path
            );
            Ok(())
        }
        None => {
            println!("leadline: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc can advance the epoch; the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report allocated bytes");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_tenant_add() {
        let cli = Cli::try_parse_from([
            "leadline",
            "tenant",
            "add",
            "--name",
            "Acme",
            "--account-sid",
            "AC1",
            "--auth-token",
            "secret",
            "--number",
            "+15550000000",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Tenant {
                action: TenantCommands::Add(args),
            }) => {
                assert_eq!(args.name, "Acme");
                assert_eq!(args.number, "+15550000000");
                assert!(args.id.is_none());
                assert!(args.default_agent.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli =
            Cli::try_parse_from(["leadline", "check", "--config", "/tmp/leadline.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/leadline.toml")));
        assert!(matches!(cli.command, Some(Commands::Check)));
    }

    #[test]
    fn history_requires_conversation_id() {
        assert!(Cli::try_parse_from(["leadline", "history"]).is_err());
    }
}
