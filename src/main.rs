use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use nowserving::app::{run_chime, run_monitor, run_say, run_windows};
use nowserving::backend::HttpBackend;
use nowserving::cli::{Cli, Commands, ConfigAction};
use nowserving::config::Config;
use nowserving::diagnostics::check_dependencies;
use owo_colors::OwoColorize;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "cpal-audio")]
    if !cli.no_audio {
        // SAFETY: no other thread exists yet; the runtime is built below.
        unsafe { nowserving::audio::suppress_audio_warnings() };
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    nowserving::logging::init(cli.quiet, cli.verbose);

    match &cli.command {
        None | Some(Commands::Run) => {
            let config = load_config(&cli)?;
            run_monitor(config, cli.quiet, cli.no_audio).await?;
        }
        Some(Commands::Windows) => {
            run_windows(&load_config(&cli)?).await?;
        }
        Some(Commands::Chime) => {
            run_chime(&load_config(&cli)?, cli.no_audio).await?;
        }
        Some(Commands::Say { text }) => {
            run_say(&load_config(&cli)?, cli.no_audio, text).await?;
        }
        Some(Commands::Check) => {
            let config = load_config(&cli)?;
            let backend = HttpBackend::new(&config.server)?;
            if !check_dependencies(&backend, &config, cli.no_audio).await {
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, &cli)?;
        }
        Some(Commands::InstallService) => {
            nowserving::systemd::install_and_activate()?;
        }
        Some(Commands::UninstallService) => {
            nowserving::systemd::stop_and_disable()?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "nowserving",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration.
///
/// Priority order:
/// 1. Command line flags (--server-url)
/// 2. Environment variables (NOWSERVING_*)
/// 3. Config file: --config PATH (must exist) or ~/.config/nowserving/config.toml
/// 4. Built-in defaults
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = read_config_file(cli.config.as_deref())?.with_env_overrides();
    if let Some(url) = &cli.server_url {
        config.server.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn read_config_file(custom_path: Option<&Path>) -> Result<Config> {
    match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load_or_default(&Config::default_path())?),
    }
}

fn handle_config_command(action: &ConfigAction, cli: &Cli) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let note = if path.exists() { "" } else { " (not created)" };
            println!("{}{}", path.display(), note.dimmed());
        }
        ConfigAction::Show => {
            print!("{}", load_config(cli)?.to_toml()?);
        }
        ConfigAction::Get { key } => {
            let value = load_config(cli)?.get_value_by_path(key)?;
            match value {
                toml::Value::String(s) => println!("{}", s),
                toml::Value::Table(_) => print!("{}", toml::to_string_pretty(&value)?),
                other => println!("{}", other),
            }
        }
    }
    Ok(())
}
