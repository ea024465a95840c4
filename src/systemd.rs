//! Systemd user service management.

use crate::defaults::SERVICE_NAME;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Unit file running `<exe> run`, restarted whenever the kiosk process dies.
pub fn unit_contents(exe_path: &Path) -> String {
    format!(
        r#"[Unit]
Description=nowserving - Queue monitor announcer
After=network-online.target sound.target
Wants=network-online.target

[Service]
Type=simple
ExecStart={} run
Restart=on-failure
RestartSec=5

[Install]
WantedBy=default.target
"#,
        exe_path.display()
    )
}

/// Write the user unit, then start it (or restart it when already running).
pub fn install_and_activate() -> Result<()> {
    let systemd_dir = service_dir()?;
    fs::create_dir_all(&systemd_dir).context("Failed to create systemd user directory")?;

    let exe_path = std::env::current_exe().context("Failed to get current executable path")?;
    let service_path = systemd_dir.join(SERVICE_NAME);
    fs::write(&service_path, unit_contents(&exe_path)).context("Failed to write service file")?;
    eprintln!("Service file written to: {}", service_path.display());

    run_systemctl(&["daemon-reload"], "daemon-reload")?;

    let is_active = Command::new("systemctl")
        .args(["--user", "is-active", SERVICE_NAME])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if is_active {
        eprintln!("Service is already active, restarting...");
        run_systemctl(&["restart", SERVICE_NAME], "restart nowserving")?;
        println!("Service restarted.");
    } else {
        eprintln!("Enabling and starting service...");
        run_systemctl(&["enable", "--now", SERVICE_NAME], "enable and start nowserving")?;
        println!("Service enabled and started.");
    }

    Ok(())
}

/// Stop, disable and remove the user unit.
///
/// Stop and disable failures only warn; a failed reload is an error.
pub fn stop_and_disable() -> Result<()> {
    warn_systemctl(&["stop", SERVICE_NAME], "stop service");
    warn_systemctl(&["disable", SERVICE_NAME], "disable service");

    let service_path = service_dir()?.join(SERVICE_NAME);
    if service_path.exists() {
        fs::remove_file(&service_path).context("Failed to remove service file")?;
    }

    run_systemctl(&["daemon-reload"], "daemon-reload")?;
    println!("Service removed.");
    Ok(())
}

fn run_systemctl(args: &[&str], action: &str) -> Result<()> {
    let status = Command::new("systemctl")
        .arg("--user")
        .args(args)
        .status()
        .with_context(|| format!("Failed to run systemctl {action}"))?;

    anyhow::ensure!(
        status.success(),
        "systemctl {action} failed (exit code: {status}). Check: systemctl --user status {SERVICE_NAME}"
    );
    Ok(())
}

fn warn_systemctl(args: &[&str], action: &str) {
    match Command::new("systemctl").arg("--user").args(args).status() {
        Ok(s) if !s.success() => tracing::warn!("systemctl {action} exited with {s}"),
        Err(e) => tracing::warn!("Failed to run systemctl {action}: {e}"),
        Ok(_) => {}
    }
}

/// `$XDG_CONFIG_HOME/systemd/user`, else `$HOME/.config/systemd/user`.
fn service_dir() -> Result<PathBuf> {
    service_dir_from(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn service_dir_from(config_home: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf> {
    match (config_home, home) {
        (Some(config_home), _) => Ok(config_home.join("systemd/user")),
        (None, Some(home)) => Ok(home.join(".config/systemd/user")),
        (None, None) => {
            anyhow::bail!("Could not determine user config directory (HOME or XDG_CONFIG_HOME)")
        }
    }
}
