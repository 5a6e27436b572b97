//! tar1090 front-end installation and updates via git.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use adsb_dash_core::{DashError, Result};

pub const TAR1090_REPO: &str = "https://github.com/wiedehopf/tar1090.git";
pub const TAR1090_DIR: &str = "/var/www/tar1090";

const PULL_TIMEOUT: Duration = Duration::from_secs(30);
const CLONE_TIMEOUT: Duration = Duration::from_secs(60);
const CHOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Manages the tar1090 checkout served by nginx.
pub struct Tar1090Updater {
    install_dir: PathBuf,
    html_dir: PathBuf,
}

impl Tar1090Updater {
    pub fn new(install_dir: impl AsRef<Path>) -> Self {
        let install_dir = install_dir.as_ref().to_path_buf();
        let html_dir = install_dir.join("html");
        Tar1090Updater {
            install_dir,
            html_dir,
        }
    }

    pub fn html_dir(&self) -> &Path {
        &self.html_dir
    }

    /// True when the static bundle is present.
    pub fn is_installed(&self) -> bool {
        self.html_dir.join("index.html").exists()
    }

    /// Clone tar1090, or pull if a checkout already exists.
    pub async fn update(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.install_dir).await?;
        let dir = self.install_dir.to_string_lossy().to_string();

        let output = if self.install_dir.join(".git").exists() {
            info!(dir = %dir, "updating existing tar1090 installation");
            run(Command::new("git").args(["-C", dir.as_str(), "pull"]), PULL_TIMEOUT).await?
        } else {
            info!(dir = %dir, "cloning tar1090");
            run(
                Command::new("git").args(["clone", "--depth", "1", TAR1090_REPO, dir.as_str()]),
                CLONE_TIMEOUT,
            )
            .await?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DashError::Update(format!("git failed: {}", stderr.trim())));
        }

        if !self.html_dir.exists() {
            return Err(DashError::Update(format!(
                "HTML directory not found: {}",
                self.html_dir.display()
            )));
        }

        // Ownership is best effort; nginx can usually read the files anyway.
        match run(Command::new("chown").args(["-R", "nginx:nginx", dir.as_str()]), CHOWN_TIMEOUT).await {
            Ok(o) if o.status.success() => {}
            Ok(o) => warn!(status = %o.status, "chown of tar1090 failed"),
            Err(e) => warn!(error = %e, "chown of tar1090 failed"),
        }

        info!("tar1090 updated successfully");
        Ok(())
    }
}

async fn run(cmd: &mut Command, timeout: Duration) -> Result<Output> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(DashError::Update(format!(
            "command timed out after {}s",
            timeout.as_secs()
        ))),
    }
}
