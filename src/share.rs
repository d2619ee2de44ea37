use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::{LensError, Result};

/// Hand a saved snapshot to the platform's opener, the closest native
/// equivalent of a share sheet. Platforms without one get
/// `ShareUnsupported`, surfaced to the user as a message.
pub fn share_file(path: &Path) -> Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "linux") {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        return Err(LensError::ShareUnsupported(
            "no opener for this platform".to_string(),
        ));
    };

    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| LensError::ShareUnsupported(e.to_string()))?;

    info!(path = %path.display(), "snapshot handed to platform opener");
    Ok(())
}
