//! Embeds git revision, build time and profile for `build_info`.

use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn set_env(key: &str, value: &str) {
    println!("cargo:rustc-env={key}={value}");
}

fn main() {
    let mut revision = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    if git(&["status", "--porcelain", "--untracked-files=no"]).is_some_and(|s| !s.is_empty()) {
        revision.push_str("-dirty");
    }
    set_env("DOCKHAND_GIT_HASH", &revision);

    let built_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    set_env("DOCKHAND_BUILD_TIMESTAMP", &built_at.to_string());

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    set_env("DOCKHAND_BUILD_PROFILE", &profile);

    for path in ["../../.git/HEAD", "../../.git/refs", "../../.git/index"] {
        println!("cargo:rerun-if-changed={path}");
    }
}
