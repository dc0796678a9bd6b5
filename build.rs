use std::env;
use std::process::Command;

fn main() {
    emit("SLIDESCOPE_BUILD_DATE", &chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());
    emit("SLIDESCOPE_GIT_REV", &git_revision().unwrap_or_else(|| "nogit".to_string()));
    emit("SLIDESCOPE_TARGET", &env::var("TARGET").unwrap_or_default());
    emit("SLIDESCOPE_PROFILE", &env::var("PROFILE").unwrap_or_default());

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

/// Short commit hash, suffixed with `-dirty` for uncommitted changes
fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?;
    let revision = revision.trim();
    (!revision.is_empty()).then(|| revision.to_string())
}
