use std::process::Command;

/// Short commit of the checkout being built, or `GIT_COMMIT_HASH` when the
/// build environment provides one (release tarballs have no `.git`).
fn commit_hash() -> Option<String> {
    if let Ok(hash) = std::env::var("GIT_COMMIT_HASH") {
        let hash = hash.trim();
        if !hash.is_empty() && hash != "unknown" {
            return Some(hash.chars().take(12).collect());
        }
    }

    let output = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    println!("cargo::rerun-if-changed=../../.git/HEAD");
    println!("cargo::rerun-if-env-changed=GIT_COMMIT_HASH");

    let hash = commit_hash().unwrap_or_else(|| "unknown".to_string());
    println!("cargo::rustc-env=GIT_COMMIT_HASH={}", hash);
}
