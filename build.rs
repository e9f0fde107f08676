//! Embeds the build's git identity for `photoforge --version`.
//!
//! A build counts as a release only when HEAD carries the tag
//! `v{CARGO_PKG_VERSION}`; every other build reports `dev@<hash>`.

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    let mut hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_default();
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
        .is_some_and(|status| !status.is_empty());
    if dirty && !hash.is_empty() {
        hash.push_str("-dirty");
    }

    let version_tag = format!("v{}", env!("CARGO_PKG_VERSION"));
    let release = git(&["tag", "--points-at", "HEAD"])
        .is_some_and(|tags| tags.lines().any(|t| t.trim() == version_tag));

    println!("cargo:rustc-env=PHOTOFORGE_GIT_HASH={hash}");
    println!("cargo:rustc-env=PHOTOFORGE_RELEASE_BUILD={}", release && !dirty);
}
