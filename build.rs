// ScoreCrab - GPL-3.0-or-later
// Build script to embed version info at compile time

use std::process::Command;

fn git_output(args: &[&str]) -> Option<Vec<u8>> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| output.stdout)
}

fn main() {
    let git_hash = git_output(&["rev-parse", "--short", "HEAD"])
        .and_then(|stdout| String::from_utf8(stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string());

    // Dirty means uncommitted changes in the working tree
    let is_dirty = git_output(&["status", "--porcelain"]).is_some_and(|stdout| !stdout.is_empty());

    let git_hash = if is_dirty {
        format!("{git_hash}-dirty")
    } else {
        git_hash
    };

    println!("cargo:rustc-env=GIT_HASH={git_hash}");

    // Rerun if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
