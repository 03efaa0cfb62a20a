use std::process::Command;

fn git(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=TUG_VERSION");

    let version =
        std::env::var("TUG_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=TUG_VERSION={}", version);
    println!("cargo:rustc-env=TUG_GIT_COMMIT={}", git(&["rev-parse", "--short", "HEAD"]));
    println!(
        "cargo:rustc-env=TUG_BUILD_TIME={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!("cargo:rustc-env=TUG_TARGET_TRIPLE={}", target);
    println!("cargo:rustc-env=TUG_BUILD_MODE={}", profile);
}
