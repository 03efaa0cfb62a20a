//! Build metadata for `tug --version`.
//!
//! The `TUG_*` variables are set by `build.rs`.

macro_rules! build_env {
    ($name:ident) => {
        env!(concat!("TUG_", stringify!($name)))
    };
}

pub const PROJECT_NAME: &str = "tug";
pub const VERSION: &str = build_env!(VERSION);
pub const GIT_COMMIT: &str = build_env!(GIT_COMMIT);
pub const BUILD_TIME: &str = build_env!(BUILD_TIME);
pub const TARGET_TRIPLE: &str = build_env!(TARGET_TRIPLE);
pub const BUILD_MODE: &str = build_env!(BUILD_MODE);

/// `tug <version>`
pub fn get_version_string() -> String {
    format!("{} {}", PROJECT_NAME, VERSION)
}

/// Version plus build time, mode, target and commit.
pub fn get_verbose_version_string() -> String {
    format!(
        "{}\ncommit: {}\nbuilt:  {} ({})\ntarget: {}",
        get_version_string(),
        GIT_COMMIT,
        BUILD_TIME,
        BUILD_MODE,
        TARGET_TRIPLE,
    )
}

pub fn get_version() -> &'static str {
    VERSION
}
