use std::{path::PathBuf, process::Command};

use time::{format_description::well_known::Rfc2822, OffsetDateTime};

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let out = PathBuf::from(std::env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    std::fs::write(
        out.join("version.rs"),
        indoc::formatdoc!(
            r#"
                pub const GIT_BRANCH: &str = "{git_branch}";
                pub const GIT_REVISION: &str = "{git_revision}";
                pub const BUILD_TIME: &str = "{build_time}";
            "#,
            git_branch = get_branch().unwrap_or_else(|| "unknown".into()),
            git_revision = get_revision().unwrap_or_else(|| "unknown".into()),
            build_time = current_time(),
        ),
    )
    .expect("write version.rs")
}

fn current_time() -> String {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&Rfc2822)
        .unwrap_or_else(|_| "unknown".into())
}

fn get_branch() -> Option<String> {
    get_git(Some("--abbrev-ref"))
}

fn get_revision() -> Option<String> {
    get_git(None).and_then(|s| s.get(..10).map(ToString::to_string))
}

fn get_git(flag: Option<&str>) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.arg("rev-parse");
    if let Some(flag) = flag {
        cmd.arg(flag);
    };
    let out = cmd.arg("@").output().ok()?;
    if !out.status.success() {
        return None;
    }

    std::str::from_utf8(&out.stdout)
        .ok()
        .map(<str>::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
