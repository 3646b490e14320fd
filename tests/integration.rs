use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixtures() -> PathBuf {
    return Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
}

fn snipref(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_snipref"));
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn git(dir: &Path, args: &[&str]) {
    let out = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.email=dev@example.com", "-c", "user.name=Dev", "-c", "commit.gpgsign=false"])
        .args(args)
        .output()
        .unwrap();
    assert!(out.status.success(), "git {args:?} failed: {}", stderr(&out));
}

/// Scratch repo with one commit holding `api.cpp`, then a second commit that
/// adds `send` and touches `open`.
fn scratch_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q", "-b", "main"]);
    std::fs::write(
        dir.path().join("api.cpp"),
        "int open(int fd) {\n    return fd;\n}\n\nint close(int fd) {\n    return 0;\n}\n",
    )
    .unwrap();
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);

    std::fs::write(
        dir.path().join("api.cpp"),
        "int open(int fd) {\n    //@@start open-body\n    return fd + 1;\n    //@@end open-body\n}\n\nint close(int fd) {\n    return 0;\n}\n\nint send(int fd) {\n    return fd;\n}\n",
    )
    .unwrap();
    git(dir.path(), &["commit", "-q", "-am", "grow api"]);
    dir
}

#[test]
fn extract_prints_a_numbered_block() {
    let out = snipref(&fixtures()).args(["extract", "shapes.cpp", "--struct", "SimpleStruct"]).output().unwrap();
    assert!(out.status.success(), "extract failed: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "📍 `shapes.cpp:5-8`\n\n```cpp\n   5 struct SimpleStruct {\n   6     int x;\n   7     int y;\n   8 };\n```\n"
    );
}

#[test]
fn extract_raw_overload_by_signature() {
    let out = snipref(&fixtures())
        .args(["extract", "overloads.cpp", "--function", "process", "--signature", "double", "--raw"])
        .output()
        .unwrap();
    assert!(out.status.success(), "extract failed: {}", stderr(&out));
    assert!(stdout(&out).contains("double value"));
}

#[test]
fn extract_proto_message_marker() {
    let out = snipref(&fixtures())
        .args(["extract", "ledger.proto", "--message", "LedgerEntry", "--marker", "entry-fields", "--raw"])
        .output()
        .unwrap();
    assert!(out.status.success(), "extract failed: {}", stderr(&out));
    assert_eq!(stdout(&out), "  string id = 1;\n  Kind kind = 2;\n");
}

#[test]
fn missing_target_is_a_markdown_diagnostic() {
    let out = snipref(&fixtures()).args(["extract", "shapes.cpp", "--function", "make"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("# Error: Not Found"), "stderr: {err}");
    assert!(err.contains("function `make`"), "stderr: {err}");
}

#[test]
fn two_selectors_are_rejected() {
    let out = snipref(&fixtures())
        .args(["extract", "shapes.cpp", "--function", "describe", "--var", "kMaxRetries"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("# Error: Invalid Selector"));
}

#[test]
fn markers_lists_the_table() {
    let out = snipref(&fixtures()).args(["markers", "macros.cpp"]).output().unwrap();
    assert!(out.status.success(), "markers failed: {}", stderr(&out));
    assert_eq!(stdout(&out), "accept-body 13-13\n");
}

#[test]
fn render_writes_the_output_next_to_the_template() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixtures().join("macros.cpp"), dir.path().join("macros.cpp")).unwrap();
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    std::fs::copy(fixtures().join("guide.md.j2"), dir.path().join("docs/guide.md.j2")).unwrap();

    let out = snipref(dir.path()).args(["render", "docs"]).output().unwrap();
    assert!(out.status.success(), "render failed: {}", stderr(&out));

    let rendered = std::fs::read_to_string(dir.path().join("docs/guide.md")).unwrap();
    assert!(rendered.starts_with("# Handlers\n"));
    assert!(rendered.contains("📍 `macros.cpp:13`\n\n```cpp\n  13     ctx.session().accept(data);\n```"));
    assert!(rendered.contains("📍 `macros.cpp:4`\n\n```cpp\n#define MIN(a, b) ((a) < (b) ? (a) : (b))\n```"));
    assert!(rendered.contains("{{ page_title }}"));
}

#[test]
fn render_strict_fails_on_inline_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(fixtures().join("shapes.cpp"), dir.path().join("shapes.cpp")).unwrap();
    std::fs::write(dir.path().join("bad.md.j2"), "{{ code('shapes.cpp', function='make') }}\n").unwrap();

    let out = snipref(dir.path())
        .args(["render", "bad.md.j2", "-", "--strict", "--collect-error-fixtures"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).starts_with("❌ **ERROR**: function `make` not found in"));
    assert!(dir.path().join("tests/fixtures/collected/shapes.cpp").is_file());
    assert!(dir.path().join("tests/fixtures/collected/manifest.json").is_file());
}

#[test]
fn changes_groups_regions_by_file() {
    let repo = scratch_repo();
    let out = snipref(repo.path()).args(["changes", "HEAD~1"]).output().unwrap();
    assert!(out.status.success(), "changes failed: {}", stderr(&out));
    // Whole new file region: hunk context and additions merge into one span.
    assert_eq!(stdout(&out), "api.cpp\n  1-13\n");
}

#[test]
fn changes_default_base_is_the_fork_point_from_main() {
    let repo = scratch_repo();
    git(repo.path(), &["checkout", "-q", "-b", "feature"]);
    let source = std::fs::read_to_string(repo.path().join("api.cpp")).unwrap();
    std::fs::write(repo.path().join("api.cpp"), source.replace("    return fd;\n}\n", "    return fd * 2;\n}\n")).unwrap();
    git(repo.path(), &["commit", "-q", "-am", "double send"]);
    std::fs::write(repo.path().join("wire.h"), "int wire();\n").unwrap();
    git(repo.path(), &["add", "wire.h"]);
    git(repo.path(), &["commit", "-q", "-m", "add wire"]);

    let out = snipref(repo.path()).arg("changes").output().unwrap();
    assert!(out.status.success(), "changes failed: {}", stderr(&out));
    // Both branch commits, and nothing from main's own history.
    assert_eq!(stdout(&out), "api.cpp\n  9-13\nwire.h\n  1-1\n");
}

#[test]
fn verify_changes_reports_and_clears_uncovered_regions() {
    let repo = scratch_repo();
    std::fs::write(repo.path().join("partial.md.j2"), "{{ code('api.cpp', function='send') }}\n").unwrap();
    let out = snipref(repo.path())
        .args(["render", "partial.md.j2", "-", "-V", "HEAD~1", "--strict"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let report = stdout(&out);
    assert!(report.contains("Uncovered changes"), "stdout: {report}");
    assert!(report.contains("  1-10"), "stdout: {report}");
    assert!(report.contains("   3     return fd + 1;"), "stdout: {report}");

    std::fs::write(
        repo.path().join("full.md.j2"),
        "{{ code('api.cpp', function='send') }}\n{{ ignore_changes('api.cpp') }}\n",
    )
    .unwrap();
    let out = snipref(repo.path())
        .args(["render", "full.md.j2", "-", "-V", "HEAD~1", "--strict"])
        .output()
        .unwrap();
    assert!(out.status.success(), "render failed: {}", stderr(&out));
    assert!(stdout(&out).contains("All changes are covered by documentation."));
}

#[test]
fn find_markers_lists_and_removes_directives() {
    let repo = scratch_repo();
    let out = snipref(repo.path()).args(["find-markers", "--since", "HEAD~1"]).output().unwrap();
    assert!(out.status.success(), "find-markers failed: {}", stderr(&out));
    assert_eq!(stdout(&out), "api.cpp:2: //@@start open-body\napi.cpp:4: //@@end open-body\n");

    let out = snipref(repo.path()).args(["find-markers", "--since", "HEAD~1", "--remove"]).output().unwrap();
    assert!(out.status.success(), "find-markers --remove failed: {}", stderr(&out));
    let source = std::fs::read_to_string(repo.path().join("api.cpp")).unwrap();
    assert!(!source.contains("//@@"));
    assert!(source.starts_with("int open(int fd) {\n    return fd + 1;\n}\n"));
}

#[test]
fn bad_diff_base_is_a_diff_failure() {
    let repo = scratch_repo();
    let out = snipref(repo.path()).args(["changes", "no-such-ref"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("# Error: Diff Failed"));
}
