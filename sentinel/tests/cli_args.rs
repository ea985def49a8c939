//! CLI arg parsing tests for the sentinel client.

use assert_cmd::Command;

fn run(args: &[&str]) -> (bool, String) {
    let td = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("sentinel")
        .unwrap()
        .env("XDG_CONFIG_HOME", td.path())
        .args(args)
        .output()
        .unwrap();
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    (out.status.success(), text)
}

#[test]
fn help_mentions_short_and_long_flags() {
    let (ok, text) = run(&["--help"]);
    assert!(ok);
    assert!(
        text.contains("--tls-ca")
            && text.contains("-t")
            && text.contains("--profile")
            && text.contains("-P")
            && text.contains("--dry-run"),
        "help text missing expected flags\n{text}"
    );
}

#[test]
fn flags_are_accepted_before_help() {
    for args in [
        ["--tls-ca", "/tmp/cert.pem", "--help"],
        ["-t", "/tmp/cert.pem", "--help"],
        ["--profile", "dev", "--help"],
    ] {
        let (ok, text) = run(&args);
        assert!(ok, "{args:?} failed");
        assert!(text.contains("Usage:"));
    }
}

#[test]
fn dry_run_prints_resolved_backend() {
    let (ok, text) = run(&["--dry-run", "http://127.0.0.1:8000"]);
    assert!(ok);
    assert!(text.contains("backend: http://127.0.0.1:8000"), "{text}");

    let (ok, text) = run(&["--demo", "--dry-run"]);
    assert!(ok);
    assert!(text.contains("127.0.0.1:3231"), "{text}");
}

#[test]
fn no_url_and_no_profiles_exits_cleanly() {
    let (ok, text) = run(&[]);
    assert!(ok);
    assert!(text.contains("No URL provided"));
}

#[test]
fn extra_positional_is_reported() {
    let (_, text) = run(&["http://a:1", "http://b:2"]);
    assert!(text.contains("Unexpected argument"));
}
