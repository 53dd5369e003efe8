use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CREDENTIAL_VARS: &[&str] = &[
    "CLOUDFLARE_ACCOUNT_ID",
    "CLOUDFLARE_NAMESPACE_ID",
    "CLOUDFLARE_API_TOKEN",
    "CLOUDFLARE_AUTH_KEY",
    "CLOUDFLARE_AUTH_EMAIL",
    "CF_ACCOUNT_ID",
    "CF_NAMESPACE_ID",
    "CF_API_TOKEN",
    "CF_AUTH_KEY",
    "CF_AUTH_EMAIL",
];

fn kvsync() -> Command {
    let mut cmd = Command::cargo_bin("kvsync").expect("kvsync binary");
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("KVSYNC_API_BASE");
    cmd
}

/// Answer a single request with `status` and `body`; yields the request line.
fn stub_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header");
            if line.trim_end().is_empty() {
                break;
            }
        }
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("respond");
        request_line.trim_end().to_string()
    });
    (base, handle)
}

#[test]
fn help_lists_subcommands() {
    kvsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn sync_help_explains_ignore_matching() {
    kvsync()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matches at any depth"))
        .stdout(predicate::str::contains("anchor at the folder root"));
}

#[test]
fn concurrency_outside_range_is_a_usage_error() {
    let site = TempDir::new().expect("site");
    for value in ["0", "1025", "18446744073709551615"] {
        kvsync()
            .arg("sync")
            .arg(site.path())
            .args(["-j", value])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("--concurrency"));
    }
}

#[test]
fn missing_credentials_fail_before_any_request() {
    let site = TempDir::new().expect("site");
    kvsync()
        .arg("sync")
        .arg(site.path())
        .arg("--api-base")
        .arg("http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLOUDFLARE_ACCOUNT_ID"));
}

#[test]
fn dry_run_against_empty_namespace_reports_every_file() {
    let site = TempDir::new().expect("site");
    std::fs::write(site.path().join("index.html"), "<h1>hi</h1>").expect("write");
    std::fs::create_dir_all(site.path().join("img")).expect("mkdir");
    std::fs::write(site.path().join("img").join("logo.svg"), "<svg/>").expect("write");
    std::fs::write(site.path().join("README.md"), "docs").expect("write");

    let (base, server) = stub_once(404, r#"{"success":false,"errors":[]}"#);

    kvsync()
        .env("CLOUDFLARE_ACCOUNT_ID", "acc")
        .env("CLOUDFLARE_NAMESPACE_ID", "ns")
        .env("CLOUDFLARE_API_TOKEN", "tok")
        .env("KVSYNC_API_BASE", &base)
        .arg("sync")
        .arg(site.path())
        .args(["--ignore", "*.md", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(Dry run, no files will be modified.)"))
        .stdout(predicate::str::contains("Upload 2 files:"))
        .stdout(predicate::str::contains("- img/logo.svg"))
        .stdout(predicate::str::contains("- index.html"))
        .stdout(predicate::str::contains("README.md").not())
        .stdout(predicate::str::contains("Remove 0 files."));

    let request = server.join().expect("stub");
    assert_eq!(
        request,
        "GET /accounts/acc/storage/kv/namespaces/ns/values/hashes HTTP/1.1"
    );
}

#[test]
fn remote_failure_exits_non_zero_with_operation() {
    let site = TempDir::new().expect("site");
    std::fs::write(site.path().join("a.txt"), "a").expect("write");
    let (base, server) = stub_once(403, "forbidden");

    kvsync()
        .env("CLOUDFLARE_ACCOUNT_ID", "acc")
        .env("CLOUDFLARE_NAMESPACE_ID", "ns")
        .env("CLOUDFLARE_API_TOKEN", "tok")
        .env("KVSYNC_API_BASE", &base)
        .arg("sync")
        .arg(site.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("get failed with HTTP 403"));

    server.join().expect("stub");
}
