//! Apache htpasswd compatibility tests
//!
//! These tests check that Apache's htpasswd tool accepts the files we write
//! and that files it writes survive a load/export cycle untouched.
//! Tests are only run when /usr/bin/htpasswd is available on the system.

use htpasswd_mgr::{Algorithm, Manager, Options};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const APACHE_HTPASSWD: &str = "/usr/bin/htpasswd";

fn has_apache_htpasswd() -> bool {
    Path::new(APACHE_HTPASSWD).exists()
}

struct ApacheResult {
    stderr: String,
    success: bool,
}

fn run_apache_htpasswd(args: &[&str]) -> ApacheResult {
    let output = Command::new(APACHE_HTPASSWD)
        .args(args)
        .output()
        .expect("Failed to run htpasswd");

    ApacheResult {
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
    }
}

fn create_test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn assert_apache_accepts(file: &Path, username: &str, password: &str) {
    let file = file.to_str().unwrap();

    let result = run_apache_htpasswd(&["-vb", file, username, password]);
    assert!(
        result.success,
        "Apache rejected {username}: stderr={}",
        result.stderr
    );

    let result = run_apache_htpasswd(&["-vb", file, username, "wrongpass"]);
    assert!(!result.success, "Apache accepted a wrong password for {username}");
}

#[test]
fn test_our_encodings_verify_with_apache() {
    if !has_apache_htpasswd() {
        return;
    }

    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");

    let mut manager = Manager::open(&file_path).unwrap();
    for algorithm in Algorithm::ALL {
        manager
            .add(
                algorithm.name(),
                "testpass123",
                Options::new().algorithm(algorithm),
            )
            .unwrap();
    }

    for algorithm in Algorithm::ALL {
        assert_apache_accepts(&file_path, algorithm.name(), "testpass123");
    }
}

#[test]
fn test_apache_file_round_trips() {
    if !has_apache_htpasswd() {
        return;
    }

    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");
    let file = file_path.to_str().unwrap();

    assert!(run_apache_htpasswd(&["-cmb", file, "alice", "pass1"]).success);
    assert!(run_apache_htpasswd(&["-Bb", file, "bob", "pass2"]).success);
    assert!(run_apache_htpasswd(&["-sb", file, "carol", "pass3"]).success);
    let original = std::fs::read_to_string(&file_path).unwrap();

    let manager = Manager::open(&file_path).unwrap();
    assert_eq!(manager.list(), ["alice", "bob", "carol"]);
    assert_eq!(manager.render(), original);

    manager.export().unwrap();
    assert_eq!(std::fs::read_to_string(&file_path).unwrap(), original);
}

#[test]
fn test_mixed_file_compatibility() {
    if !has_apache_htpasswd() {
        return;
    }

    let dir = create_test_dir();
    let file_path = dir.path().join("test.htpasswd");
    let file = file_path.to_str().unwrap();

    assert!(run_apache_htpasswd(&["-cBb", file, "apache_bcrypt", "pass1"]).success);

    let mut manager = Manager::open(&file_path).unwrap();
    manager
        .add(
            "our_bcrypt",
            "pass2",
            Options::deferred().algorithm(Algorithm::Bcrypt),
        )
        .unwrap();
    manager.add("our_md5", "pass3", Options::deferred()).unwrap();
    manager.export().unwrap();

    assert!(run_apache_htpasswd(&["-mb", file, "apache_md5", "pass4"]).success);

    manager.load().unwrap();
    assert_eq!(manager.len(), 4);

    for (user, pass) in [
        ("apache_bcrypt", "pass1"),
        ("our_bcrypt", "pass2"),
        ("our_md5", "pass3"),
        ("apache_md5", "pass4"),
    ] {
        assert_apache_accepts(&file_path, user, pass);
    }
}
