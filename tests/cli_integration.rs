//! CLI integration tests for fp.
//!
//! These tests run the binary against catalogs written to temp dirs.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const ORCHARD: &str = r#"
[fragment.fruit]
attr.colour = { values = ["red", "green", "yellow"], alias = ["aspect"] }
attr.producer = { default = "Jacques" }

[[candidate]]
name = "apple"
tags = ["fruit"]
extends = ["fruit"]
info = "Crunchy"

[[candidate]]
name = "vintage"
tags = ["fruit"]
extends = ["fruit"]
priority = "toolbox"
only.harvest = { in = [2001, 2007] }

[[candidate]]
name = "pear"
tags = ["fruit"]
attr.colour = { values = ["green"] }
attr.origin = { optional = true, outcast = ["Scotland", "Ireland"] }
"#;

/// Get the fp binary command, isolated from any user config.
fn fp(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fp").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env_remove("FOOTPRINTS_CONFIG");
    cmd
}

/// Write the orchard catalog into a fresh temp dir.
fn orchard() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("orchard.toml");
    fs::write(&path, ORCHARD).unwrap();
    (tmp, path)
}

// ============================================================================
// fp resolve
// ============================================================================

#[test]
fn test_resolve_prints_winner_and_bound_values() {
    let (tmp, catalog) = orchard();
    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "fruit", "colour=red"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apple colour=red producer=Jacques"));
}

#[test]
fn test_resolve_alias() {
    let (tmp, catalog) = orchard();
    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "fruit", "aspect=yellow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apple colour=yellow"));
}

#[test]
fn test_resolve_context_enables_only_rule() {
    let (tmp, catalog) = orchard();
    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "fruit", "colour=red", "--context", "harvest=2007"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("vintage "));
}

#[test]
fn test_resolve_context_from_config() {
    let (tmp, catalog) = orchard();
    let config = tmp.path().join("fp.toml");
    fs::write(&config, "[defaults]\nharvest = 2001\n").unwrap();
    fp(&tmp)
        .arg("--config")
        .arg(&config)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "fruit", "colour=green"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("vintage "));
}

#[test]
fn test_resolve_no_match_fails_with_report() {
    let (tmp, catalog) = orchard();
    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "fruit", "colour=blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no `fruit` candidate matches the description"))
        .stderr(predicate::str::contains("`pear` rejected"))
        .stderr(predicate::str::contains("fp attrmap"));
}

#[test]
fn test_resolve_json_report() {
    let (tmp, catalog) = orchard();
    let output = fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "fruit", "colour=green", "origin=Scotland", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tag"], "fruit");
    assert_eq!(report["ranked"][0]["candidate"], "apple");
    let pear = &report["rejected"][1];
    assert_eq!(pear["candidate"], "pear");
    assert_eq!(pear["attributes"][0]["reason"]["kind"], "outcast_value");
}

#[test]
fn test_resolve_strict_ambiguity() {
    let tmp = TempDir::new().unwrap();
    let catalog = tmp.path().join("twins.toml");
    fs::write(
        &catalog,
        "[[candidate]]\nname = \"a\"\ntags = [\"t\"]\nattr.x = {}\n\n[[candidate]]\nname = \"b\"\ntags = [\"t\"]\nattr.x = {}\n",
    )
    .unwrap();

    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "t", "x=1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("a "))
        .stderr(predicate::str::contains("tie for the top rank"));

    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "t", "x=1", "--strict"])
        .assert()
        .failure();
}

#[test]
fn test_resolve_unknown_tag() {
    let (tmp, catalog) = orchard();
    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "vegetable"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no candidates are registered under `vegetable`"));
}

#[test]
fn test_resolve_bad_catalog() {
    let tmp = TempDir::new().unwrap();
    let catalog = tmp.path().join("bad.toml");
    fs::write(
        &catalog,
        "[[candidate]]\nname = \"bare\"\ntags = [\"t\"]\nattr.x = { default = 1 }\n",
    )
    .unwrap();
    fp(&tmp)
        .arg("resolve")
        .arg(&catalog)
        .args(["--tag", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot register `bare`"))
        .stderr(predicate::str::contains("[[candidate]]"));
}

// ============================================================================
// introspection
// ============================================================================

#[test]
fn test_entries() {
    let (tmp, catalog) = orchard();
    fp(&tmp)
        .arg("entries")
        .arg(&catalog)
        .args(["--tag", "fruit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apple"))
        .stdout(predicate::str::contains("TOOLBOX"))
        .stdout(predicate::str::contains("Crunchy"));
}

#[test]
fn test_attrmap_only() {
    let (tmp, catalog) = orchard();
    fp(&tmp)
        .arg("attrmap")
        .arg(&catalog)
        .args(["--tag", "fruit", "--only", "origin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("origin [optional]"))
        .stdout(predicate::str::contains("outcast: Ireland, Scotland"))
        .stdout(predicate::str::contains("colour").not());
}

#[test]
fn test_priorities() {
    let tmp = TempDir::new().unwrap();
    fp(&tmp)
        .arg("priorities")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 NONE"))
        .stdout(predicate::str::contains("3 DEBUG"));
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();
    fp(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fp"));
}
