//! Integration tests for the command line entry point

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const GRID: &str = r#"{"features":[
{"properties":{"id":"C1","xmin":0.0,"xmax":1.0,"ymin":0.0,"ymax":1.0}},
{"properties":{"id":"C2","xmin":1.0,"xmax":2.0,"ymin":0.0,"ymax":1.0}}
]}"#;

const POSTS: &str = r#"{"doc":{"coordinates":{"coordinates":[1.5,0.5]},"text":"a #one b"}},
{"doc":{"coordinates":{"coordinates":[1.2,0.2]},"text":"a #one #two b"}},
{"doc":{"coordinates":{"coordinates":[0.5,0.5]},"text":"a #two b"}}
"#;

#[test]
fn test_cli_prints_report() {
    let dir = TempDir::new().unwrap();
    let grid = dir.path().join("grid.json");
    let input = dir.path().join("posts.json");
    fs::write(&grid, GRID).unwrap();
    fs::write(&input, POSTS).unwrap();

    let mut cmd = Command::cargo_bin("geogrid-histogram").unwrap();
    cmd.arg("--grid")
        .arg(&grid)
        .arg("--input")
        .arg(&input)
        .arg("-n")
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("C2:2 posts\nC1:1 posts\n"))
        .stdout(predicate::str::contains("C2:((#one,2),(#two,1))"));
}

#[test]
fn test_cli_missing_grid_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("posts.json");
    fs::write(&input, POSTS).unwrap();

    let mut cmd = Command::cargo_bin("geogrid-histogram").unwrap();
    cmd.arg("--grid")
        .arg(dir.path().join("missing.json"))
        .arg("--input")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn test_cli_rejects_zero_workers() {
    let dir = TempDir::new().unwrap();
    let grid = dir.path().join("grid.json");
    fs::write(&grid, GRID).unwrap();

    let mut cmd = Command::cargo_bin("geogrid-histogram").unwrap();
    cmd.arg("--grid")
        .arg(&grid)
        .arg("-n")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("worker count"));
}
