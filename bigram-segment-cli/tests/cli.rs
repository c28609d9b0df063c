use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

fn data_dir() -> PathBuf {
    PathBuf::from(format!("{}/../data", env!("CARGO_MANIFEST_DIR")))
}

fn segment() -> Command {
    Command::cargo_bin("segment").expect("binary exists")
}

#[test]
fn small_model() {
    segment()
        .arg("--path")
        .arg(data_dir())
        .args(["--model", "small"])
        .write_stdin("theboywholived\nchoosespain\n")
        .assert()
        .success()
        .stdout("theboywholived\tthe boy who lived\nchoosespain\tchoose spain\n");
}

#[test]
fn max_length() {
    segment()
        .arg("--path")
        .arg(data_dir())
        .args(["--model", "small", "--max", "1"])
        .write_stdin("theboy\n")
        .assert()
        .success()
        .stdout("theboy\tt h e b o y\n");
}

#[test]
fn invalid_max_length() {
    segment().args(["--max", "0"]).assert().failure();
}

#[test]
fn missing_model() {
    let workspace = TempDir::new().expect("create tempdir");
    segment()
        .arg("--path")
        .arg(workspace.path())
        .args(["--model", "NOTFOUND"])
        .write_stdin("日本語\n")
        .assert()
        .success()
        .stdout("日本語\t日 本 語\n");
}

#[test]
fn custom_model() {
    let workspace = TempDir::new().expect("create tempdir");
    let model = workspace.path().join("tiny");
    fs::create_dir(&model).expect("create model dir");
    fs::write(model.join("total.tsv"), "100\n").expect("write total");
    fs::write(model.join("frequencies.tsv"), "日本\t40\n語\t30\n日\t5\n本語\t5\n")
        .expect("write frequencies");

    let output = segment()
        .arg("--path")
        .arg(workspace.path())
        .args(["--model", "tiny", "--score"])
        .write_stdin("日本語\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let log_prob = |freq: f64| freq.log2() - 100f64.log2();
    let score = log_prob(40.0) + (log_prob(30.0) + 0.0);
    assert_eq!(
        String::from_utf8(output).expect("output is valid UTF-8"),
        format!("日本語\t日本 語\t{}\n", score)
    );
}
