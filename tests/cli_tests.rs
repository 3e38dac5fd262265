//! Command-line tests for `pgs-match match`

use std::fs;
use std::io::Read;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const SCOREFILE: &str = "chr_name\tchr_position\teffect_allele\tother_allele\teffect_weight\taccession
1\t1000\tA\tG\t0.5\tPGS1
1\t2000\tC\tT\t0.2\tPGS1
2\t500\tG\tA\t1.0\tPGS2
2\t600\tT\tC\t1.0\tPGS2
";

const BIM: &str = "1\trs123\t0\t1000\tG\tA
1\trs2000\t0\t2000\tC\tT
2\trs500\t0\t500\tA\tG
";

fn setup(dir: &Path) {
    fs::write(dir.join("scores.txt"), SCOREFILE).unwrap();
    fs::write(dir.join("cohort.bim"), BIM).unwrap();
}

fn pgs_match(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pgs-match").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_match_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    pgs_match(dir.path())
        .args([
            "match",
            "--scorefile",
            "scores.txt",
            "--target",
            "cohort.bim",
            "--dataset",
            "cohort",
            "--outdir",
            "out",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("PGS1"))
        .stdout(predicate::str::contains("100.00%"))
        .stdout(predicate::str::contains("50.00%"));

    let out = dir.path().join("out");
    let pgs1 = fs::read_to_string(out.join("cohort_PGS1.scorefile")).unwrap();
    assert!(pgs1.contains("rs123\t1\t1000\tA\tG\t0.5\tPGS1\tadditive"));
    assert!(out.join("cohort_PGS2.scorefile").exists());
    assert!(!out.join("cohort_ALL.scorefile").exists());

    let mut log = String::new();
    flate2::read::MultiGzDecoder::new(fs::File::open(out.join("cohort_log.csv.gz")).unwrap())
        .read_to_string(&mut log)
        .unwrap();
    // header plus one line per scoring-file row
    assert_eq!(log.lines().count(), 5);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("cohort_summary.json")).unwrap()).unwrap();
    assert_eq!(summary["dataset"], "cohort");
}

#[test]
fn test_no_split_and_repeatable_outputs() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let args = [
        "match",
        "--scorefile",
        "scores.txt",
        "--target",
        "cohort.bim",
        "--dataset",
        "cohort",
        "--no-split",
        "--no-log",
    ];
    pgs_match(dir.path()).args(args).assert().success();
    let first = fs::read(dir.path().join("cohort_ALL.scorefile")).unwrap();
    pgs_match(dir.path()).args(args).assert().success();
    let second = fs::read(dir.path().join("cohort_ALL.scorefile")).unwrap();

    assert_eq!(first, second);
    assert!(!dir.path().join("cohort_log.csv.gz").exists());
}

#[test]
fn test_min_overlap_failure() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    pgs_match(dir.path())
        .args([
            "match",
            "--scorefile",
            "scores.txt",
            "--target",
            "cohort.bim",
            "--dataset",
            "cohort",
            "--min-overlap",
            "0.75",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PGS2 (50.00%)"));

    // No scoring file is written when aborting, but the log explains why
    assert!(!dir.path().join("cohort_PGS1.scorefile").exists());
    assert!(dir.path().join("cohort_log.csv.gz").exists());
}

#[test]
fn test_min_overlap_exclude_failing() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    pgs_match(dir.path())
        .args([
            "--format",
            "tsv",
            "match",
            "--scorefile",
            "scores.txt",
            "--target",
            "cohort.bim",
            "--dataset",
            "cohort",
            "--min-overlap",
            "0.75",
            "--exclude-failing",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("accession\tvariants_matched"))
        .stdout(predicate::str::contains("PGS2\t1\t2\t0.5000"));

    assert!(dir.path().join("cohort_PGS1.scorefile").exists());
    assert!(!dir.path().join("cohort_PGS2.scorefile").exists());
}

#[test]
fn test_json_format() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let output = pgs_match(dir.path())
        .args([
            "match",
            "--scorefile",
            "scores.txt",
            "--target",
            "cohort.bim",
            "--dataset",
            "cohort",
            "--format",
            "json",
            "--no-log",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["accessions"].as_array().unwrap().len(), 2);
    assert_eq!(json["statistics"]["matched"], 3);
}

#[test]
fn test_invalid_arguments() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    pgs_match(dir.path())
        .args([
            "match", "--scorefile", "scores.txt", "--target", "cohort.bim", "--dataset", "../x",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid label"));

    pgs_match(dir.path())
        .args([
            "match",
            "--scorefile",
            "scores.txt",
            "--target",
            "cohort.bim",
            "--dataset",
            "cohort",
            "--min-overlap",
            "1.5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid fraction"));
}

#[test]
fn test_malformed_scorefile_names_line() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    fs::write(
        dir.path().join("bad.txt"),
        "chr_name\tchr_position\teffect_allele\teffect_weight\taccession\n1\tabc\tA\t1\tPGS9\n",
    )
    .unwrap();

    pgs_match(dir.path())
        .args([
            "match",
            "--scorefile",
            "bad.txt",
            "--target",
            "cohort.bim",
            "--dataset",
            "cohort",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.txt:2 (PGS9)"));
}

#[test]
fn test_exclude_failing_still_fails_on_missing_accession() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    pgs_match(dir.path())
        .args([
            "match",
            "--scorefile",
            "scores.txt",
            "--target",
            "cohort.bim",
            "--dataset",
            "cohort",
            "--accession",
            "PGS1",
            "--accession",
            "PGS404",
            "--exclude-failing",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No variants loaded for accession(s): PGS404"));

    assert!(!dir.path().join("cohort_PGS1.scorefile").exists());
    assert!(dir.path().join("cohort_summary.json").exists());
}

#[test]
fn test_rerun_leaves_no_stale_scorefiles() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    let base = [
        "match",
        "--scorefile",
        "scores.txt",
        "--target",
        "cohort.bim",
        "--dataset",
        "cohort",
    ];

    pgs_match(dir.path()).args(base).assert().success();
    assert!(dir.path().join("cohort_PGS1.scorefile").exists());
    assert!(dir.path().join("cohort_PGS2.scorefile").exists());

    // PGS2 drops out; its file from the first run goes with it
    pgs_match(dir.path())
        .args(base)
        .args(["--min-overlap", "0.75", "--exclude-failing"])
        .assert()
        .success();
    assert!(dir.path().join("cohort_PGS1.scorefile").exists());
    assert!(!dir.path().join("cohort_PGS2.scorefile").exists());

    pgs_match(dir.path())
        .args(base)
        .args(["--min-overlap", "0.9"])
        .assert()
        .failure();
    assert!(!dir.path().join("cohort_PGS1.scorefile").exists());

    let summary: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("cohort_summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["files"].as_array().unwrap().len(), 0);
}

#[test]
fn test_verbose_load_count_skips_repeated_rows() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    fs::write(
        dir.path().join("repeated.bim"),
        format!("{BIM}1\trs123\t0\t1000\tG\tA\n"),
    )
    .unwrap();

    pgs_match(dir.path())
        .args([
            "--verbose",
            "match",
            "--scorefile",
            "scores.txt",
            "--target",
            "repeated.bim",
            "--dataset",
            "cohort",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Loaded 3 target variants from repeated.bim"));
}
