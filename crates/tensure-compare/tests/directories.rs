//! Directory-level comparison and the documented comparator properties.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tensure_compare::{compare, compare_dirs, load_output, CompareError, Verdict};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn zero_record_loads_nothing_and_compares_equal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.tns", "0 0 0.0\n");
    write(dir.path(), "b.tns", "");
    assert!(load_output(&dir.path().join("a.tns")).unwrap().is_empty());

    write(dir.path(), "c.tns", "1 1 2.0\n0 0 0.0\n");
    write(dir.path(), "d.tns", "1 1 2.0\n");
    assert!(compare(&dir.path().join("c.tns"), &dir.path().join("d.tns"), 0.0)
        .unwrap()
        .is_equal());
}

#[test]
fn mixed_formats_compare_by_content() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ref.mtx", "%%MatrixMarket\n2 2 1\n1 2 3.5\n");
    write(dir.path(), "cand.ttx", "1 2 3.5\n");
    let verdict = compare(&dir.path().join("ref.mtx"), &dir.path().join("cand.ttx"), 1e-9).unwrap();
    assert_eq!(verdict, Verdict::Equal);
}

#[test]
fn dirs_agree_when_every_output_matches() {
    let reference = tempfile::tempdir().unwrap();
    let candidate = tempfile::tempdir().unwrap();
    for dir in [reference.path(), candidate.path()] {
        write(dir, "y.tns", "0 1.0\n1 2.0\n");
        write(dir, "z.mtx", "1 1 1\n1 1 5.0\n");
    }
    write(reference.path(), "stdout.log", "noise");

    let report = compare_dirs(reference.path(), candidate.path(), 1e-6).unwrap();
    assert!(report.is_equal());
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.to_string(), "2 outputs equal");
}

#[test]
fn missing_candidate_output_is_a_mismatch() {
    let reference = tempfile::tempdir().unwrap();
    let candidate = tempfile::tempdir().unwrap();
    write(reference.path(), "y.tns", "0 1.0\n");

    let report = compare_dirs(reference.path(), candidate.path(), 1e-6).unwrap();
    assert!(!report.is_equal());
    assert_eq!(report.to_string(), "y.tns: missing from candidate");
}

#[test]
fn value_disagreement_names_the_file() {
    let reference = tempfile::tempdir().unwrap();
    let candidate = tempfile::tempdir().unwrap();
    write(reference.path(), "y.tns", "0 1.0\n");
    write(candidate.path(), "y.tns", "0 1.5\n");

    let report = compare_dirs(reference.path(), candidate.path(), 1e-6).unwrap();
    let mismatch = report.first_mismatch().unwrap();
    assert_eq!(mismatch.file, "y.tns");
    assert!(matches!(mismatch.verdict, Some(Verdict::ValueMismatch { .. })));
}

#[test]
fn empty_reference_dir_is_not_agreement() {
    let reference = tempfile::tempdir().unwrap();
    let candidate = tempfile::tempdir().unwrap();
    let report = compare_dirs(reference.path(), candidate.path(), 1e-6).unwrap();
    assert!(!report.is_equal());
    assert_eq!(report.to_string(), "no comparable outputs");
}

#[test]
fn missing_reference_dir_is_not_found() {
    let candidate = tempfile::tempdir().unwrap();
    let err = compare_dirs(&candidate.path().join("nope"), candidate.path(), 1e-6).unwrap_err();
    assert!(matches!(err, CompareError::NotFound { .. }));
}
