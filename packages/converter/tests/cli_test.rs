//! Smoke tests for the `qti-converter` binary.

use std::fs::{self, File};
use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MANIFEST: &str = r#"<manifest><resources>
  <resource identifier="quiz1" type="imsqti_xmlv1p2/imscc_xmlv1p1/assessment">
    <file href="quiz1/assessment_qti.xml"/>
  </resource>
</resources></manifest>"#;

const QUIZ: &str = r#"<questestinterop><assessment ident="quiz1" title="Quiz"><section ident="root_section">
  <item ident="q1"><itemmetadata><qtimetadata>
    <qtimetadatafield><fieldlabel>question_type</fieldlabel><fieldentry>essay_question</fieldentry></qtimetadatafield>
  </qtimetadata></itemmetadata>
  <presentation><material><mattext>Discuss</mattext></material></presentation></item>
  <item ident="hot1"><itemmetadata><qtimetadata>
    <qtimetadatafield><fieldlabel>question_type</fieldlabel><fieldentry>hot_spot_question</fieldentry></qtimetadatafield>
  </qtimetadata></itemmetadata></item>
</section></assessment></questestinterop>"#;

fn write_course(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("course.zip");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    for (name, content) in [("imsmanifest.xml", MANIFEST), ("quiz1/assessment_qti.xml", QUIZ)] {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

#[test]
fn convert_writes_export_and_report() {
    let dir = TempDir::new().unwrap();
    let input = write_course(&dir);
    let output = dir.path().join("out.zip");
    let report = dir.path().join("report.json");

    let mut cmd = cargo_bin_cmd!("qti-converter");
    cmd.arg("convert")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--errors")
        .arg(&report);

    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("Activities: 1").and(predicate::str::contains("Errors: 1")),
        );

    assert!(output.is_file());
    let report: serde_json::Value = serde_json::from_slice(&fs::read(report).unwrap()).unwrap();
    assert_eq!(report["items"], 1);
    assert_eq!(report["errors"]["quiz1"]["hot1"][0]["error_kind"], "unsupported_question");
}

#[test]
fn convert_default_output_path() {
    let dir = TempDir::new().unwrap();
    let input = write_course(&dir);

    let mut cmd = cargo_bin_cmd!("qti-converter");
    cmd.arg("convert").arg(&input);

    cmd.assert().success();
    assert!(dir.path().join("course_learnosity.zip").is_file());
}

#[test]
fn convert_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("qti-converter");
    cmd.arg("convert").arg(dir.path().join("nope.zip"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Input archive does not exist"));
}

#[test]
fn convert_rejects_zero_question_cap() {
    let dir = TempDir::new().unwrap();
    let input = write_course(&dir);

    let mut cmd = cargo_bin_cmd!("qti-converter");
    cmd.arg("convert")
        .arg(&input)
        .arg("--max-questions-per-item")
        .arg("0");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid option"));
}
