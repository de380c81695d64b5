//! JUnit-style XML test report normalization.
//!
//! `roxmltree` performs no DTD processing or external entity resolution.
//! Malformed XML fails the whole artifact with a `Parse` error naming the
//! underlying XML error; there are never partial results.

use std::io::{Cursor, Read};

use roxmltree::{Document, Node};
use tracing::warn;
use zip::ZipArchive;

use crate::domain::{AutoQaError, NormalizedTestResult, Result, TestStatus};

/// Normalize a downloaded workflow artifact into test results.
///
/// Workflow artifacts arrive as zip archives; every `.xml` member is
/// parsed and members that fail to parse are logged and skipped. Bytes
/// without a zip signature are treated as a raw XML report. An archive
/// that cannot be opened fails the whole artifact with a `Parse` error.
pub fn parse_junit_artifact(bytes: &[u8]) -> Result<Vec<NormalizedTestResult>> {
    if !has_zip_signature(bytes) {
        return parse_junit(bytes);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AutoQaError::Parse(format!("unreadable artifact archive: {e}")))?;

    let mut results = Vec::new();
    for index in 0..archive.len() {
        let mut member = match archive.by_index(index) {
            Ok(member) => member,
            Err(e) => {
                warn!(event = "report.member_unreadable", index, error = %e);
                continue;
            }
        };
        let name = member.name().to_string();
        if !name.to_lowercase().ends_with(".xml") {
            continue;
        }
        let mut content = Vec::new();
        if let Err(e) = member.read_to_end(&mut content) {
            warn!(event = "report.member_unreadable", member = %name, error = %e);
            continue;
        }
        match parse_junit(&content) {
            Ok(parsed) => results.extend(parsed),
            Err(e) => {
                warn!(event = "report.member_skipped", member = %name, error = %e);
            }
        }
    }
    Ok(results)
}

fn has_zip_signature(bytes: &[u8]) -> bool {
    // Local-file-header magic, or the end-of-central-directory magic an
    // empty archive starts with.
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06")
}

/// Parse a JUnit XML report into normalized results.
///
/// Accepts a root of `testsuites` (iterating child `testsuite` elements,
/// or treating the root itself as one suite when it has none) or a bare
/// `testsuite`. Classname falls back to the owning suite's name. Status is
/// determined by child-element precedence: failure > error > skipped >
/// passed.
pub fn parse_junit(xml_bytes: &[u8]) -> Result<Vec<NormalizedTestResult>> {
    let text = std::str::from_utf8(xml_bytes)
        .map_err(|e| AutoQaError::Parse(format!("test report is not valid UTF-8: {e}")))?;
    let doc = Document::parse(text)
        .map_err(|e| AutoQaError::Parse(format!("invalid JUnit XML: {e}")))?;

    let root = doc.root_element();
    let mut results = Vec::new();

    match root.tag_name().name() {
        "testsuites" => {
            let suites: Vec<Node> = root
                .children()
                .filter(|n| n.has_tag_name("testsuite"))
                .collect();
            if suites.is_empty() {
                collect_suite(root, &mut results);
            } else {
                for suite in suites {
                    collect_suite(suite, &mut results);
                }
            }
        }
        "testsuite" => collect_suite(root, &mut results),
        other => {
            return Err(AutoQaError::Parse(format!(
                "unexpected root element in test report: {other}"
            )))
        }
    }

    Ok(results)
}

fn collect_suite(suite: Node, results: &mut Vec<NormalizedTestResult>) {
    let suite_name = suite.attribute("name").unwrap_or("");

    for case in suite.descendants().filter(|n| n.has_tag_name("testcase")) {
        let name = case.attribute("name").unwrap_or("").to_string();
        let classname = case
            .attribute("classname")
            .filter(|c| !c.is_empty())
            .or(if suite_name.is_empty() { None } else { Some(suite_name) })
            .map(str::to_string);
        let duration = case.attribute("time").and_then(|t| t.parse().ok());

        let child = |tag: &str| case.children().find(|n| n.has_tag_name(tag));

        let (status, detail) = if let Some(failure) = child("failure") {
            (TestStatus::Failed, Some(failure))
        } else if let Some(error) = child("error") {
            (TestStatus::Error, Some(error))
        } else if child("skipped").is_some() {
            (TestStatus::Skipped, None)
        } else {
            (TestStatus::Passed, None)
        };

        let failure_message = detail.and_then(|n| n.text()).map(str::to_string);
        let failure_type = detail
            .and_then(|n| n.attribute("type"))
            .map(str::to_string);

        results.push(NormalizedTestResult {
            name,
            classname,
            status,
            duration,
            failure_message,
            failure_type,
            stdout: child("system-out").and_then(|n| n.text()).map(str::to_string),
            stderr: child("system-err").and_then(|n| n.text()).map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_testsuite() {
        let xml = br#"<testsuite name="auth">
            <testcase name="test_validate_email_autoqa" classname="tests.auth" time="0.12"/>
            <testcase name="test_reject_bad_email_autoqa">
                <failure type="AssertionError">expected rejection</failure>
            </testcase>
        </testsuite>"#;
        let results = parse_junit(xml).expect("parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, TestStatus::Passed);
        assert_eq!(results[0].classname.as_deref(), Some("tests.auth"));
        assert_eq!(results[0].duration, Some(0.12));
        assert_eq!(results[1].status, TestStatus::Failed);
        assert_eq!(results[1].failure_message.as_deref(), Some("expected rejection"));
        assert_eq!(results[1].failure_type.as_deref(), Some("AssertionError"));
    }

    #[test]
    fn test_parse_testsuites_root() {
        let xml = br#"<testsuites>
            <testsuite name="suite_a"><testcase name="t1"/></testsuite>
            <testsuite name="suite_b"><testcase name="t2"><skipped/></testcase></testsuite>
        </testsuites>"#;
        let results = parse_junit(xml).expect("parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].status, TestStatus::Skipped);
    }

    #[test]
    fn test_classname_falls_back_to_suite_name() {
        let xml = br#"<testsuite name="integration"><testcase name="t1"/></testsuite>"#;
        let results = parse_junit(xml).expect("parse");
        assert_eq!(results[0].classname.as_deref(), Some("integration"));
    }

    #[test]
    fn test_failure_takes_precedence_over_skipped() {
        let xml = br#"<testsuite name="s">
            <testcase name="t1">
                <failure>boom</failure>
                <skipped/>
            </testcase>
        </testsuite>"#;
        let results = parse_junit(xml).expect("parse");
        assert_eq!(results[0].status, TestStatus::Failed);
    }

    #[test]
    fn test_error_classification_and_streams() {
        let xml = br#"<testsuite name="s">
            <testcase name="t1">
                <error type="RuntimeError">kaboom</error>
                <system-out>stdout text</system-out>
                <system-err>stderr text</system-err>
            </testcase>
        </testsuite>"#;
        let results = parse_junit(xml).expect("parse");
        assert_eq!(results[0].status, TestStatus::Error);
        assert_eq!(results[0].failure_type.as_deref(), Some("RuntimeError"));
        assert_eq!(results[0].stdout.as_deref(), Some("stdout text"));
        assert_eq!(results[0].stderr.as_deref(), Some("stderr text"));
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = parse_junit(b"<testsuite><unclosed").unwrap_err();
        assert!(matches!(err, AutoQaError::Parse(_)));
        assert!(err.to_string().contains("invalid JUnit XML"));
    }

    #[test]
    fn test_unexpected_root_rejected() {
        let err = parse_junit(b"<report/>").unwrap_err();
        assert!(matches!(err, AutoQaError::Parse(_)));
    }

    #[test]
    fn test_testsuites_without_children_treated_as_suite() {
        let xml = br#"<testsuites name="flat"><testcase name="t1"/></testsuites>"#;
        let results = parse_junit(xml).expect("parse");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].classname.as_deref(), Some("flat"));
    }

    fn archive_of(members: &[(&str, &[u8])]) -> Vec<u8> {
        use std::io::Write;

        use zip::write::SimpleFileOptions;

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start member");
            writer.write_all(content).expect("write member");
        }
        writer.finish().expect("finish archive");
        cursor.into_inner()
    }

    const SUITE_XML: &[u8] =
        br#"<testsuite name="s"><testcase name="t1"/><testcase name="t2"/></testsuite>"#;

    #[test]
    fn test_artifact_archive_members_parsed() {
        let bytes = archive_of(&[("report.xml", SUITE_XML)]);
        let results = parse_junit_artifact(&bytes).expect("parse archive");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "t1");
    }

    #[test]
    fn test_artifact_skips_non_xml_and_bad_members() {
        let bytes = archive_of(&[
            ("summary.txt", b"2 passed"),
            ("broken.xml", b"<testsuite><unclosed"),
            ("report.xml", SUITE_XML),
        ]);
        let results = parse_junit_artifact(&bytes).expect("parse archive");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_artifact_raw_xml_passthrough() {
        let results = parse_junit_artifact(SUITE_XML).expect("parse raw");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_artifact_corrupt_archive_is_parse_error() {
        let err = parse_junit_artifact(b"PK\x03\x04not really a zip").unwrap_err();
        assert!(matches!(err, AutoQaError::Parse(_)));
    }

    #[test]
    fn test_artifact_archive_without_xml_yields_nothing() {
        let bytes = archive_of(&[("coverage.json", b"{}")]);
        let results = parse_junit_artifact(&bytes).expect("parse archive");
        assert!(results.is_empty());
    }
}
