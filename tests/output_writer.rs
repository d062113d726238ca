mod common;
use crate::common::{CapturedOutput, ProcessDefinitionBuilder};

use std::error::Error;

use conductor::output::OutputWriter;

type TestResult = Result<(), Box<dyn Error>>;

fn writer(def: conductor::process::ProcessDefinition) -> (OutputWriter, CapturedOutput) {
    let out = CapturedOutput::new();
    (OutputWriter::from_definition(&def, out.sink()), out)
}

#[test]
fn plain_line_gets_prefix_header() {
    let (w, _) = writer(ProcessDefinitionBuilder::new("web", "true").build());
    assert_eq!(w.format_line(Some(42), "hello"), "web | hello\n");
    assert_eq!(w.format_line(None, "hello\n"), "web | hello\n");
}

#[test]
fn pid_is_shown_only_when_enabled_and_known() {
    let mut def = ProcessDefinitionBuilder::new("web", "true").prefix("api").build();
    def.display_pid = true;
    let (w, _) = writer(def);
    assert_eq!(w.format_line(Some(42), "up"), "api(42) | up\n");
    assert_eq!(w.format_line(None, "up"), "api | up\n");
}

#[test]
fn color_wraps_only_the_header() {
    let mut def = ProcessDefinitionBuilder::new("db", "true").build();
    def.color = Some("\x1b[32m".to_string());
    let (w, _) = writer(def);
    assert_eq!(w.format_line(None, "ready"), "\x1b[32mdb |\x1b[0m ready\n");
}

#[test]
fn timestamp_precedes_prefix() {
    let mut def = ProcessDefinitionBuilder::new("db", "true").build();
    def.show_timestamp = true;
    let (w, _) = writer(def);

    let line = w.format_line(None, "ready");
    // HH:MM:SS.mmm
    let (stamp, rest) = line.split_at(12);
    assert_eq!(rest, " db | ready\n");
    let bytes = stamp.as_bytes();
    assert_eq!((bytes[2], bytes[5], bytes[8]), (b':', b':', b'.'));
    assert!(stamp.chars().filter(|c| c.is_ascii_digit()).count() == 9);
}

#[tokio::test]
async fn pump_splits_lines_and_strips_carriage_returns() -> TestResult {
    let (w, out) = writer(ProcessDefinitionBuilder::new("job", "true").build());

    let input: &[u8] = b"one\r\ntwo\nthree";
    w.pump(input, None, "stdout").await;

    assert_eq!(out.lines(), vec!["job | one", "job | two", "job | three"]);
    Ok(())
}

#[tokio::test]
async fn pump_without_line_splitting_writes_chunks() -> TestResult {
    let mut def = ProcessDefinitionBuilder::new("job", "true").build();
    def.separate_new_lines = false;
    let (w, out) = writer(def);

    let input: &[u8] = b"one\ntwo\n";
    w.pump(input, None, "stdout").await;

    assert_eq!(out.contents(), "job | one\ntwo\n");
    Ok(())
}

#[tokio::test]
async fn silent_writer_drains_without_output() -> TestResult {
    let (w, out) = writer(ProcessDefinitionBuilder::new("quiet", "true").silent().build());
    assert!(w.is_silent());

    let input: &[u8] = b"lots\nof\nnoise\n";
    w.pump(input, Some(1), "stderr").await;
    w.write_line(Some(1), "more")?;

    assert!(out.contents().is_empty());
    Ok(())
}
