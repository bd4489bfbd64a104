//! Integration tests for the scripting-mode exits and filter mode — the
//! only paths that never touch the screen, so they can run headless.

use std::io::Cursor;

use skim::{SkimOptionsBuilder, run_with};

#[test]
fn select_1_auto_picks_the_only_match() {
    let options = SkimOptionsBuilder::default().select_1(true).query("only".to_string()).build().unwrap();
    let input: Box<dyn std::io::Read + Send> = Box::new(Cursor::new(b"only-one\n".to_vec()));
    let output = run_with(&options, Some(input)).unwrap();
    assert!(output.accepted);
    assert_eq!(output.selected, vec!["only-one"]);
}

#[test]
fn exit_0_succeeds_without_a_screen_when_nothing_matches() {
    let options = SkimOptionsBuilder::default().exit_0(true).query("zzz-no-match".to_string()).build().unwrap();
    let input: Box<dyn std::io::Read + Send> = Box::new(Cursor::new(b"alpha\nbeta\n".to_vec()));
    let output = run_with(&options, Some(input)).unwrap();
    assert!(output.accepted);
    assert!(output.selected.is_empty());
}

#[test]
fn filter_mode_writes_matches_and_returns_them() {
    let options = SkimOptionsBuilder::default().filter(Some("mc".to_string())).build().unwrap();
    let input: Box<dyn std::io::Read + Send> = Box::new(Cursor::new(b"main.c\nMakefile\nREADME\n".to_vec()));
    let output = run_with(&options, Some(input)).unwrap();
    assert!(output.accepted);
    assert_eq!(output.selected, vec!["main.c"]);
}
