//! Program lifecycle: files, manifest-driven preprocessing, diagnostic
//! filtering, and the plugin bus.

mod helpers;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use helpers::{add_file, program};
use luster::diagnostics::messages;
use luster::plugins::{Plugin, PluginEvent};
use luster::preprocessor::Manifest;
use luster::program::{FileEntry, Program, ProgramOptions};

// =============================================================================
// FILE MANAGEMENT
// =============================================================================

#[test]
fn files_are_found_by_absolute_and_pkg_path() {
    let mut program = program();
    program.add_or_replace_file("/proj/source/main.brs", "sub main()\nend sub");
    assert!(program.has_file("/proj/source/main.brs"));
    assert!(program.has_file("source/main.brs"));
    assert!(program.get_file_by_path_absolute("/proj/source/main.brs").is_some());
    assert!(program.get_file_by_pkg_path("source/MAIN.brs").is_some());
}

#[test]
fn replacing_a_file_updates_its_contents() {
    let mut program = program();
    add_file(&mut program, "source/main.brs", "sub one()\nend sub");
    add_file(&mut program, "source/main.brs", "sub two()\nend sub");
    program.validate();
    let scope = program.get_scope_by_name("source").expect("scope");
    assert!(scope.own_callables("one").is_empty());
    assert_eq!(scope.own_callables("two").len(), 1);
}

#[test]
fn remove_files_takes_a_batch() {
    let mut program = program();
    add_file(&mut program, "source/a.brs", "sub a()\nend sub");
    add_file(&mut program, "source/b.brs", "sub b()\nend sub");
    program.remove_files(&[PathBuf::from("source/a.brs"), PathBuf::from("source/b.brs")]);
    assert!(!program.has_file("source/a.brs"));
    assert!(!program.has_file("source/b.brs"));
}

#[test]
fn dispose_clears_everything() {
    let mut program = program();
    add_file(&mut program, "source/a.brs", "sub a()\nend sub");
    program.validate();
    program.dispose();
    assert!(!program.has_file("source/a.brs"));
    assert!(program.get_diagnostics().is_empty());
}

// =============================================================================
// MANIFEST AND PREPROCESSOR
// =============================================================================

#[test]
fn manifest_flags_drive_conditional_compilation() {
    let mut program = program();
    program.set_manifest(Manifest::parse("bs_const_debug=true"));
    add_file(
        &mut program,
        "source/main.brs",
        "#if bs_const_debug\nsub debugOnly()\nend sub\n#end if\nsub main()\n    debugOnly()\nend sub",
    );
    program.validate();
    assert!(
        program
            .get_diagnostics()
            .iter()
            .all(|d| d.code != messages::CALL_TO_UNKNOWN_FUNCTION),
    );
}

#[test]
fn false_branches_disappear() {
    let mut program = program();
    add_file(
        &mut program,
        "source/main.brs",
        "#const enabled = false\n#if enabled\nsub hidden()\nend sub\n#end if\nsub main()\nend sub",
    );
    program.validate();
    let scope = program.get_scope_by_name("source").expect("scope");
    assert!(scope.own_callables("hidden").is_empty());
}

// =============================================================================
// DIAGNOSTIC FILTERING
// =============================================================================

#[test]
fn ignore_error_codes_filter_output() {
    let mut program = Program::new(ProgramOptions {
        root_dir: PathBuf::from("/proj"),
        ignore_error_codes: vec![messages::DUPLICATE_FUNCTION_IMPLEMENTATION],
        ..ProgramOptions::default()
    });
    program.add_or_replace_file_entry(
        &FileEntry {
            src: PathBuf::from("/proj/source/a.brs"),
            dest: "source/a.brs".to_string(),
        },
        "sub DoA()\nend sub\nsub DoA()\nend sub",
    );
    program.validate();
    assert!(
        program
            .get_diagnostics()
            .iter()
            .all(|d| d.code != messages::DUPLICATE_FUNCTION_IMPLEMENTATION)
    );
}

#[test]
fn comment_flags_suppress_diagnostics_on_their_line() {
    let mut program = program();
    add_file(
        &mut program,
        "source/a.brs",
        "sub DoA() 'bs:disable-line\nend sub\nsub DoA()\nend sub",
    );
    program.validate();
    let duplicates: Vec<_> = program
        .get_diagnostics()
        .into_iter()
        .filter(|d| d.code == messages::DUPLICATE_FUNCTION_IMPLEMENTATION)
        .collect();
    // only the undecorated declaration reports
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].range.start.line, 2);
}

#[test]
fn disable_next_line_suppresses_the_following_line() {
    let mut program = program();
    add_file(
        &mut program,
        "source/a.brs",
        "'bs:disable-next-line: 1100\nsub main()\nend sub",
    );
    // the suppressed call sits on line 1; craft one there
    add_file(
        &mut program,
        "source/b.brs",
        "'bs:disable-next-line: 1100\nsub go()\n    vanish()\nend sub",
    );
    program.validate();
    // the call is on line 2, outside the flag's range, so it reports
    assert!(
        program
            .get_diagnostics()
            .iter()
            .any(|d| d.code == messages::CALL_TO_UNKNOWN_FUNCTION)
    );
}

#[test]
fn added_diagnostics_surface_through_get_diagnostics() {
    let mut program = program();
    add_file(&mut program, "source/a.brs", "sub a()\nend sub");
    program.add_diagnostics(vec![
        luster::Diagnostic::warning(
            messages::FILE_NOT_REFERENCED_BY_ANY_OTHER_FILE,
            "external note",
            luster::base::Range::default(),
        )
        .in_file("source/a.brs"),
    ]);
    assert!(
        program
            .get_diagnostics()
            .iter()
            .any(|d| d.message == "external note")
    );
}

// =============================================================================
// PLUGIN LIFECYCLE
// =============================================================================

struct EventLog {
    log: Rc<RefCell<Vec<String>>>,
}

impl Plugin for EventLog {
    fn name(&self) -> &str {
        "event-log"
    }
    fn on_event(&mut self, event: &PluginEvent<'_>) -> bool {
        self.log.borrow_mut().push(event.name().to_string());
        true
    }
}

#[test]
fn plugin_events_fire_in_lifecycle_order() {
    let mut program = program();
    let log = Rc::new(RefCell::new(Vec::new()));
    program.add_plugin(Box::new(EventLog { log: Rc::clone(&log) }));

    add_file(&mut program, "source/main.brs", "sub main()\nend sub");
    program.validate();

    let events = log.borrow().clone();
    let position = |name: &str| {
        events
            .iter()
            .position(|e| e == name)
            .unwrap_or_else(|| panic!("missing event {name} in {events:?}"))
    };

    // parse events precede validation events; before precedes after
    assert!(position("beforeFileParse") < position("afterFileParse"));
    assert!(position("afterFileParse") < position("beforeProgramValidate"));
    assert!(position("beforeProgramValidate") < position("beforeScopeValidate"));
    assert!(position("beforeScopeValidate") < position("afterScopeValidate"));
    assert!(position("afterScopeValidate") < position("afterProgramValidate"));
    assert!(events.contains(&"afterFileValidate".to_string()));
}
