//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::path::PathBuf;

use luster::program::{FileEntry, Program, ProgramOptions};

pub fn program() -> Program {
    Program::new(ProgramOptions {
        root_dir: PathBuf::from("/proj"),
        ..ProgramOptions::default()
    })
}

/// Add a file by pkg-path, deriving a matching absolute src path
pub fn add_file(program: &mut Program, pkg_path: &str, contents: &str) {
    program.add_or_replace_file_entry(
        &FileEntry {
            src: PathBuf::from(format!("/proj/{pkg_path}")),
            dest: pkg_path.to_string(),
        },
        contents,
    );
}

/// Diagnostic codes, sorted, for compact assertions
pub fn codes(program: &Program) -> Vec<u32> {
    let mut codes: Vec<u32> = program.get_diagnostics().iter().map(|d| d.code).collect();
    codes.sort_unstable();
    codes
}
