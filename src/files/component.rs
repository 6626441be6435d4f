//! Component files.
//!
//! The embedded-XML component format is an opaque sibling file type from
//! the engine's point of view: it contributes a component name, an
//! optional parent name, and a list of imported scripts. Only those three
//! facts are extracted; the rest of the markup passes through untouched.

use std::path::PathBuf;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::base::{LineIndex, Range};
use crate::diagnostics::{Diagnostic, messages};

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptImport {
    pub uri: String,
    /// Range of the `uri` attribute value in the markup
    pub uri_range: Range,
}

pub struct ComponentFile {
    pub src_path: PathBuf,
    pub pkg_path: String,
    pub name: Option<String>,
    pub name_range: Range,
    pub parent_name: Option<String>,
    pub script_imports: Vec<ScriptImport>,
    source: String,
    diagnostics: Vec<Diagnostic>,
}

impl ComponentFile {
    pub fn new(src_path: PathBuf, pkg_path: String, source: String) -> Self {
        let mut file = Self {
            src_path,
            pkg_path,
            name: None,
            name_range: Range::default(),
            parent_name: None,
            script_imports: Vec::new(),
            source,
            diagnostics: Vec::new(),
        };
        file.parse();
        file
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The scope name for this component: its lowercased declared name
    pub fn scope_name(&self) -> Option<String> {
        self.name.as_ref().map(|n| n.to_lowercase())
    }

    fn parse(&mut self) {
        let line_index = LineIndex::new(&self.source);
        let mut locator = AttributeLocator::new(&self.source, &line_index);

        let mut reader = Reader::from_str(&self.source);
        reader.config_mut().trim_text(true);
        loop {
            match reader.read_event() {
                Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                    let tag = element.name();
                    let tag = tag.as_ref();
                    if tag.eq_ignore_ascii_case(b"component") {
                        for attribute in element.attributes().flatten() {
                            let key = attribute.key.as_ref().to_ascii_lowercase();
                            let Ok(value) = attribute.unescape_value() else {
                                continue;
                            };
                            match key.as_slice() {
                                b"name" => {
                                    self.name_range = locator.locate(&value);
                                    self.name = Some(value.into_owned());
                                }
                                b"extends" => {
                                    locator.locate(&value);
                                    self.parent_name = Some(value.into_owned());
                                }
                                _ => {}
                            }
                        }
                    } else if tag.eq_ignore_ascii_case(b"script") {
                        for attribute in element.attributes().flatten() {
                            if attribute.key.as_ref().eq_ignore_ascii_case(b"uri") {
                                if let Ok(value) = attribute.unescape_value() {
                                    let uri_range = locator.locate(&value);
                                    self.script_imports.push(ScriptImport {
                                        uri: value.into_owned(),
                                        uri_range,
                                    });
                                }
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(error) => {
                    let mut diagnostic = messages::unexpected_token(
                        &error.to_string(),
                        Range::default(),
                    );
                    diagnostic.file_pkg_path = Some(self.pkg_path.clone());
                    self.diagnostics.push(diagnostic);
                    break;
                }
            }
        }

        for diagnostic in &mut self.diagnostics {
            diagnostic.file_pkg_path = Some(self.pkg_path.clone());
        }
    }
}

/// Finds attribute-value ranges by scanning forward through the raw
/// markup; quick-xml does not report value positions itself.
struct AttributeLocator<'a> {
    source: &'a str,
    line_index: &'a LineIndex,
    cursor: usize,
}

impl<'a> AttributeLocator<'a> {
    fn new(source: &'a str, line_index: &'a LineIndex) -> Self {
        Self {
            source,
            line_index,
            cursor: 0,
        }
    }

    fn locate(&mut self, value: &str) -> Range {
        match self.source[self.cursor..].find(value) {
            Some(offset) => {
                let start = self.cursor + offset;
                let end = start + value.len();
                self.cursor = end;
                self.line_index.range(text_size::TextRange::new(
                    text_size::TextSize::new(start as u32),
                    text_size::TextSize::new(end as u32),
                ))
            }
            None => Range::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(xml: &str) -> ComponentFile {
        ComponentFile::new(
            PathBuf::from("/proj/components/widget.xml"),
            "components/widget.xml".to_string(),
            xml.to_string(),
        )
    }

    #[test]
    fn extracts_name_parent_and_scripts() {
        let file = component(
            r#"<?xml version="1.0" encoding="utf-8" ?>
<component name="Widget" extends="Group">
    <script type="text/brightscript" uri="pkg:/components/widget.brs" />
    <script type="text/brightscript" uri="pkg:/source/util.brs" />
    <children />
</component>"#,
        );
        assert_eq!(file.name.as_deref(), Some("Widget"));
        assert_eq!(file.parent_name.as_deref(), Some("Group"));
        assert_eq!(file.script_imports.len(), 2);
        assert_eq!(file.script_imports[0].uri, "pkg:/components/widget.brs");
        assert_eq!(file.scope_name().as_deref(), Some("widget"));
    }

    #[test]
    fn uri_ranges_point_into_the_markup() {
        let file = component(
            "<component name=\"W\">\n    <script uri=\"pkg:/a.brs\" />\n</component>",
        );
        let import = &file.script_imports[0];
        assert_eq!(import.uri_range.start.line, 1);
        assert!(import.uri_range.start.column > 0);
    }

    #[test]
    fn component_without_extends_has_no_parent() {
        let file = component("<component name=\"Solo\"></component>");
        assert_eq!(file.parent_name, None);
    }
}
