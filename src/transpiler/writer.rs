//! Position-tracking output writer with block-depth indentation and
//! optional source-map recording.

use crate::base::Range;

use super::source_map::SourceMapBuilder;

const INDENT: &str = "    ";

pub(crate) struct CodeWriter {
    out: String,
    line: u32,
    column: u32,
    pub block_depth: u32,
    map: Option<SourceMapBuilder>,
}

impl CodeWriter {
    pub fn new(with_source_map: bool) -> Self {
        Self {
            out: String::new(),
            line: 0,
            column: 0,
            block_depth: 0,
            map: with_source_map.then(SourceMapBuilder::new),
        }
    }

    /// Current generated line (zero-based)
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Write text containing no newlines
    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
        self.column += text.len() as u32;
    }

    /// Write text and record a mapping back to the original range
    pub fn write_mapped(&mut self, text: &str, source: Range) {
        if let Some(map) = &mut self.map {
            map.add_mapping(self.line, self.column, source.start.line, source.start.column);
        }
        self.write(text);
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
        self.line += 1;
        self.column = 0;
    }

    /// Indentation for the current block depth
    pub fn indent(&mut self) {
        for _ in 0..self.block_depth {
            self.write(INDENT);
        }
    }

    pub fn finish(self) -> (String, Option<SourceMapBuilder>) {
        (self.out, self.map)
    }
}
