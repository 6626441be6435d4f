//! Source-map v3 generation: base64-VLQ segment encoding plus the JSON
//! envelope.

use serde::Serialize;

/// One recorded mapping: generated position → original position.
/// All fields zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    generated_column: u32,
    source_line: u32,
    source_column: u32,
}

#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    /// Segments per generated line
    lines: Vec<Vec<Segment>>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(
        &mut self,
        generated_line: u32,
        generated_column: u32,
        source_line: u32,
        source_column: u32,
    ) {
        while self.lines.len() <= generated_line as usize {
            self.lines.push(Vec::new());
        }
        self.lines[generated_line as usize].push(Segment {
            generated_column,
            source_line,
            source_column,
        });
    }

    /// Render the `mappings` string: lines joined by `;`, segments by
    /// `,`, each segment four VLQ fields relative to the previous one
    fn mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source_line = 0i64;
        let mut prev_source_column = 0i64;
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                out.push(';');
            }
            let mut prev_generated_column = 0i64;
            for (seg_index, segment) in line.iter().enumerate() {
                if seg_index > 0 {
                    out.push(',');
                }
                encode_vlq(segment.generated_column as i64 - prev_generated_column, &mut out);
                encode_vlq(0, &mut out); // single source
                encode_vlq(segment.source_line as i64 - prev_source_line, &mut out);
                encode_vlq(segment.source_column as i64 - prev_source_column, &mut out);
                prev_generated_column = segment.generated_column as i64;
                prev_source_line = segment.source_line as i64;
                prev_source_column = segment.source_column as i64;
            }
        }
        out
    }

    /// Serialize the standard v3 JSON. `source` is relative to
    /// `source_root` when one is set, else the original absolute path.
    pub fn render(
        &self,
        file_name: &str,
        source: &str,
        source_root: Option<&str>,
    ) -> Result<String, serde_json::Error> {
        let map = SourceMapV3 {
            version: 3,
            file: file_name.to_string(),
            source_root: source_root.map(str::to_string),
            sources: vec![source.to_string()],
            names: Vec::new(),
            mappings: self.mappings(),
        };
        serde_json::to_string(&map)
    }

    /// Look up the generated position mapped from an original position
    /// (used by tests and by hosts resolving breakpoints)
    pub fn generated_position_of(&self, source_line: u32, source_column: u32) -> Option<(u32, u32)> {
        for (line_index, line) in self.lines.iter().enumerate() {
            for segment in line {
                if segment.source_line == source_line && segment.source_column == source_column {
                    return Some((line_index as u32, segment.generated_column));
                }
            }
        }
        None
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapV3 {
    version: u8,
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_root: Option<String>,
    sources: Vec<String>,
    names: Vec<String>,
    mappings: String,
}

const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_known_values() {
        let mut out = String::new();
        encode_vlq(0, &mut out);
        assert_eq!(out, "A");
        out.clear();
        encode_vlq(1, &mut out);
        assert_eq!(out, "C");
        out.clear();
        encode_vlq(-1, &mut out);
        assert_eq!(out, "D");
        out.clear();
        encode_vlq(16, &mut out);
        assert_eq!(out, "gB");
    }

    #[test]
    fn single_mapping_renders() {
        let mut builder = SourceMapBuilder::new();
        builder.add_mapping(0, 0, 0, 0);
        let json = builder.render("out.brs", "/src/in.bs", None).expect("render");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed["version"], 3);
        assert_eq!(parsed["mappings"], "AAAA");
        assert_eq!(parsed["sources"][0], "/src/in.bs");
        assert!(parsed.get("sourceRoot").is_none());
    }

    #[test]
    fn source_root_is_emitted_when_set() {
        let builder = SourceMapBuilder::new();
        let json = builder
            .render("out.brs", "source/in.bs", Some("pkg:/"))
            .expect("render");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed["sourceRoot"], "pkg:/");
    }

    #[test]
    fn lookup_round_trips() {
        let mut builder = SourceMapBuilder::new();
        builder.add_mapping(2, 4, 5, 0);
        assert_eq!(builder.generated_position_of(5, 0), Some((2, 4)));
        assert_eq!(builder.generated_position_of(9, 9), None);
    }
}
