//! Serializes collected file records into the Markdown or XML document.

use super::FileRecord;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;

const INDEX_SEPARATOR: &str = "==============================";

/// The document format written by an aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Xml,
}

impl OutputFormat {
    /// The file extension conventionally used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Xml => "xml",
        }
    }

    /// Swaps the extension of `filename` for this format's extension.
    ///
    /// `prompt_context.md` becomes `prompt_context.xml` for [`OutputFormat::Xml`].
    pub fn with_extension(self, filename: &str) -> String {
        let path = Path::new(filename);
        match path.file_stem() {
            Some(stem) if !filename.is_empty() => {
                let renamed = path.with_file_name(format!(
                    "{}.{}",
                    stem.to_string_lossy(),
                    self.extension()
                ));
                renamed.to_string_lossy().into_owned()
            }
            _ => filename.to_string(),
        }
    }

    /// Renders `records`, which must already be in their final order.
    pub fn render(self, records: &[FileRecord]) -> String {
        match self {
            OutputFormat::Markdown => render_markdown(records),
            OutputFormat::Xml => render_xml(records),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "xml" => Ok(OutputFormat::Xml),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// A numbered file index, a separator, then one fenced section per file.
pub fn render_markdown(records: &[FileRecord]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(records.len() * 2 + 2);

    lines.push("# File Index".to_string());
    for (i, record) in records.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, record.display_path));
    }
    lines.push(format!("\n{INDEX_SEPARATOR}\n"));

    for (i, record) in records.iter().enumerate() {
        let fence = fence_for(&record.content);
        let mut section = format!(
            "## File {}: {}\n{}{}\n{}",
            i + 1,
            record.display_path,
            fence,
            record.language,
            record.content
        );
        if !record.content.ends_with('\n') {
            section.push('\n');
        }
        section.push_str(&fence);
        section.push('\n');
        lines.push(section);
    }

    lines.join("\n")
}

/// A `<project_context>` document with a file tree and CDATA-wrapped sources.
pub fn render_xml(records: &[FileRecord]) -> String {
    let mut out = String::from("<project_context>\n  <file_tree>\n");
    for record in records {
        out.push_str(&format!(
            "    <file path=\"{}\"/>\n",
            escape(replace_invalid_xml_chars(&record.display_path).as_ref())
        ));
    }
    out.push_str("  </file_tree>\n  <source_code>\n");
    for record in records {
        out.push_str(&format!(
            "    <file path=\"{}\"><![CDATA[{}]]></file>\n",
            escape(replace_invalid_xml_chars(&record.display_path).as_ref()),
            escape_cdata(&record.content)
        ));
    }
    out.push_str("  </source_code>\n</project_context>\n");
    out
}

/// Makes `content` safe inside a CDATA section.
///
/// Every `]]>` is split so it cannot close the section, and characters XML 1.0
/// does not allow anywhere (most C0 controls, U+FFFE, U+FFFF) become U+FFFD.
pub fn escape_cdata(content: &str) -> Cow<'_, str> {
    let content = replace_invalid_xml_chars(content);
    if content.contains("]]>") {
        Cow::Owned(content.replace("]]>", "]]]]><![CDATA[>"))
    } else {
        content
    }
}

/// Replaces characters outside the XML 1.0 `Char` production with U+FFFD.
pub fn replace_invalid_xml_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        )
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Three backticks, or one more than the longest backtick run in `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}
