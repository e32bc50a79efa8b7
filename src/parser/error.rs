use std::path::PathBuf;

use ariadne::{ColorGenerator, Config, Label, Report, ReportKind, Source};
use thiserror::Error;

use super::DocumentSource;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        path: PathBuf,
        /// 1-based line.
        line: usize,
        /// 1-based column.
        column: usize,
        message: String,
    },
    #[error("document is not an element tree (line {line}, column {column}): {message}")]
    Shape {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
}

impl DocumentError {
    pub(crate) fn from_json(path: PathBuf, error: serde_json::Error) -> Self {
        let line = error.line();
        let column = error.column();
        let message = error.to_string();
        match error.classify() {
            serde_json::error::Category::Data => DocumentError::Shape {
                path,
                line,
                column,
                message,
            },
            _ => DocumentError::Syntax {
                path,
                line,
                column,
                message,
            },
        }
    }

    /// Renders the error as a source report.
    pub fn render(&self, source: &DocumentSource, color: bool) -> String {
        let path = source.path.display().to_string();
        let mut colors = ColorGenerator::new();

        let report = match self {
            DocumentError::Io { .. } => Report::build(ReportKind::Error, (path.clone(), 0..0))
                .with_config(Config::default().with_color(color))
                .with_code("D1")
                .with_message(self.to_string())
                .finish(),
            DocumentError::Syntax {
                line,
                column,
                message,
                ..
            } => {
                let loc = offset_of(&source.input, *line, *column);
                Report::build(ReportKind::Error, (path.clone(), loc..loc))
                    .with_config(Config::default().with_color(color))
                    .with_code("D2")
                    .with_message("Document syntax error.")
                    .with_label(
                        Label::new((path.clone(), loc..(loc + 1)))
                            .with_message(message)
                            .with_color(colors.next()),
                    )
                    .finish()
            }
            DocumentError::Shape {
                line,
                column,
                message,
                ..
            } => {
                let loc = offset_of(&source.input, *line, *column);
                Report::build(ReportKind::Error, (path.clone(), loc..loc))
                    .with_config(Config::default().with_color(color))
                    .with_code("D3")
                    .with_message("Malformed element.")
                    .with_label(
                        Label::new((path.clone(), loc.saturating_sub(1)..loc))
                            .with_message(message)
                            .with_color(colors.next()),
                    )
                    .with_note("every element needs a \"tag\"; \"attributes\", \"children\" and \"text\" are optional")
                    .finish()
            }
        };

        let mut out = Vec::new();
        // Writing into a Vec can't fail.
        let _ = report.write((path, Source::from(source.input.as_str())), &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Converts a 1-based line/column pair into a byte offset, clamped to the input.
fn offset_of(input: &str, line: usize, column: usize) -> usize {
    let line_start: usize = input
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(input.len())
}

#[cfg(test)]
mod tests {
    use super::offset_of;

    #[test]
    fn offsets() {
        let input = "ab\ncd\nef";
        assert_eq!(offset_of(input, 1, 1), 0);
        assert_eq!(offset_of(input, 2, 2), 4);
        assert_eq!(offset_of(input, 3, 1), 6);
        assert_eq!(offset_of(input, 9, 9), input.len());
    }
}
