use itertools::Itertools;
use tracing::{debug, instrument};

use crate::{
    ast::{Node, NodeKind, StructuralKind},
    diagnostics::Diagnostics,
    ir::{Header, OutputVar},
};

/// Parses `major.minor` or a bare `major`.
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = match version.trim().split_once('.') {
        Some((major, minor)) => (major, minor),
        None => (version.trim(), "0"),
    };
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Reads the metadata section of a document.
///
/// Problems are reported and leave the affected field at its default; the
/// header never aborts a compile on its own.
#[instrument(level = "debug", skip_all, fields(name))]
pub fn extract_header(header: &Node, diagnostics: &mut Diagnostics) -> Header {
    debug!("begin extracting header");

    let name = match header.attr("name") {
        Some(name) => name.to_string(),
        None => {
            diagnostics.report_error(format!("{}: header has no name", header.path));
            String::new()
        }
    };
    tracing::Span::current().record("name", name.as_str());

    let (major, minor) = match header.attr("version-number") {
        Some(version) => parse_version(version).unwrap_or_else(|| {
            diagnostics.report_error(format!(
                "{}: version {version:?} is not of the form major.minor",
                header.path
            ));
            (0, 0)
        }),
        None => {
            diagnostics.report_error(format!("{}: header has no version-number", header.path));
            (0, 0)
        }
    };

    let notes = header
        .children
        .iter()
        .filter(|child| child.kind == NodeKind::Structural(StructuralKind::Note))
        .filter_map(|note| note.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .join("\n");
    let note = (!notes.is_empty()).then_some(notes);

    let mut outputs = header
        .children
        .iter()
        .filter(|child| child.kind == NodeKind::Structural(StructuralKind::Output));
    let output = outputs.next().map(|output| OutputVar {
        name: output.attr("name").unwrap_or_default().to_string(),
        type_tag: output.attr("type").map(str::to_string),
    });
    for extra in outputs {
        diagnostics.report_warning(format!(
            "{}: only the first output declaration is used",
            extra.path
        ));
    }

    Header {
        name,
        uid: header.attr("uid").map(str::to_string),
        major,
        minor,
        note,
        output,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{ast::Element, ir::lowering::test_utils::node};

    #[test_case("1.2", Some((1, 2)) ; "major and minor")]
    #[test_case("3", Some((3, 0)) ; "major only")]
    #[test_case(" 2.10 ", Some((2, 10)) ; "padded")]
    #[test_case("v1", None ; "prefixed")]
    #[test_case("1.x", None ; "bad minor")]
    #[test_case("", None ; "empty")]
    fn versions(input: &str, expected: Option<(u32, u32)>) {
        assert_eq!(parse_version(input), expected);
    }

    #[test]
    fn full_header() {
        let header = node(
            &Element::new("header")
                .attr("name", "report")
                .attr("uid", "a1b2")
                .attr("version-number", "2.1")
                .child(Element::new("note").with_text("first line"))
                .child(Element::new("note").with_text("  second line\n"))
                .child(Element::new("output").attr("name", "total").attr("type", "int")),
        );
        let mut diagnostics = Diagnostics::new();

        let header = extract_header(&header, &mut diagnostics);

        assert_eq!(
            header,
            Header {
                name: "report".to_string(),
                uid: Some("a1b2".to_string()),
                major: 2,
                minor: 1,
                note: Some("first line\nsecond line".to_string()),
                output: Some(OutputVar {
                    name: "total".to_string(),
                    type_tag: Some("int".to_string()),
                }),
            }
        );
        assert_eq!(diagnostics.error_count(), 0);
    }

    #[test]
    fn minimal_header() {
        let header = node(
            &Element::new("header")
                .attr("name", "bare")
                .attr("version-number", "1"),
        );
        let mut diagnostics = Diagnostics::new();
        let header = extract_header(&header, &mut diagnostics);
        assert_eq!(header.uid, None);
        assert_eq!(header.note, None);
        assert_eq!(header.output, None);
        assert_eq!((header.major, header.minor), (1, 0));
    }

    #[test]
    fn bad_version_is_an_error() {
        let header = node(
            &Element::new("header")
                .attr("name", "bad")
                .attr("version-number", "one"),
        );
        let mut diagnostics = Diagnostics::new();
        let header = extract_header(&header, &mut diagnostics);
        assert_eq!((header.major, header.minor), (0, 0));
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn extra_outputs_warn() {
        let header = node(
            &Element::new("header")
                .attr("name", "two")
                .attr("version-number", "1.0")
                .child(Element::new("output").attr("name", "a"))
                .child(Element::new("output").attr("name", "b")),
        );
        let mut diagnostics = Diagnostics::new();
        let header = extract_header(&header, &mut diagnostics);
        assert_eq!(header.output.map(|o| o.name), Some("a".to_string()));
        assert_eq!(diagnostics.warning_count(), 1);
    }
}
