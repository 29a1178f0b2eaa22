//! Format-preserving rewrites of a provider block.
//!
//! Only three value spans are ever touched: `version`, `constraints` and
//! `hashes`. Everything else in the file, comments and unrelated blocks
//! included, survives byte-for-byte.

use crate::edit::Edit;
use crate::lockfile::document::LockDocument;
use crate::lockfile::errors::LockFileError;
use crate::lockfile::locator::BlockHandle;
use crate::lockfile::scanner::{AttributeSpan, BlockSpan};
use tracing::debug;

/// Render a string as an HCL quoted literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(ch);
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Canonical hash list: one literal per line, trailing commas, closing
/// bracket aligned with the attribute.
pub fn render_hashes(hashes: &[String], indent: &str, newline: &str) -> String {
    if hashes.is_empty() {
        return "[]".to_string();
    }

    let mut out = format!("[{newline}");
    for hash in hashes {
        out.push_str(indent);
        out.push_str("  ");
        out.push_str(&quote(hash));
        out.push(',');
        out.push_str(newline);
    }
    out.push_str(indent);
    out.push(']');
    out
}

/// Line ending used by the block, falling back to the document's first
/// line and then to `\n`.
fn line_ending(content: &str, block: &BlockSpan) -> &'static str {
    let crlf = |text: &str| text.find('\n').map(|idx| text[..idx].ends_with('\r'));
    match crlf(&content[block.start..block.end]).or_else(|| crlf(content)) {
        Some(true) => "\r\n",
        _ => "\n",
    }
}

/// Plan the edits that bring a block to the desired version and hashes.
pub fn plan(
    document: &LockDocument,
    handle: &BlockHandle,
    desired_version: &str,
    desired_hashes: &[String],
    skip_constraints: bool,
) -> Result<Vec<Edit>, LockFileError> {
    let content = document.content();
    let span = document
        .block_spans()
        .get(handle.index())
        .ok_or_else(|| LockFileError::ProviderBlockNotFound {
            address: handle.address().to_string(),
            file: document.path().display().to_string(),
        })?;

    let version = span
        .attribute("version")
        .ok_or_else(|| LockFileError::MissingAttribute {
            address: handle.address().to_string(),
            attribute: "version",
        })?;

    let mut edits = vec![replace_value(document, version, quote(desired_version))];

    if let Some(constraints) = span.attribute("constraints") {
        if skip_constraints {
            debug!(provider = %handle.address(), "leaving constraints untouched");
        } else {
            edits.push(replace_value(document, constraints, quote(desired_version)));
        }
    }

    let newline = line_ending(content, span);
    match span.attribute("hashes") {
        Some(hashes) => {
            let indent = attribute_indent(content, span, hashes);
            edits.push(replace_value(
                document,
                hashes,
                render_hashes(desired_hashes, &indent, newline),
            ));
        }
        None => {
            let anchor = span
                .attributes
                .iter()
                .max_by_key(|attr| attr.value_end)
                .unwrap_or(version);
            let indent = attribute_indent(content, span, anchor);
            let close = span.end - 1;
            let body = format!("hashes = {}", render_hashes(desired_hashes, &indent, newline));

            // A one-line block body must be split before it can hold a list
            let first = span
                .attributes
                .iter()
                .min_by_key(|attr| attr.key_start)
                .unwrap_or(anchor);
            let after_brace = span.open_brace + 1;
            if !content[after_brace..first.key_start].contains('\n') {
                edits.push(Edit::new(
                    document.path(),
                    after_brace,
                    first.key_start,
                    format!("{newline}{indent}"),
                    &content[after_brace..first.key_start],
                ));
            }

            let at = insertion_point(content, span, anchor);
            if content[anchor.value_end..close].contains('\n') {
                edits.push(Edit::insert(document.path(), at, format!("{newline}{indent}{body}")));
            } else {
                let block_indent = span.indent(content);
                edits.push(Edit::new(
                    document.path(),
                    at,
                    close,
                    format!("{newline}{indent}{body}{newline}{block_indent}"),
                    &content[at..close],
                ));
            }
        }
    }

    Ok(edits)
}

/// Apply the planned edits and re-parse the result.
///
/// On error the document is left unchanged.
pub fn apply(
    document: &mut LockDocument,
    handle: &BlockHandle,
    desired_version: &str,
    desired_hashes: &[String],
    skip_constraints: bool,
) -> Result<(), LockFileError> {
    let edits = plan(document, handle, desired_version, desired_hashes, skip_constraints)?;
    let (updated, results) = Edit::apply_all(document.content(), edits)?;

    debug!(
        provider = %handle.address(),
        applied = results.iter().filter(|result| result.is_applied()).count(),
        total = results.len(),
        "patched provider block"
    );

    *document = LockDocument::parse(document.path(), updated)?;
    Ok(())
}

fn replace_value(document: &LockDocument, attr: &AttributeSpan, new_text: String) -> Edit {
    Edit::new(
        document.path(),
        attr.value_start,
        attr.value_end,
        new_text,
        &document.content()[attr.value_start..attr.value_end],
    )
}

fn attribute_indent(content: &str, block: &BlockSpan, attr: &AttributeSpan) -> String {
    attr.indent
        .clone()
        .unwrap_or_else(|| format!("{}  ", block.indent(content)))
}

/// End of the anchor attribute's line, but never past the block's closing brace.
fn insertion_point(content: &str, block: &BlockSpan, anchor: &AttributeSpan) -> usize {
    let close = block.end - 1;
    let line_end = content[anchor.value_end..]
        .find('\n')
        .map_or(content.len(), |idx| anchor.value_end + idx);
    let line_end = line_end.min(close);
    // After a trailing comment, before trailing blanks
    content[anchor.value_end..line_end].trim_end().len() + anchor.value_end
}
