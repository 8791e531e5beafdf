//! ExtendScript rendering for the editing operations.
//!
//! Every operation becomes a small self-contained JavaScript program that
//! InDesign evaluates with `do script ... language javascript`. The value of
//! the program's final expression is what `osascript` prints on stdout.
//!
//! # Replies
//!
//! Every script returns a status line followed by its payload:
//!
//! ```text
//! ok\n<payload>       the operation ran; payload is a confirmation or text
//! not_found\n         a find/change matched nothing
//! no_text\n           the active document has no text content
//! ```
//!
//! [`parse_reply`] splits that back apart. Document text always travels after
//! `ok`, so no payload can be mistaken for a status. Real failures (no open
//! document, nothing selected) are thrown, which makes `osascript` exit with
//! a non-zero status.
//!
//! # Escaping
//!
//! All caller-supplied text is interpolated through [`js_string_literal`].
//! Find strings additionally go through [`escape_find_what`], because
//! InDesign's text search treats `^` as a metacharacter (`^p`, `^t`, `^9`).
//! Replacements are assigned to `.contents` and need no such escaping.

use std::fmt::Write as _;

use crate::indesign::request::{AddTextRequest, Position, UpdateTextRequest};

/// First-line tag naming the operation a script performs.
pub const OPERATION_TAG: &str = "// indesign-mcp:";

/// Reply status for a completed operation.
pub const STATUS_OK: &str = "ok";

/// Reply status for a find/change that matched nothing.
pub const STATUS_NOT_FOUND: &str = "not_found";

/// Reply status for a document without text content.
pub const STATUS_NO_TEXT: &str = "no_text";

/// Separator placed between stories in `get_document_text` output.
pub const STORY_DELIMITER: &str = "\n";

/// Maximum characters shown in the status report's story preview.
pub const STATUS_PREVIEW_CHARS: usize = 100;

/// Guard shared by every script that touches the active document.
const ACTIVE_DOCUMENT_PRELUDE: &str = r#"    if (app.documents.length === 0) {
        throw new Error("No documents are open in InDesign. Please open a document first.");
    }
    var doc = app.activeDocument;
"#;

/// A script's reply, split into status and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptReply {
    /// The operation ran. Carries the payload verbatim.
    Ok(String),
    /// A find/change matched nothing.
    NotFound,
    /// The active document has no text content.
    NoText,
}

/// Parses the text a script returned.
///
/// The payload after `ok` is kept byte for byte. Returns `None` for output
/// that does not start with a known status line.
#[must_use]
pub fn parse_reply(output: &str) -> Option<ScriptReply> {
    // osascript's own trailing newline is already gone, so a bare status
    // has no line break at all.
    let (status, payload) = output.split_once('\n').unwrap_or((output, ""));
    match status {
        STATUS_OK => Some(ScriptReply::Ok(payload.to_string())),
        STATUS_NOT_FOUND if payload.is_empty() => Some(ScriptReply::NotFound),
        STATUS_NO_TEXT if payload.is_empty() => Some(ScriptReply::NoText),
        _ => None,
    }
}

/// Returns the JavaScript literal that starts a reply with `status`.
fn reply_prefix(status: &str) -> String {
    js_string_literal(&format!("{status}\n"))
}

/// Escapes InDesign text-search metacharacters so `s` is matched literally.
#[must_use]
pub fn escape_find_what(s: &str) -> String {
    s.replace('^', "^^")
}

/// Escapes `s` for use inside a double-quoted JavaScript string literal.
///
/// Backslashes and both quote characters are escaped, as are line
/// terminators (including U+2028/U+2029, which end a line in ES3 source)
/// and all remaining control characters.
#[must_use]
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c if c.is_control() => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Returns `s` as a complete double-quoted JavaScript string literal.
#[must_use]
pub fn js_string_literal(s: &str) -> String {
    format!("\"{}\"", escape_js_string(s))
}

/// Operations a script can perform, used for the script's tag line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Insert text.
    AddText,
    /// Find/change text.
    UpdateText,
    /// Find/change with an empty replacement.
    RemoveText,
    /// Read every story.
    GetDocumentText,
    /// Report application and document status.
    Status,
}

impl ScriptKind {
    /// Returns the tool name this script implements.
    #[must_use]
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::AddText => "add_text",
            Self::UpdateText => "update_text",
            Self::RemoveText => "remove_text",
            Self::GetDocumentText => "get_document_text",
            Self::Status => "indesign_status",
        }
    }

    fn tag_line(self) -> String {
        format!("{OPERATION_TAG} {}\n", self.tool_name())
    }
}

/// Returns the ExtendScript expression for the insertion point of `position`.
///
/// `start` and `end` address the first story; `after_selection` addresses the
/// last insertion point of the current selection.
#[must_use]
pub const fn insertion_point_expr(position: Position) -> &'static str {
    match position {
        Position::Start => "doc.stories[0].insertionPoints[0]",
        Position::End => "doc.stories[0].insertionPoints[-1]",
        Position::AfterSelection => "app.selection[0].insertionPoints[-1]",
    }
}

/// Renders the `add_text` script.
#[must_use]
pub fn render_add_text(req: &AddTextRequest) -> String {
    let guard = match req.position {
        Position::Start | Position::End => {
            r#"    if (doc.stories.length === 0) {
        throw new Error("Document has no text stories. Please add a text frame first.");
    }
"#
        }
        Position::AfterSelection => {
            r#"    if (app.selection.length === 0 || !app.selection[0].hasOwnProperty("insertionPoints")) {
        throw new Error("Nothing is selected. Select text or a text frame first.");
    }
"#
        }
    };
    let placement = match req.position {
        Position::Start => "start of",
        Position::End => "end of",
        Position::AfterSelection => "the selection in",
    };

    format!(
        "{tag}(function () {{\n\
         \x20   var text = {text};\n\
         {prelude}{guard}\
         \x20   var target = {target};\n\
         \x20   target.contents = text;\n\
         \x20   return {ok} + \"Text added at {placement} '\" + doc.name + \"'\";\n\
         }})();\n",
        tag = ScriptKind::AddText.tag_line(),
        ok = reply_prefix(STATUS_OK),
        text = js_string_literal(&req.text),
        prelude = ACTIVE_DOCUMENT_PRELUDE,
        target = insertion_point_expr(req.position),
    )
}

/// Renders the `update_text` script.
#[must_use]
pub fn render_update_text(req: &UpdateTextRequest) -> String {
    render_find_change(ScriptKind::UpdateText, req, "Replaced", "in")
}

/// Renders the `remove_text` script.
///
/// Identical to `update_text` with an empty replacement, apart from the
/// confirmation wording.
#[must_use]
pub fn render_remove_text(req: &UpdateTextRequest) -> String {
    render_find_change(ScriptKind::RemoveText, req, "Removed", "from")
}

fn render_find_change(
    kind: ScriptKind,
    req: &UpdateTextRequest,
    verb: &str,
    preposition: &str,
) -> String {
    // Hits are replaced through `.contents`, so the replacement is literal in
    // both branches. Reverse order keeps earlier hits valid while later ones
    // change length.
    let change = if req.all_occurrences {
        "        var hits = doc.findText();\n\
         \x20       for (var i = hits.length - 1; i >= 0; i--) {\n\
         \x20           hits[i].contents = changeTo;\n\
         \x20       }\n\
         \x20       count = hits.length;\n"
    } else {
        "        var hits = doc.findText();\n\
         \x20       if (hits.length > 0) {\n\
         \x20           hits[0].contents = changeTo;\n\
         \x20           count = 1;\n\
         \x20       }\n"
    };

    format!(
        "{tag}(function () {{\n\
         \x20   var findWhat = {find};\n\
         \x20   var changeTo = {change_to};\n\
         {prelude}\
         \x20   var count = 0;\n\
         \x20   var savedOptions = app.findChangeTextOptions.properties;\n\
         \x20   app.findTextPreferences = NothingEnum.nothing;\n\
         \x20   try {{\n\
         \x20       app.findChangeTextOptions.caseSensitive = true;\n\
         \x20       app.findChangeTextOptions.wholeWord = false;\n\
         \x20       app.findTextPreferences.findWhat = findWhat;\n\
         {change}\
         \x20   }} finally {{\n\
         \x20       app.findTextPreferences = NothingEnum.nothing;\n\
         \x20       app.findChangeTextOptions.properties = savedOptions;\n\
         \x20   }}\n\
         \x20   if (count === 0) {{\n\
         \x20       return {not_found};\n\
         \x20   }}\n\
         \x20   return {ok} + \"{verb} \" + count + \" occurrence(s) {preposition} '\" + doc.name + \"'\";\n\
         }})();\n",
        tag = kind.tag_line(),
        find = js_string_literal(&escape_find_what(&req.find_text)),
        change_to = js_string_literal(&req.replace_text),
        prelude = ACTIVE_DOCUMENT_PRELUDE,
        not_found = reply_prefix(STATUS_NOT_FOUND),
        ok = reply_prefix(STATUS_OK),
    )
}

/// Renders the `get_document_text` script.
///
/// Stories are joined with [`STORY_DELIMITER`] in document story order.
#[must_use]
pub fn render_get_document_text() -> String {
    format!(
        "{tag}(function () {{\n\
         {prelude}\
         \x20   var parts = [];\n\
         \x20   var hasText = false;\n\
         \x20   for (var i = 0; i < doc.stories.length; i++) {{\n\
         \x20       var contents = doc.stories[i].contents;\n\
         \x20       if (contents.length > 0) {{\n\
         \x20           hasText = true;\n\
         \x20       }}\n\
         \x20       parts.push(contents);\n\
         \x20   }}\n\
         \x20   if (!hasText) {{\n\
         \x20       return {no_text};\n\
         \x20   }}\n\
         \x20   return {ok} + parts.join({delimiter});\n\
         }})();\n",
        tag = ScriptKind::GetDocumentText.tag_line(),
        prelude = ACTIVE_DOCUMENT_PRELUDE,
        no_text = reply_prefix(STATUS_NO_TEXT),
        ok = reply_prefix(STATUS_OK),
        delimiter = js_string_literal(STORY_DELIMITER),
    )
}

/// Renders the `indesign_status` script.
///
/// Having no open document is reported, not thrown.
#[must_use]
pub fn render_status() -> String {
    format!(
        "{tag}(function () {{\n\
         \x20   var lines = [];\n\
         \x20   lines.push(\"Application: \" + app.name + \" \" + app.version);\n\
         \x20   lines.push(\"Documents open: \" + app.documents.length);\n\
         \x20   if (app.documents.length > 0) {{\n\
         \x20       var doc = app.activeDocument;\n\
         \x20       lines.push(\"Active document: \" + doc.name);\n\
         \x20       lines.push(\"Stories: \" + doc.stories.length);\n\
         \x20       lines.push(\"Pages: \" + doc.pages.length);\n\
         \x20       if (doc.stories.length > 0) {{\n\
         \x20           var preview = doc.stories[0].contents;\n\
         \x20           if (preview.length > {limit}) {{\n\
         \x20               preview = preview.substring(0, {limit}) + \"...\";\n\
         \x20           }}\n\
         \x20           lines.push(\"First story preview: \" + preview);\n\
         \x20       }}\n\
         \x20   }} else {{\n\
         \x20       lines.push(\"No documents are currently open.\");\n\
         \x20   }}\n\
         \x20   return {ok} + lines.join(\"\\n\");\n\
         }})();\n",
        tag = ScriptKind::Status.tag_line(),
        ok = reply_prefix(STATUS_OK),
        limit = STATUS_PREVIEW_CHARS,
    )
}
