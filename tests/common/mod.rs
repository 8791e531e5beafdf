//! Shared test support: a simulated InDesign host.
//!
//! [`SimulatedInDesign`] implements `ScriptExecutor` by reading the generated
//! ExtendScript the way InDesign would need to: it decodes the string
//! literals the script declares and applies the operation to an in-memory
//! list of stories. A literal that is not valid JavaScript makes the decoder
//! panic, so every test through the simulator also checks escaping. Search
//! strings are read with InDesign's `^` metacharacter rules, and replies use
//! the same `status\npayload` envelope a real script returns.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use indesign_mcp::indesign::script::{
    STATUS_NOT_FOUND, STATUS_NO_TEXT, STATUS_OK, STORY_DELIMITER,
};
use indesign_mcp::indesign::ScriptExecutor;

/// In-memory state of the simulated application.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Name of the active document, or `None` when no document is open.
    pub document: Option<String>,
    /// Story contents in document order.
    pub stories: Vec<String>,
    /// Story index and byte offset just past the current selection.
    pub selection_end: Option<(usize, usize)>,
    /// When set, every script fails with this message.
    pub fail_with: Option<String>,
}

/// A fake InDesign that interprets the scripts this crate generates.
#[derive(Debug, Default)]
pub struct SimulatedInDesign {
    state: Mutex<HostState>,
    scripts: Mutex<Vec<String>>,
}

impl SimulatedInDesign {
    /// An application with one open document holding `stories`.
    pub fn with_document(name: &str, stories: &[&str]) -> Self {
        Self::from_state(HostState {
            document: Some(name.to_string()),
            stories: stories.iter().map(|s| (*s).to_string()).collect(),
            ..HostState::default()
        })
    }

    /// An application with no open documents.
    pub fn without_document() -> Self {
        Self::from_state(HostState::default())
    }

    /// An application whose automation always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self::from_state(HostState {
            fail_with: Some(message.to_string()),
            ..HostState::default()
        })
    }

    pub fn from_state(state: HostState) -> Self {
        Self {
            state: Mutex::new(state),
            scripts: Mutex::new(Vec::new()),
        }
    }

    /// Places the selection end at `offset` bytes into story `story`.
    pub fn select_end(&self, story: usize, offset: usize) {
        self.state.lock().unwrap().selection_end = Some((story, offset));
    }

    pub fn stories(&self) -> Vec<String> {
        self.state.lock().unwrap().stories.clone()
    }

    /// Every script received so far.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    fn run(&self, script: &str) -> Result<String, String> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.fail_with {
            return Err(message.clone());
        }

        let operation = script
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("// indesign-mcp: "))
            .expect("script starts with an operation tag");

        if operation == "indesign_status" {
            let report = match &state.document {
                Some(name) => format!(
                    "Application: Adobe InDesign 20.0\nDocuments open: 1\nActive document: {name}\nStories: {}",
                    state.stories.len()
                ),
                None => "Application: Adobe InDesign 20.0\nDocuments open: 0\nNo documents are currently open."
                    .to_string(),
            };
            return Ok(ok(&report));
        }

        let Some(name) = state.document.clone() else {
            return Err(
                "Adobe InDesign got an error: No documents are open in InDesign. \
                 Please open a document first."
                    .to_string(),
            );
        };

        match operation {
            "add_text" => add_text(&mut state, &name, script).map(|r| ok(&r)),
            "update_text" => find_change(&mut state, &name, script, "Replaced", "in"),
            "remove_text" => find_change(&mut state, &name, script, "Removed", "from"),
            "get_document_text" => {
                if state.stories.iter().all(String::is_empty) {
                    Ok(STATUS_NO_TEXT.to_string())
                } else {
                    Ok(ok(&state.stories.join(STORY_DELIMITER)))
                }
            }
            other => panic!("unexpected operation tag: {other}"),
        }
    }
}

#[async_trait]
impl ScriptExecutor for SimulatedInDesign {
    async fn execute(&self, script: &str) -> Result<String, String> {
        self.scripts.lock().unwrap().push(script.to_string());
        self.run(script)
    }
}

fn add_text(state: &mut HostState, name: &str, script: &str) -> Result<String, String> {
    let text = declared_string(script, "text");
    let target = script
        .lines()
        .find_map(|l| l.trim().strip_prefix("var target = "))
        .expect("add_text declares a target")
        .trim_end_matches(';');

    let placement = match target {
        "doc.stories[0].insertionPoints[0]" | "doc.stories[0].insertionPoints[-1]" => {
            if state.stories.is_empty() {
                return Err("Document has no text stories. Please add a text frame first.".into());
            }
            if target.ends_with("[0]") {
                state.stories[0].insert_str(0, &text);
                "start of"
            } else {
                state.stories[0].push_str(&text);
                "end of"
            }
        }
        "app.selection[0].insertionPoints[-1]" => {
            let Some((story, offset)) = state.selection_end else {
                return Err("Nothing is selected. Select text or a text frame first.".into());
            };
            state.stories[story].insert_str(offset, &text);
            "the selection in"
        }
        other => panic!("unexpected insertion point: {other}"),
    };

    Ok(format!("Text added at {placement} '{name}'"))
}

fn find_change(
    state: &mut HostState,
    name: &str,
    script: &str,
    verb: &str,
    preposition: &str,
) -> Result<String, String> {
    assert!(
        script.contains(".caseSensitive = true;") && script.contains(".wholeWord = false;"),
        "find/change pins case-sensitive, partial-word matching"
    );
    assert!(
        script.contains("app.findChangeTextOptions.properties = savedOptions;"),
        "find/change restores the user's options"
    );
    assert!(
        !script.contains("changeText()"),
        "replacement text is assigned, never interpreted"
    );

    let find = unescape_find_what(&declared_string(script, "findWhat"));
    let change = declared_string(script, "changeTo");
    let all = script.contains("for (var i = hits.length - 1; i >= 0; i--)");

    let mut count = 0;
    for story in &mut state.stories {
        if all {
            count += story.matches(find.as_str()).count();
            *story = story.replace(find.as_str(), &change);
        } else if story.contains(find.as_str()) {
            *story = story.replacen(find.as_str(), &change, 1);
            count = 1;
            break;
        }
    }

    if count == 0 {
        return Ok(STATUS_NOT_FOUND.to_string());
    }
    Ok(ok(&format!(
        "{verb} {count} occurrence(s) {preposition} '{name}'"
    )))
}

fn ok(payload: &str) -> String {
    format!("{STATUS_OK}\n{payload}")
}

/// Reads `findWhat` the way InDesign's text search does.
///
/// `^^` is a literal caret. Any other `^` sequence is a metacharacter the
/// crate should never send, so it panics.
pub fn unescape_find_what(find: &str) -> String {
    let mut out = String::new();
    let mut chars = find.chars();
    while let Some(c) = chars.next() {
        if c == '^' {
            match chars.next() {
                Some('^') => out.push('^'),
                other => panic!("unescaped search metacharacter ^{other:?} in {find:?}"),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decodes the string literal assigned by `var <name> = "...";`.
pub fn declared_string(script: &str, name: &str) -> String {
    let marker = format!("var {name} = ");
    let start = script
        .find(&marker)
        .unwrap_or_else(|| panic!("script declares {name}"))
        + marker.len();
    let (value, rest) = decode_js_literal(&script[start..]);
    assert!(rest.starts_with(';'), "literal for {name} is followed by ';'");
    value
}

/// Parses a double-quoted JavaScript string literal at the start of `src`.
///
/// Returns the decoded value and the remaining source. Panics on anything a
/// JavaScript parser would reject.
pub fn decode_js_literal(src: &str) -> (String, &str) {
    let mut chars = src.char_indices();
    assert_eq!(chars.next().map(|(_, c)| c), Some('"'), "literal opens with '\"'");

    let mut out = String::new();
    let mut pending_high: Option<u16> = None;

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                assert!(pending_high.is_none(), "unpaired surrogate");
                return (out, &src[i + 1..]);
            }
            '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                panic!("unescaped line terminator inside string literal")
            }
            '\\' => {
                let (_, e) = chars.next().expect("escape is complete");
                match e {
                    '\\' => out.push('\\'),
                    '"' => out.push('"'),
                    '\'' => out.push('\''),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => {
                        let hex: String = (0..4)
                            .map(|_| chars.next().expect("four hex digits").1)
                            .collect();
                        let unit = u16::from_str_radix(&hex, 16).expect("valid hex escape");
                        if let Some(high) = pending_high.take() {
                            let decoded = char::decode_utf16([high, unit])
                                .next()
                                .and_then(Result::ok)
                                .expect("valid surrogate pair");
                            out.push(decoded);
                        } else if (0xD800..0xDC00).contains(&unit) {
                            pending_high = Some(unit);
                        } else {
                            out.push(char::from_u32(u32::from(unit)).expect("valid code point"));
                        }
                    }
                    other => panic!("unsupported escape \\{other}"),
                }
            }
            c => out.push(c),
        }
    }

    panic!("unterminated string literal");
}
