//! Operation requests accepted by the editing tools.
//!
//! Each request is parsed from the JSON `arguments` object of a `tools/call`
//! message. Optional parameters are explicit fields with documented defaults,
//! so a request always carries the exact values the script is rendered from.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::indesign::error::{EditError, EditResult};

/// Where `add_text` inserts its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Before the first character of the first story.
    Start,
    /// After the last character of the first story.
    #[default]
    End,
    /// Immediately after the current selection.
    AfterSelection,
}

impl Position {
    /// All accepted positions, in schema order.
    pub const ALL: [Self; 3] = [Self::Start, Self::End, Self::AfterSelection];

    /// Returns the wire name used in tool arguments.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::AfterSelection => "after_selection",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                EditError::invalid_argument(
                    "position",
                    format!("'{s}' is not one of: start, end, after_selection"),
                )
            })
    }
}

/// Parameters for `add_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTextRequest {
    /// Literal text to insert. Never empty.
    pub text: String,
    /// Insertion point. Default: [`Position::End`].
    pub position: Position,
}

impl AddTextRequest {
    /// Creates a request, rejecting empty text.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidArgument`] if `text` is empty.
    pub fn new(text: impl Into<String>, position: Position) -> EditResult<Self> {
        let text = text.into();
        require_non_empty("text", &text)?;
        Ok(Self { text, position })
    }

    /// Parses the request from tool arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidArgument`] if `text` is missing or empty,
    /// or `position` is not a known position.
    pub fn from_arguments(arguments: &Value) -> EditResult<Self> {
        let text = required_str(arguments, "text")?;
        let position = match arguments.get("position") {
            None | Some(Value::Null) => Position::default(),
            Some(Value::String(s)) => s.parse()?,
            Some(_) => {
                return Err(EditError::invalid_argument("position", "must be a string"));
            }
        };
        Self::new(text, position)
    }
}

/// Parameters for `update_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTextRequest {
    /// Literal text to search for. Never empty.
    pub find_text: String,
    /// Replacement text. May be empty.
    pub replace_text: String,
    /// Change every match instead of only the first. Default: `false`.
    pub all_occurrences: bool,
}

impl UpdateTextRequest {
    /// Creates a request, rejecting an empty search string.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidArgument`] if `find_text` is empty.
    pub fn new(
        find_text: impl Into<String>,
        replace_text: impl Into<String>,
        all_occurrences: bool,
    ) -> EditResult<Self> {
        let find_text = find_text.into();
        require_non_empty("find_text", &find_text)?;
        Ok(Self {
            find_text,
            replace_text: replace_text.into(),
            all_occurrences,
        })
    }

    /// Parses the request from tool arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidArgument`] if `find_text` is missing or
    /// empty, `replace_text` is missing, or `all_occurrences` is not a boolean.
    pub fn from_arguments(arguments: &Value) -> EditResult<Self> {
        let find_text = required_str(arguments, "find_text")?;
        let replace_text = required_str(arguments, "replace_text")?;
        let all_occurrences = optional_bool(arguments, "all_occurrences")?;
        Self::new(find_text, replace_text, all_occurrences)
    }
}

/// Parameters for `remove_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveTextRequest {
    /// Literal text to remove. Never empty.
    pub text: String,
    /// Remove every match instead of only the first. Default: `false`.
    pub all_occurrences: bool,
}

impl RemoveTextRequest {
    /// Creates a request, rejecting empty text.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidArgument`] if `text` is empty.
    pub fn new(text: impl Into<String>, all_occurrences: bool) -> EditResult<Self> {
        let text = text.into();
        require_non_empty("text", &text)?;
        Ok(Self {
            text,
            all_occurrences,
        })
    }

    /// Parses the request from tool arguments.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidArgument`] if `text` is missing or empty,
    /// or `all_occurrences` is not a boolean.
    pub fn from_arguments(arguments: &Value) -> EditResult<Self> {
        let text = required_str(arguments, "text")?;
        let all_occurrences = optional_bool(arguments, "all_occurrences")?;
        Self::new(text, all_occurrences)
    }

    /// Expresses the removal as a find/change with an empty replacement.
    #[must_use]
    pub fn as_update(&self) -> UpdateTextRequest {
        UpdateTextRequest {
            find_text: self.text.clone(),
            replace_text: String::new(),
            all_occurrences: self.all_occurrences,
        }
    }
}

fn require_non_empty(name: &str, value: &str) -> EditResult<()> {
    if value.is_empty() {
        return Err(EditError::invalid_argument(name, "must not be empty"));
    }
    Ok(())
}

fn required_str<'a>(arguments: &'a Value, name: &str) -> EditResult<&'a str> {
    match arguments.get(name) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(EditError::invalid_argument(
            name,
            "missing required parameter",
        )),
        Some(_) => Err(EditError::invalid_argument(name, "must be a string")),
    }
}

fn optional_bool(arguments: &Value, name: &str) -> EditResult<bool> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(EditError::invalid_argument(name, "must be a boolean")),
    }
}
