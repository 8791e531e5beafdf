//! The automation bridge between tool requests and InDesign.
//!
//! The bridge renders each request into ExtendScript, runs it through a
//! [`ScriptExecutor`], and turns the script's textual result into a typed
//! outcome. Executions are serialised: InDesign has a single active document
//! and selection, so two edits must never interleave.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::indesign::error::{EditError, EditResult};
use crate::indesign::executor::ScriptExecutor;
use crate::indesign::request::{AddTextRequest, RemoveTextRequest, UpdateTextRequest};
use crate::indesign::script::{self, ScriptKind, ScriptReply};

/// Outcome of a find/change operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// At least one match was changed; carries the host's confirmation.
    Changed(String),
    /// Nothing matched. The document is unchanged.
    NotFound,
}

/// Outcome of reading the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentText {
    /// All stories joined with [`script::STORY_DELIMITER`].
    Text(String),
    /// The document has no stories, or every story is empty.
    Empty,
}

/// Renders and executes editing operations against the active document.
pub struct Bridge {
    /// Backend that runs the generated scripts.
    executor: Arc<dyn ScriptExecutor>,
    /// Held for the duration of every script execution.
    exec_lock: Mutex<()>,
}

impl Bridge {
    /// Creates a bridge over the given executor.
    #[must_use]
    pub fn new(executor: impl ScriptExecutor + 'static) -> Self {
        Self::with_executor(Arc::new(executor))
    }

    /// Creates a bridge over a shared executor.
    #[must_use]
    pub fn with_executor(executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            executor,
            exec_lock: Mutex::new(()),
        }
    }

    /// Inserts text at the requested position.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::AutomationFailure`] if the host rejects the script.
    pub async fn add_text(&self, req: &AddTextRequest) -> EditResult<String> {
        let reply = self
            .run(ScriptKind::AddText, script::render_add_text(req))
            .await?;
        payload(ScriptKind::AddText, reply)
    }

    /// Replaces the first (or every) occurrence of `find_text`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::AutomationFailure`] if the host rejects the script.
    pub async fn update_text(&self, req: &UpdateTextRequest) -> EditResult<ChangeOutcome> {
        let reply = self
            .run(ScriptKind::UpdateText, script::render_update_text(req))
            .await?;
        change_outcome(ScriptKind::UpdateText, reply)
    }

    /// Removes the first (or every) occurrence of `text`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::AutomationFailure`] if the host rejects the script.
    pub async fn remove_text(&self, req: &RemoveTextRequest) -> EditResult<ChangeOutcome> {
        let reply = self
            .run(
                ScriptKind::RemoveText,
                script::render_remove_text(&req.as_update()),
            )
            .await?;
        change_outcome(ScriptKind::RemoveText, reply)
    }

    /// Reads the text of every story in the active document.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::AutomationFailure`] if the host rejects the script.
    pub async fn document_text(&self) -> EditResult<DocumentText> {
        let reply = self
            .run(
                ScriptKind::GetDocumentText,
                script::render_get_document_text(),
            )
            .await?;
        match reply {
            ScriptReply::Ok(text) => Ok(DocumentText::Text(text)),
            ScriptReply::NoText => Ok(DocumentText::Empty),
            other => Err(unexpected(ScriptKind::GetDocumentText, &other)),
        }
    }

    /// Reports application and active document status.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::AutomationFailure`] if the host cannot be reached.
    pub async fn status(&self) -> EditResult<String> {
        let reply = self.run(ScriptKind::Status, script::render_status()).await?;
        payload(ScriptKind::Status, reply)
    }

    async fn run(&self, kind: ScriptKind, source: String) -> EditResult<ScriptReply> {
        let _guard = self.exec_lock.lock().await;

        debug!(operation = kind.tool_name(), "Executing script");
        trace!(operation = kind.tool_name(), script = %source, "Generated script");

        let output = match self.executor.execute(&source).await {
            Ok(output) => output,
            Err(message) => {
                warn!(operation = kind.tool_name(), error = %message, "Automation failed");
                return Err(EditError::automation(message));
            }
        };

        script::parse_reply(&output).ok_or_else(|| {
            warn!(operation = kind.tool_name(), output = %output, "Unrecognised script reply");
            EditError::automation(format!("Unexpected script result: {output}"))
        })
    }
}

fn payload(kind: ScriptKind, reply: ScriptReply) -> EditResult<String> {
    match reply {
        ScriptReply::Ok(payload) => Ok(payload),
        other => Err(unexpected(kind, &other)),
    }
}

fn change_outcome(kind: ScriptKind, reply: ScriptReply) -> EditResult<ChangeOutcome> {
    match reply {
        ScriptReply::Ok(confirmation) => Ok(ChangeOutcome::Changed(confirmation)),
        ScriptReply::NotFound => Ok(ChangeOutcome::NotFound),
        other @ ScriptReply::NoText => Err(unexpected(kind, &other)),
    }
}

fn unexpected(kind: ScriptKind, reply: &ScriptReply) -> EditError {
    EditError::automation(format!(
        "Unexpected {reply:?} reply from {}",
        kind.tool_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indesign::request::Position;
    use async_trait::async_trait;

    /// Records every script and answers with a fixed reply.
    struct Recorder {
        reply: Result<String, String>,
        scripts: std::sync::Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                scripts: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn scripts(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScriptExecutor for Recorder {
        async fn execute(&self, script: &str) -> Result<String, String> {
            self.scripts.lock().unwrap().push(script.to_string());
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn add_text_returns_host_confirmation() {
        let recorder = Recorder::new(Ok("ok\nText added at end of 'Doc.indd'"));
        let bridge = Bridge::with_executor(recorder.clone());

        let req = AddTextRequest::new("Hello", Position::End).unwrap();
        let out = bridge.add_text(&req).await.unwrap();

        assert_eq!(out, "Text added at end of 'Doc.indd'");
        assert_eq!(recorder.scripts(), vec![script::render_add_text(&req)]);
    }

    #[tokio::test]
    async fn not_found_status_is_not_an_error() {
        let bridge = Bridge::with_executor(Recorder::new(Ok("not_found")));

        let req = UpdateTextRequest::new("zzznotpresent", "x", false).unwrap();
        assert_eq!(bridge.update_text(&req).await, Ok(ChangeOutcome::NotFound));

        let req = RemoveTextRequest::new("zzznotpresent", true).unwrap();
        assert_eq!(bridge.remove_text(&req).await, Ok(ChangeOutcome::NotFound));
    }

    #[tokio::test]
    async fn no_text_status_is_empty_document() {
        let bridge = Bridge::with_executor(Recorder::new(Ok("no_text")));
        assert_eq!(bridge.document_text().await, Ok(DocumentText::Empty));
    }

    #[tokio::test]
    async fn status_words_in_document_text_are_content() {
        let bridge = Bridge::with_executor(Recorder::new(Ok("ok\nno_text")));
        assert_eq!(
            bridge.document_text().await,
            Ok(DocumentText::Text("no_text".to_string()))
        );

        let bridge = Bridge::with_executor(Recorder::new(Ok("ok\nnot_found")));
        let req = UpdateTextRequest::new("a", "not_found", true).unwrap();
        assert_eq!(
            bridge.update_text(&req).await,
            Ok(ChangeOutcome::Changed("not_found".to_string()))
        );
    }

    #[tokio::test]
    async fn unrecognised_reply_is_automation_failure() {
        let bridge = Bridge::with_executor(Recorder::new(Ok("Text added")));
        let req = AddTextRequest::new("Hello", Position::End).unwrap();
        assert_eq!(
            bridge.add_text(&req).await,
            Err(EditError::automation("Unexpected script result: Text added"))
        );
    }

    #[tokio::test]
    async fn executor_error_is_automation_failure() {
        let bridge = Bridge::with_executor(Recorder::new(Err("no active document")));
        let err = bridge.status().await.unwrap_err();
        assert_eq!(err, EditError::automation("no active document"));
    }

    #[tokio::test]
    async fn remove_renders_remove_script() {
        let recorder = Recorder::new(Ok("ok\nRemoved 1 occurrence(s) from 'Doc.indd'"));
        let bridge = Bridge::with_executor(recorder.clone());

        let req = RemoveTextRequest::new("foo", false).unwrap();
        let outcome = bridge.remove_text(&req).await.unwrap();

        assert_eq!(
            outcome,
            ChangeOutcome::Changed("Removed 1 occurrence(s) from 'Doc.indd'".to_string())
        );
        assert!(recorder.scripts()[0].starts_with("// indesign-mcp: remove_text"));
        assert!(recorder.scripts()[0].contains("var changeTo = \"\";"));
    }
}
