//! InDesign automation: request types, ExtendScript rendering and execution.
//!
//! # Flow
//!
//! ```text
//! tool arguments ──▶ request ──▶ script ──▶ executor ──▶ InDesign
//!                                   ▲            │
//!                                   └── bridge ◀─┘
//! ```
//!
//! The "active document" and "current selection" belong to InDesign. Nothing
//! here caches or mirrors them; every operation reads them afresh through a
//! generated script. When several documents are open, whichever one InDesign
//! reports as active is the one edited.

pub mod bridge;
pub mod error;
pub mod executor;
pub mod request;
pub mod script;

pub use bridge::{Bridge, ChangeOutcome, DocumentText};
pub use error::{EditError, EditResult};
pub use executor::{OsascriptExecutor, ScriptExecutor};
pub use request::{AddTextRequest, Position, RemoveTextRequest, UpdateTextRequest};
