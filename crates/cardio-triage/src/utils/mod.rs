//! Utilities module - Common text processing helpers

pub mod text_utils;

pub use text_utils::{TextUtils, REDACTION_MARKER};
