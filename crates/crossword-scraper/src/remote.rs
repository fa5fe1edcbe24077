//! Running scripts inside page frames, and reading cookies for a page.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::types::{FrameId, TabId};

/// A named JavaScript function executed in a frame's page context.
///
/// The function takes no arguments and returns a string; an empty string means nothing was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScript {
    pub name: &'static str,
    pub source: Cow<'static, str>,
}

impl PageScript {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self {
            name,
            source: Cow::Borrowed(source),
        }
    }

    /// A script whose body is built at runtime.
    pub fn dynamic(name: &'static str, source: String) -> Self {
        Self {
            name,
            source: Cow::Owned(source),
        }
    }

    /// Script that returns `JSON.stringify` of a global expression, or `''` if it is unset.
    ///
    /// Only absence is mapped to `''`; any other page exception propagates to the executor.
    pub fn read_global_json(name: &'static str, expression: &str) -> Self {
        let guard = presence_guard(expression);
        Self::dynamic(
            name,
            format!("function() {{ var v = {guard}; return v ? JSON.stringify(v) : ''; }}"),
        )
    }

    /// Script that returns a global string expression, or `''` if it is unset.
    pub fn read_global_string(name: &'static str, expression: &str) -> Self {
        let guard = presence_guard(expression);
        Self::dynamic(
            name,
            format!("function() {{ var v = {guard}; return v ? String(v) : ''; }}"),
        )
    }

    /// An immediately-invoked expression of the function, ready for evaluation.
    pub fn invocation(&self) -> String {
        format!("({})()", self.source.trim())
    }
}

/// `window.a.b.c` becomes `window.a && window.a.b && window.a.b.c`, so a missing object on
/// the path reads as unset instead of throwing.
fn presence_guard(expression: &str) -> String {
    let parts: Vec<&str> = expression.split('.').collect();
    let first = if parts.first() == Some(&"window") { 2 } else { 1 };
    (first.min(parts.len())..=parts.len())
        .map(|end| parts[..end].join("."))
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Executes a script in frame `frame_id` of tab `tab_id` and returns its string result.
///
/// Transport and page errors must surface as [`ExecutionError`], never as an empty string.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(
        &self,
        tab_id: TabId,
        frame_id: FrameId,
        script: &PageScript,
    ) -> Result<String, ExecutionError>;
}

/// Cookie lookup for a page URL.
#[async_trait]
pub trait CookieStore: Send + Sync {
    async fn cookie(&self, url: &str, name: &str) -> Option<String>;
}

/// A cookie store with no cookies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCookies;

#[async_trait]
impl CookieStore for NoCookies {
    async fn cookie(&self, _url: &str, _name: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_wraps_function() {
        let script = PageScript::new("title", "  function() { return document.title; }\n");
        assert_eq!(
            script.invocation(),
            "(function() { return document.title; })()"
        );
    }

    #[test]
    fn test_read_global_json() {
        let script = PageScript::read_global_json("gameData", "window.gameData");
        assert!(script.source.contains("var v = window.gameData;"));
        assert!(script.source.contains("JSON.stringify(v)"));
        assert_eq!(script.name, "gameData");
    }

    #[test]
    fn test_nested_global_is_guarded_without_catch() {
        let script = PageScript::read_global_json("wsj", "window.oApp.puzzle.JSON");
        assert!(script
            .source
            .contains("var v = window.oApp && window.oApp.puzzle && window.oApp.puzzle.JSON;"));
        assert!(!script.source.contains("catch"));

        let script = PageScript::read_global_string("data", "window.CrosswordPuzzleData");
        assert_eq!(
            script.source,
            "function() { var v = window.CrosswordPuzzleData; return v ? String(v) : ''; }"
        );
    }

    #[test]
    fn test_presence_guard() {
        assert_eq!(presence_guard("window.gameData"), "window.gameData");
        assert_eq!(presence_guard("crossword.jsonData"), "crossword && crossword.jsonData");
        assert_eq!(presence_guard("window"), "window");
    }

    #[tokio::test]
    async fn test_no_cookies() {
        assert_eq!(NoCookies.cookie("https://example.com", "NYT-S").await, None);
    }
}
