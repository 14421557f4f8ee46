// ABOUTME: Version/banner constants and REPL history settings for the demo binary

pub const VERSION: &str = "0.1.0";
pub const WELCOME_MESSAGE: &str = "minilisp";
pub const WELCOME_SUBTITLE: &str = "An embeddable Lisp with a mark-and-sweep heap";

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub file: String,
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig { file: ".minilisp_history".to_string(), max_entries: 1000 }
    }
}
