// Centralized UI strings and labels.

pub const PRIMING_PROMPT: &str = "You are Claude, an AI assistant created by Anthropic to be helpful, \
harmless, and honest. Respond to user queries accurately and concisely. You are being used in a \
terminal interface, so format your responses appropriately using Markdown.";

pub const TIMEOUT_MESSAGE: &str =
    "Request timed out. The API didn't respond in a reasonable time.";

// Role labels shown above each transcript entry
pub const LABEL_USER: &str = "You:";
pub const LABEL_ASSISTANT: &str = "AI:";
pub const LABEL_SYSTEM: &str = "System:";

pub const THINKING: &str = "Thinking";

// UI block titles (keep surrounding spaces for visual padding)
pub const TITLE_CHAT: &str = " Chat ";
pub const TITLE_INPUT: &str = " Input ";
pub const TITLE_MODELS: &str = " Models ";

pub const INPUT_HINT: &str = "Type your message here...";

pub const HELP_EMPTY: &[&str] = &[
    "Type a message to start the conversation.",
    "Ctrl+F to select a model, Ctrl+K to clear chat history, Ctrl+C to quit.",
    "Set an API key with /key <key>.",
    "You can include images by adding 'image:' followed by the path to the image.",
];

pub const STATUS_HINT: &str =
    "Ctrl+F: Change Model • Ctrl+K: Clear Chat • PgUp/PgDn: Scroll • Ctrl+C: Quit";

pub const PICKER_TITLE: &str = "Model Selector";
pub const PICKER_HINT: &str =
    "i or /: Search • ↑↓ or j/k: Navigate • PgUp/PgDn: Jump • Enter: Select • ESC: Close";
pub const PICKER_SEARCH_HINT: &str =
    "ESC: Exit Search • Type to filter • ↑/↓: Navigate • Enter: Select";
pub const PICKER_NO_MATCHES: &str = "No models match your search query.";

pub fn error_message(detail: &str) -> String {
    format!("Error: {}", detail)
}

pub fn error_banner(detail: &str) -> String {
    format!("ERROR: {}", detail)
}

pub fn using_model(model: &str) -> String {
    format!("Using model: {}", model)
}

pub fn search_prompt(query: &str) -> String {
    format!("Search Models: '{}_'", query)
}

pub fn match_count(shown: usize, total: usize, query: &str) -> String {
    format!("Showing {}/{} models matching '{}'", shown, total, query)
}

pub fn token_usage(prompt: u32, completion: u32, total: u32) -> String {
    format!(
        "Tokens: {} prompt + {} completion = {} total",
        prompt, completion, total
    )
}
