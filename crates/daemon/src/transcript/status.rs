// Human-readable status lines shown while the assistant works.

use clause_common::path::file_name;
use clause_common::types::ToolInput;
use serde_json::Value;

pub const THINKING: &str = "Thinking…";
pub const ANALYZING_RESULTS: &str = "Analyzing results…";

/// Grep patterns longer than this are truncated in the status line.
const GREP_PATTERN_PREVIEW_CHARS: usize = 30;

fn string_field<'a>(input: &'a ToolInput, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Status phrase for a tool invocation, e.g. `Reading notes.md…`.
pub fn tool_status(name: &str, input: &ToolInput) -> String {
    let phrase = match name {
        "Read" | "Write" | "Edit" => string_field(input, "file_path").map(|path| {
            let verb = match name {
                "Read" => "Reading",
                "Write" => "Writing",
                _ => "Editing",
            };
            format!("{verb} {}…", file_name(path))
        }),
        "Bash" => string_field(input, "description").map(|description| format!("{description}…")),
        "Task" => {
            string_field(input, "subagent_type").map(|kind| format!("Spawning {kind} agent…"))
        }
        "Grep" => string_field(input, "pattern").map(|pattern| {
            let preview: String = pattern.chars().take(GREP_PATTERN_PREVIEW_CHARS).collect();
            format!("Searching for \"{preview}\"…")
        }),
        "Glob" => {
            string_field(input, "pattern").map(|pattern| format!("Finding files matching \"{pattern}\"…"))
        }
        _ => None,
    };
    phrase.unwrap_or_else(|| format!("Running {name}…"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> ToolInput {
        match value {
            Value::Object(map) => map,
            _ => panic!("tool input must be an object"),
        }
    }

    #[test]
    fn file_tools_use_basename() {
        let args = input(json!({"file_path": "/work/book/chapter-1.md"}));
        assert_eq!(tool_status("Read", &args), "Reading chapter-1.md…");
        assert_eq!(tool_status("Write", &args), "Writing chapter-1.md…");
        assert_eq!(tool_status("Edit", &args), "Editing chapter-1.md…");
    }

    #[test]
    fn bash_uses_description() {
        let args = input(json!({"command": "ls -la", "description": "List files"}));
        assert_eq!(tool_status("Bash", &args), "List files…");
    }

    #[test]
    fn task_names_subagent() {
        let args = input(json!({"subagent_type": "research"}));
        assert_eq!(tool_status("Task", &args), "Spawning research agent…");
    }

    #[test]
    fn grep_pattern_is_truncated() {
        let args = input(json!({"pattern": "abcdefghijklmnopqrstuvwxyz0123456789"}));
        assert_eq!(tool_status("Grep", &args), "Searching for \"abcdefghijklmnopqrstuvwxyz0123\"…");
    }

    #[test]
    fn glob_shows_pattern() {
        let args = input(json!({"pattern": "**/*.md"}));
        assert_eq!(tool_status("Glob", &args), "Finding files matching \"**/*.md\"…");
    }

    #[test]
    fn missing_argument_falls_back_to_running() {
        assert_eq!(tool_status("Read", &ToolInput::new()), "Running Read…");
        assert_eq!(tool_status("Bash", &input(json!({"description": 3}))), "Running Bash…");
        assert_eq!(tool_status("WebFetch", &ToolInput::new()), "Running WebFetch…");
    }
}
