/// Harness Composer
///
/// Wraps untrusted user code into a unit the engine can run in isolation.
/// The harness buffers the whole of stdin before the user's code is loaded,
/// requires an entry point named `solve`, and calls it with stdin rewound to
/// the buffered test input.
///
/// Composition is pure text assembly. Test input never enters the composed
/// unit; the engine hands it to the child over stdin at run time, so one
/// composed unit serves every test case of a submission.

use learnbase_common::types::Language;

pub const ENTRY_POINT: &str = "solve";

/// Last stderr line the harness prints when the entry point is missing
pub const MISSING_ENTRY_POINT_MARKER: &str = "No solve() function found";

/// Exit status the harness reserves for a missing entry point. A run only
/// counts as missing its entry point when both this status and the marker
/// are present, so user code printing the marker on its own is a plain crash.
pub const MISSING_ENTRY_POINT_EXIT_CODE: i32 = 86;

const USER_CODE_PLACEHOLDER: &str = "{USER_CODE}";

const FUTURE_IMPORT_PREFIX: &str = "from __future__ import";

const PYTHON_HARNESS: &str = r#"import sys, json
import io as __learnbase_io
__learnbase_input = sys.stdin.read()
sys.stdin = __learnbase_io.StringIO(__learnbase_input)

{USER_CODE}

import sys as __learnbase_sys
if not callable(globals().get('{ENTRY_POINT}')):
    __learnbase_sys.stderr.write('{MISSING_MARKER}\n')
    __learnbase_sys.stderr.flush()
    __learnbase_sys.exit({MISSING_EXIT_CODE})
__learnbase_sys.stdin = __learnbase_io.StringIO(__learnbase_input)
{ENTRY_POINT}()
"#;

/// A self-contained program ready to be staged and executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedUnit {
    pub language: Language,
    pub source: String,
}

impl ComposedUnit {
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Harness template with its fixed placeholders filled in. Only
/// `{USER_CODE}` is left for `compose`.
fn harness_template(language: Language) -> String {
    let template = match language {
        Language::Python => PYTHON_HARNESS,
    };
    template
        .replace("{ENTRY_POINT}", ENTRY_POINT)
        .replace("{MISSING_MARKER}", MISSING_ENTRY_POINT_MARKER)
        .replace(
            "{MISSING_EXIT_CODE}",
            &MISSING_ENTRY_POINT_EXIT_CODE.to_string(),
        )
}

/// Split column-0 `from __future__ import` lines out of `source_code`.
///
/// Python only accepts them at the very top of a module, which the harness
/// preamble would otherwise occupy. Each hoisted line leaves a blank line
/// behind so the rest of the user's code keeps its line count.
fn hoist_future_imports(source_code: &str) -> (String, String) {
    let mut hoisted = String::new();
    let mut body = String::with_capacity(source_code.len());

    for line in source_code.split_inclusive('\n') {
        if line.starts_with(FUTURE_IMPORT_PREFIX) {
            hoisted.push_str(line.trim_end_matches(['\r', '\n']));
            hoisted.push('\n');
            if line.ends_with('\n') {
                body.push('\n');
            }
        } else {
            body.push_str(line);
        }
    }

    (hoisted, body)
}

/// Compose the runnable unit for `source_code`. Never fails.
pub fn compose(language: Language, source_code: &str) -> ComposedUnit {
    let template = harness_template(language);
    let (future_imports, body) = hoist_future_imports(source_code);

    let mut source = future_imports;
    // Single pass over the template: placeholders inside user code stay literal
    source.push_str(&template.replacen(USER_CODE_PLACEHOLDER, &body, 1));

    ComposedUnit { language, source }
}

/// Whether a failed run is the harness's missing-entry-point exit
pub fn is_missing_entry_point(exit_code: i32, stderr: &str) -> bool {
    exit_code == MISSING_ENTRY_POINT_EXIT_CODE
        && stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim() == MISSING_ENTRY_POINT_MARKER)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_embeds_user_code() {
        let code = "def solve():\n  print(input().strip().upper())";
        let unit = compose(Language::Python, code);
        assert_eq!(unit.language, Language::Python);
        assert!(unit.source.contains(code));
        assert!(!unit.source.contains(USER_CODE_PLACEHOLDER));
        assert!(!unit.source.contains("{ENTRY_POINT}"));
        assert!(!unit.source.contains("{MISSING_EXIT_CODE}"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let a = compose(Language::Python, "def solve(): pass");
        let b = compose(Language::Python, "def solve(): pass");
        assert_eq!(a, b);
    }

    #[test]
    fn test_stdin_is_buffered_before_user_code() {
        let unit = compose(Language::Python, "USER_MARK = 1");
        let read_at = unit.source.find("sys.stdin.read()").unwrap();
        let user_at = unit.source.find("USER_MARK").unwrap();
        let call_at = unit.source.rfind("solve()").unwrap();
        assert!(read_at < user_at);
        assert!(user_at < call_at);
    }

    #[test]
    fn test_placeholder_in_user_code_is_not_expanded() {
        let code = "s = '{USER_CODE}{ENTRY_POINT}'\ndef solve(): print(s)";
        let unit = compose(Language::Python, code);
        assert!(unit.source.contains("s = '{USER_CODE}{ENTRY_POINT}'"));
        assert_eq!(unit.source.matches(code).count(), 1);
    }

    #[test]
    fn test_empty_code_still_composes() {
        let unit = compose(Language::Python, "");
        assert!(!unit.is_empty());
        assert!(unit.source.contains(MISSING_ENTRY_POINT_MARKER));
        assert!(unit
            .source
            .contains(&format!("exit({})", MISSING_ENTRY_POINT_EXIT_CODE)));
    }

    #[test]
    fn test_future_imports_are_hoisted_to_the_top() {
        let code = "from __future__ import annotations\n\ndef solve() -> None:\n  print(1)\n";
        let unit = compose(Language::Python, code);

        assert!(unit
            .source
            .starts_with("from __future__ import annotations\nimport sys, json\n"));
        assert_eq!(unit.source.matches(FUTURE_IMPORT_PREFIX).count(), 1);
        // Left behind as a blank line so user line numbers hold
        assert!(unit.source.contains("\n\n\ndef solve() -> None:\n  print(1)\n"));
    }

    #[test]
    fn test_indented_future_text_is_left_alone() {
        let code = "def solve():\n    s = 'from __future__ import x'\n    print(s)";
        let (hoisted, body) = hoist_future_imports(code);
        assert!(hoisted.is_empty());
        assert_eq!(body, code);
    }

    #[test]
    fn test_missing_entry_point_detection() {
        let code = MISSING_ENTRY_POINT_EXIT_CODE;
        assert!(is_missing_entry_point(code, "No solve() function found\n"));
        assert!(is_missing_entry_point(
            code,
            "warning: x\nNo solve() function found\n\n"
        ));
        assert!(!is_missing_entry_point(
            code,
            "Traceback (most recent call last):\nZeroDivisionError: division by zero\n"
        ));
        assert!(!is_missing_entry_point(code, ""));
    }

    #[test]
    fn test_marker_without_reserved_exit_code_is_not_missing_entry_point() {
        assert!(!is_missing_entry_point(1, "No solve() function found\n"));
        assert!(!is_missing_entry_point(0, "No solve() function found\n"));
    }
}
