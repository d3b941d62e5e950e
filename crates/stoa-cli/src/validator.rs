use reedline::{ValidationResult, Validator};

pub struct SqlValidator;

impl Validator for SqlValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let trimmed = line.trim();

        // Empty input and dot commands are always complete.
        if trimmed.is_empty() || trimmed.starts_with('.') {
            return ValidationResult::Complete;
        }

        // Unbalanced parentheses continue on the next line.
        let mut depth: i32 = 0;
        let mut in_string = false;
        for ch in trimmed.chars() {
            if ch == '\'' {
                in_string = !in_string;
            } else if !in_string {
                match ch {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
            }
        }
        if depth > 0 || in_string {
            return ValidationResult::Incomplete;
        }

        // SQL ends with a semicolon.
        if !trimmed.ends_with(';') {
            return ValidationResult::Incomplete;
        }

        ValidationResult::Complete
    }
}
