//! Turning free-form release names into valid ref components

/// Make `name` usable as a single git ref component.
///
/// Whitespace and characters git forbids in ref names collapse into one
/// dash, `..` sequences are broken up and a trailing `.lock` or dot is
/// dropped. `"Release 2024/Q1"` becomes `"Release-2024-Q1"`.
pub fn ref_component(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_dash = true;

    for c in name.chars() {
        let forbidden = c.is_whitespace()
            || c.is_control()
            || matches!(c, '/' | '\\' | '~' | '^' | ':' | '?' | '*' | '[' | '@' | '{' | '}');
        if forbidden {
            if !last_was_dash {
                result.push('-');
                last_was_dash = true;
            }
        } else if c == '.' && result.ends_with('.') {
            continue;
        } else {
            result.push(c);
            last_was_dash = c == '-';
        }
    }

    while result.ends_with('-') || result.ends_with('.') {
        result.pop();
    }
    if let Some(stripped) = result.strip_suffix(".lock") {
        result = stripped.to_string();
    }
    while result.starts_with('.') || result.starts_with('-') {
        result.remove(0);
    }
    result
}
