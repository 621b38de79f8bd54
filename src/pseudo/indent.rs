/// Marker line opening a nested block in generated text.
pub const BLOCK_BEGIN: &str = "INDENT";
/// Marker line closing the innermost open block.
pub const BLOCK_END: &str = "UNINDENT";

const INDENT_UNIT: char = '\t';

/// Replaces block markers with one tab per nesting level.
///
/// Text without markers only has its space runs collapsed, so resolving
/// already-resolved text is a no-op.
pub fn resolve_indentation(text: &str) -> String {
    let mut depth: usize = 0;
    let mut output = String::with_capacity(text.len());
    for line in text.lines() {
        match line {
            BLOCK_BEGIN => depth += 1,
            BLOCK_END => depth = depth.saturating_sub(1),
            _ => {
                output.extend(std::iter::repeat_n(INDENT_UNIT, depth));
                output.push_str(&collapse_spaces(line));
                output.push('\n');
            }
        }
    }
    output.trim().to_string()
}

fn collapse_spaces(line: &str) -> String {
    let mut collapsed = String::with_capacity(line.len());
    let mut previous_space = false;
    for c in line.chars() {
        if c == ' ' && previous_space {
            continue;
        }
        previous_space = c == ' ';
        collapsed.push(c);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_become_tabs() {
        let text = "if a:\nINDENT\nif b:\nINDENT\nc = 1\nUNINDENT\nd = 2\nUNINDENT\ne = 3\n";
        assert_eq!(
            resolve_indentation(text),
            "if a:\n\tif b:\n\t\tc = 1\n\td = 2\ne = 3"
        );
    }

    #[test]
    fn collapses_space_runs() {
        assert_eq!(resolve_indentation("if a or   not(b):"), "if a or not(b):");
    }

    #[test]
    fn resolving_twice_is_stable() {
        let text = "while True:\nINDENT\na  =   3\nif a < 100:\nINDENT\nbreak\nUNINDENT\nUNINDENT\n";
        let once = resolve_indentation(text);
        assert_eq!(resolve_indentation(&once), once);
    }

    #[test]
    fn stray_block_end_is_ignored() {
        assert_eq!(resolve_indentation("UNINDENT\na = 1"), "a = 1");
    }
}
