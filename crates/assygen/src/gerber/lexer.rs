/// One Gerber statement with the physical line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// 1-based line number in the source file.
    pub line: usize,
    pub text: String,
}

impl Statement {
    fn new(line: usize, text: &str) -> Self {
        Self {
            line,
            text: text.to_string(),
        }
    }
}

/// Split file content into statements.
///
/// Each physical line is trimmed and blank lines are dropped. A `%...%`
/// parameter block on one line stays whole. Outside parameter blocks every
/// `*`-terminated word becomes its own statement, so `G01*X0Y0D02*` yields
/// two. A `%` block that does not close on its line (a macro start) is kept
/// as written; its body lines follow as ordinary statements. `G04` comment
/// words run to their `*` even when the text holds a `%`.
pub fn split_statements(content: &str) -> Vec<Statement> {
    let mut statements = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let mut rest = raw.trim();

        while !rest.is_empty() {
            if rest.starts_with('%') {
                match rest[1..].find('%') {
                    Some(pos) => {
                        let end = pos + 2;
                        statements.push(Statement::new(line, &rest[..end]));
                        rest = rest[end..].trim_start();
                    }
                    None => {
                        statements.push(Statement::new(line, rest));
                        break;
                    }
                }
                continue;
            }

            // Comment text may hold '%'; only '*' ends it
            let stops: &[char] = if is_comment_word(rest) { &['*'] } else { &['*', '%'] };
            match rest.find(stops) {
                Some(pos) if rest.as_bytes()[pos] == b'*' => {
                    statements.push(Statement::new(line, rest[..=pos].trim()));
                    rest = rest[pos + 1..].trim_start();
                }
                Some(pos) => {
                    // '%' ends a macro block that was opened on an earlier line
                    let word = rest[..pos].trim();
                    if !word.is_empty() {
                        statements.push(Statement::new(line, word));
                    }
                    rest = &rest[pos..];
                }
                None => {
                    statements.push(Statement::new(line, rest));
                    break;
                }
            }
        }
    }

    statements
}

fn is_comment_word(text: &str) -> bool {
    text.starts_with("G04")
        || text
            .strip_prefix("G4")
            .is_some_and(|r| !r.starts_with(|c: char| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        split_statements(input).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_simple_commands() {
        let input = "G01*\nD10*\nX100Y200D01*\nM02*\n";
        assert_eq!(texts(input), vec!["G01*", "D10*", "X100Y200D01*", "M02*"]);
    }

    #[test]
    fn test_extended_commands_kept_whole() {
        let input = "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.020*%\n";
        assert_eq!(
            texts(input),
            vec!["%FSLAX24Y24*%", "%MOMM*%", "%ADD10C,0.020*%"]
        );
    }

    #[test]
    fn test_line_numbers_and_blank_lines() {
        let input = "%MOMM*%\n\n   \nD10*\r\nX0Y0D03*\n";
        let stmts = split_statements(input);
        assert_eq!(
            stmts,
            vec![
                Statement::new(1, "%MOMM*%"),
                Statement::new(4, "D10*"),
                Statement::new(5, "X0Y0D03*"),
            ]
        );
    }

    #[test]
    fn test_several_words_on_one_line() {
        let stmts = split_statements("G01*X0Y0D02*X100Y0D01*\n");
        assert_eq!(stmts.len(), 3);
        assert!(stmts.iter().all(|s| s.line == 1));
        assert_eq!(stmts[1].text, "X0Y0D02*");
    }

    #[test]
    fn test_several_blocks_on_one_line() {
        assert_eq!(
            texts("%FSLAX24Y24*%%MOMM*%\n"),
            vec!["%FSLAX24Y24*%", "%MOMM*%"]
        );
    }

    #[test]
    fn test_macro_block_lines() {
        let input = "%AMOC8*\n5,1,8,0,0,1.08239X$1,22.5*\n%\n%ADD10OC8,0.8*%\n";
        assert_eq!(
            texts(input),
            vec![
                "%AMOC8*",
                "5,1,8,0,0,1.08239X$1,22.5*",
                "%",
                "%ADD10OC8,0.8*%"
            ]
        );
    }

    #[test]
    fn test_macro_body_closing_on_same_line() {
        assert_eq!(texts("1,1,$1,0,0*%\n"), vec!["1,1,$1,0,0*", "%"]);
    }

    #[test]
    fn test_one_line_macro_kept_whole() {
        assert_eq!(texts("%AMX*1,1,$1,0,0*%\n"), vec!["%AMX*1,1,$1,0,0*%"]);
    }

    #[test]
    fn test_unterminated_continuation() {
        assert_eq!(texts("4,1,3,\n0,0,1,0*\n"), vec!["4,1,3,", "0,0,1,0*"]);
    }

    #[test]
    fn test_percent_inside_comment() {
        assert_eq!(
            texts("G04 copper fill 50% *\nG4 100%*X0Y0D02*\n"),
            vec!["G04 copper fill 50% *", "G4 100%*", "X0Y0D02*"]
        );
    }

    #[test]
    fn test_unterminated_comment_kept_whole() {
        assert_eq!(texts("G04 50% done\n"), vec!["G04 50% done"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("  \n\r\t  ").is_empty());
    }
}
