//! Pseudocode front end: lexer, grammar and indentation resolver.
//!
//! ```text
//! pseudocode ─▶ lexer ─▶ grammar (text + block markers) ─▶ indent ─▶ target code
//! ```

pub mod error;
pub mod grammar;
pub mod indent;
pub mod lexer;
pub mod token;

pub use error::{Diagnostic, DiagnosticKind, LexError};
pub use grammar::ParseResult;

/// Translates pseudocode into indented target code.
///
/// Lexical diagnostics come first, followed by syntax diagnostics; both are
/// returned alongside whatever code could be produced.
pub fn translate(source: &str) -> ParseResult {
    let (tokens, mut diagnostics) = lexer::tokenize(source);
    let parsed = grammar::parse(&tokens);
    diagnostics.extend(parsed.diagnostics);
    ParseResult {
        code: parsed.code.map(|code| indent::resolve_indentation(&code)),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated(source: &str) -> String {
        let result = translate(source);
        assert!(
            result.diagnostics.is_empty(),
            "unexpected diagnostics for {source:?}: {:?}",
            result.diagnostics
        );
        result.code.expect("translation produced no code")
    }

    #[test]
    fn translates_assignments() {
        assert_eq!(translated("a <- 3"), "a = 3");
        assert_eq!(translated("a <- {1, 2, 3}"), "a = {1,2,3}");
        assert_eq!(translated("a <- [1, 2, 3]"), "a = [1,2,3]");
        assert_eq!(translated("a[1] <- 3"), "a[1] = 3");
        assert_eq!(translated("a <- b[3]"), "a = b[3]");
        assert_eq!(translated("a <- func(b, c)"), "a = func(b, c)");
    }

    #[test]
    fn translates_arithmetic() {
        assert_eq!(translated("a <- 3 + b"), "a = 3 + b");
        assert_eq!(translated("a <- 9//3"), "a = 9 // 3");
        assert_eq!(translated("a <- 9^3 * (9%3)"), "a = 9 ** 3 * (9 % 3)");
        assert_eq!(translated("a <- b[3] + c[2]"), "a = b[3] + c[2]");
        assert_eq!(translated("a <- i-1"), "a = i - 1");
    }

    #[test]
    fn translates_conditions() {
        assert_eq!(translated("if a then b <- 3 endif"), "if a:\n\tb = 3");
        assert_eq!(translated("if a<=3 then b <- 3 endif"), "if a <= 3:\n\tb = 3");
        assert_eq!(
            translated("if a>3 or not a != c then b <- 3 endif"),
            "if a > 3 or not(a != c):\n\tb = 3"
        );
        assert_eq!(
            translated("if a>=3 and (c ==1) then b <- 3 endif"),
            "if a >= 3 and (c == 1):\n\tb = 3"
        );
        assert_eq!(
            translated("if a < b and not d then b <- 3 endif"),
            "if a < b and not(d):\n\tb = 3"
        );
        assert_eq!(translated("if (a) then b <- 3 endif"), "if (a):\n\tb = 3");
        assert_eq!(
            translated("if a then b <- 3\na <- 9 endif"),
            "if a:\n\tb = 3\n\ta = 9"
        );
        assert_eq!(
            translated("if x not in s then s <- 1 endif"),
            "if x not in s:\n\ts = 1"
        );
    }

    #[test]
    fn translates_if_else_and_nesting() {
        assert_eq!(
            translated("if a < b and (a > 1) then b <- 3 else c <- 1+ 3 endif"),
            "if a < b and (a > 1):\n\tb = 3\nelse:\n\tc = 1 + 3"
        );
        assert_eq!(
            translated("if a < b and not d then if c then e <- 3 endif endif"),
            "if a < b and not(d):\n\tif c:\n\t\te = 3"
        );
    }

    #[test]
    fn translates_loops() {
        assert_eq!(
            translated("repeat a <- 3 until a < 100"),
            "while True:\n\ta = 3\n\tif a < 100:\n\t\tbreak"
        );
        assert_eq!(
            translated("for i in 1 to 10 by 1 do a <- 10+i endfor"),
            "for i in range(1,10,1):\n\ta = 10 + i"
        );
        assert_eq!(
            translated("for i in menge do a <- 10 endfor"),
            "for i in menge:\n\ta = 10"
        );
        assert_eq!(
            translated("for i in {1, 2} do a <- i endfor"),
            "for i in {1,2}:\n\ta = i"
        );
        assert_eq!(
            translated("FOR i IN 0 TO n DO a <- i ENDFOR"),
            "for i in range(0,n):\n\ta = i"
        );
    }

    #[test]
    fn translates_procedures() {
        assert_eq!(
            translated("procedure func (param1, param2) a <- 3 endproc"),
            "def func (param1,param2):\n\ta = 3"
        );
        assert_eq!(
            translated("procedure func (param1) a <- 3 return endproc"),
            "def func (param1):\n\ta = 3\n\treturn"
        );
        assert_eq!(
            translated(
                "procedure func (param1, param2) if param1 > param2 then return param2 else return param1 endif endproc"
            ),
            "def func (param1,param2):\n\tif param1 > param2:\n\t\treturn param2\n\telse:\n\t\treturn param1"
        );
        assert_eq!(
            translated(
                "procedure func (param1, param2) repeat a <- 3 + {1,2,3} until a == 100 return param2 endproc"
            ),
            "def func (param1,param2):\n\twhile True:\n\t\ta = 3 + {1,2,3}\n\t\tif a == 100:\n\t\t\tbreak\n\treturn param2"
        );
    }

    #[test]
    fn translation_is_deterministic() {
        let source = "procedure f(n) if n < 2 then return n endif return f(n-1) + f(n-2) endproc x <- f(10)";
        assert_eq!(translate(source), translate(source));
    }

    #[test]
    fn lexical_diagnostics_do_not_block_translation() {
        let result = translate("a <- 3 $");
        assert_eq!(result.code.as_deref(), Some("a = 3"));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Lexical);
    }
}
