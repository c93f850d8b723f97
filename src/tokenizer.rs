//! Source text -> token sequence.
//!
//! Tokens split on whitespace and commas. Grouping glyphs, quoted literals,
//! and comments are recognized here; everything else is emitted verbatim as
//! a word for the compiler to classify. The tokenizer wraps the whole
//! program in an implicit `(`/`)` pair so the compiler always closes one
//! top-level expression.
//!
//! Two glyphs are position-sensitive: a leading `-` or `+` reads as the
//! unary `neg`/`idnt` word unless a digit (number sign) or a space (infix
//! operator) follows, and `--` followed by `>` forms the sequence arrow.
//! A `?` terminates the word before it and collapses any run of `?` into
//! the logical-equivalence word `??`.

use nom::{
    IResult, Parser,
    bytes::complete::take_while1,
    combinator::opt,
};
use tracing::warn;

use std::fmt;

/// One surface token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `(` or `:`
    Open,
    /// `)` or `;`
    Close,
    /// `[`
    ListOpen,
    /// `]`
    ListClose,
    /// `{`
    MapOpen,
    /// `}`
    MapClose,
    /// `'...'` numeric literal body
    Number(String),
    /// `"..."` text literal body, escapes resolved
    Text(String),
    /// `\...\` regex literal body, escapes resolved
    Regex(String),
    /// `` `...` `` format literal body
    Format(String),
    /// Any other whitespace-separated word
    Word(String),
}

impl Token {
    pub fn word(s: impl Into<String>) -> Token {
        Token::Word(s.into())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
            Token::ListOpen => write!(f, "["),
            Token::ListClose => write!(f, "]"),
            Token::MapOpen => write!(f, "{{"),
            Token::MapClose => write!(f, "}}"),
            Token::Number(s) => write!(f, "'{s}'"),
            Token::Text(s) => write!(f, "\"{s}\""),
            Token::Regex(s) => write!(f, "\\{s}\\"),
            Token::Format(s) => write!(f, "`{s}`"),
            Token::Word(s) => write!(f, "{s}"),
        }
    }
}

/// Characters that always terminate a word.
fn is_word_stop(c: char) -> bool {
    c.is_whitespace()
        || (c as u32) < 32
        || matches!(
            c,
            ',' | '(' | ')' | ':' | ';' | '[' | ']' | '{' | '}' | '\'' | '"' | '\\' | '`' | '#'
                | '?'
        )
}

/// Whitespace and commas separate tokens.
fn separators(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_whitespace() || c == ',' || (c as u32) < 32).parse(input)
}

/// Escape characters recognized inside text and regex literals.
fn is_escape_char(c: char) -> bool {
    matches!(c, '\'' | '"' | '\\' | 'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v')
}

/// Read a literal body up to the closing delimiter. Escapes are resolved
/// when `escapes` is set; a backslash before an unrecognized character
/// passes through as-is. An unterminated literal consumes to end of input.
fn read_literal(input: &str, delim: char, escapes: bool, map_escapes: bool) -> (String, &str) {
    let mut body = String::new();
    let mut chars = input.chars();
    let mut escaped = false;

    loop {
        let Some(c) = chars.next() else {
            warn!(delimiter = %delim, "unterminated literal consumed to end of input");
            return (body, chars.as_str());
        };

        if escaped {
            if map_escapes {
                match c {
                    '\\' => body.push('\\'),
                    'a' => body.push('\u{07}'),
                    'b' => body.push('\u{08}'),
                    'f' => body.push('\u{0c}'),
                    'n' => body.push('\n'),
                    'r' => body.push('\r'),
                    't' => body.push('\t'),
                    'v' => body.push('\u{0b}'),
                    c => body.push(c),
                }
            } else if c == '\\' {
                body.push('\\');
            } else {
                body.push(c);
            }
            escaped = false;
            continue;
        }

        if escapes && c == '\\' && chars.as_str().starts_with(is_escape_char) {
            escaped = true;
            continue;
        }

        if c == delim {
            return (body, chars.as_str());
        }

        body.push(c);
    }
}

/// Skip a line comment to its newline.
fn skip_line(input: &str) -> &str {
    match input.find('\n') {
        Some(pos) => &input[pos + 1..],
        None => "",
    }
}

/// Skip a block comment: everything through the closing `##` and the
/// remainder of the line it sits on.
fn skip_block(input: &str) -> &str {
    match input.find("##") {
        Some(pos) => skip_line(&input[pos + 2..]),
        None => "",
    }
}

/// Read one word, stopping at separators and meaningful glyphs. `-` and
/// `+` are only special at a word start, so they pass through here.
fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !is_word_stop(c)).parse(input)
}

/// Tokenize source text. Tokenization is total: malformed input degrades
/// to words and soft warnings, never a failure.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = vec![Token::Open];
    let mut rest = source;

    while !rest.is_empty() {
        if let Ok((after, _)) = separators(rest) {
            rest = after;
            continue;
        }

        let mut chars = rest.chars();
        let c = match chars.next() {
            Some(c) => c,
            None => break,
        };
        let after = chars.as_str();

        match c {
            '#' => {
                if let Some(stripped) = after.strip_prefix('#') {
                    rest = skip_block(stripped);
                } else if let Some(stripped) = after.strip_prefix('!') {
                    tokens.push(Token::word("#!"));
                    rest = stripped;
                } else {
                    rest = skip_line(after);
                }
            }

            '\'' => {
                let (body, after) = read_literal(after, '\'', false, false);
                tokens.push(Token::Number(body));
                rest = after;
            }

            '"' => {
                let (body, after) = read_literal(after, '"', true, true);
                tokens.push(Token::Text(body));
                rest = after;
            }

            '\\' => {
                let (body, after) = read_literal(after, '\\', true, false);
                tokens.push(Token::Regex(body));
                rest = after;
            }

            '`' => {
                let (body, after) = read_literal(after, '`', false, false);
                tokens.push(Token::Format(body));
                rest = after;
            }

            '(' | ':' => {
                tokens.push(Token::Open);
                rest = after;
            }
            ')' | ';' => {
                tokens.push(Token::Close);
                rest = after;
            }
            '[' => {
                tokens.push(Token::ListOpen);
                rest = after;
            }
            ']' => {
                tokens.push(Token::ListClose);
                rest = after;
            }
            '{' => {
                tokens.push(Token::MapOpen);
                rest = after;
            }
            '}' => {
                tokens.push(Token::MapClose);
                rest = after;
            }

            '-' => {
                if let Some(stripped) = after.strip_prefix('-') {
                    if let Some(stripped) = stripped.strip_prefix('>') {
                        tokens.push(Token::word("-->"));
                        rest = stripped;
                    } else {
                        // A bare double negation
                        tokens.push(Token::word("neg"));
                        tokens.push(Token::word("neg"));
                        rest = stripped;
                    }
                } else if after.starts_with(|c: char| c.is_ascii_digit()) {
                    // Sign of a numeric word
                    let (after_word, body) = opt(word).parse(after).unwrap_or((after, None));
                    tokens.push(Token::Word(format!("-{}", body.unwrap_or(""))));
                    rest = after_word;
                } else if after.starts_with(' ') {
                    tokens.push(Token::word("-"));
                    rest = after;
                } else {
                    tokens.push(Token::word("neg"));
                    rest = after;
                }
            }

            '+' => {
                if after.starts_with(|c: char| c.is_ascii_digit()) {
                    let (after_word, body) = opt(word).parse(after).unwrap_or((after, None));
                    tokens.push(Token::Word(format!("+{}", body.unwrap_or(""))));
                    rest = after_word;
                } else if after.starts_with(' ') {
                    tokens.push(Token::word("+"));
                    rest = after;
                } else {
                    tokens.push(Token::word("idnt"));
                    rest = after;
                }
            }

            '?' => {
                // A bare `?` run outside a word still reads as equivalence
                rest = rest.trim_start_matches('?');
                tokens.push(Token::word("??"));
            }

            _ => match word(rest) {
                Ok((after, body)) => {
                    if after.starts_with('?') {
                        tokens.push(Token::word(body));
                        rest = after.trim_start_matches('?');
                        tokens.push(Token::word("??"));
                    } else {
                        tokens.push(Token::word(body));
                        rest = after;
                    }
                }
                Err(_) => {
                    rest = after;
                }
            },
        }
    }

    tokens.push(Token::Close);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tokenize and strip the implicit program wrapper.
    fn inner(source: &str) -> Vec<Token> {
        let mut tokens = tokenize(source);
        assert_eq!(tokens.first(), Some(&Token::Open), "missing leading wrap");
        assert_eq!(tokens.last(), Some(&Token::Close), "missing trailing wrap");
        tokens.remove(0);
        tokens.pop();
        tokens
    }

    fn w(s: &str) -> Token {
        Token::word(s)
    }

    #[test]
    fn test_implicit_wrapping() {
        assert_eq!(tokenize(""), vec![Token::Open, Token::Close]);
        assert_eq!(
            tokenize("x"),
            vec![Token::Open, w("x"), Token::Close]
        );
    }

    #[test]
    fn test_words_split_on_whitespace_and_commas() {
        assert_eq!(inner("a b"), vec![w("a"), w("b")]);
        assert_eq!(inner("a,b"), vec![w("a"), w("b")]);
        assert_eq!(inner("  a \t b \n c  "), vec![w("a"), w("b"), w("c")]);
        assert_eq!(inner("a-b"), vec![w("a-b")]);
        assert_eq!(inner("let"), vec![w("let")]);
    }

    #[test]
    fn test_grouping_tokens() {
        assert_eq!(
            inner("(a)"),
            vec![Token::Open, w("a"), Token::Close]
        );
        // `:` and `;` group exactly like parentheses
        assert_eq!(
            inner(": a ;"),
            vec![Token::Open, w("a"), Token::Close]
        );
        assert_eq!(
            inner("[a]"),
            vec![Token::ListOpen, w("a"), Token::ListClose]
        );
        assert_eq!(
            inner("{a}"),
            vec![Token::MapOpen, w("a"), Token::MapClose]
        );
        // Grouping glyphs terminate words without separating whitespace
        assert_eq!(
            inner("f(x)"),
            vec![w("f"), Token::Open, w("x"), Token::Close]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(inner("'42'"), vec![Token::Number("42".into())]);
        assert_eq!(inner("'3 + 4j'"), vec![Token::Number("3 + 4j".into())]);
        assert_eq!(inner("\"hello\""), vec![Token::Text("hello".into())]);
        assert_eq!(
            inner("\"two words\""),
            vec![Token::Text("two words".into())]
        );
        assert_eq!(inner("\\ab*\\"), vec![Token::Regex("ab*".into())]);
        assert_eq!(inner("`>8.2f`"), vec![Token::Format(">8.2f".into())]);
        assert_eq!(inner("\"\""), vec![Token::Text(String::new())]);
    }

    #[test]
    fn test_text_escapes() {
        let cases: Vec<(&str, &str)> = vec![
            (r#""a\nb""#, "a\nb"),
            (r#""a\tb""#, "a\tb"),
            (r#""a\rb""#, "a\rb"),
            (r#""a\\b""#, "a\\b"),
            (r#""a\"b""#, "a\"b"),
            (r#""a\vb""#, "a\u{0b}b"),
            (r#""a\ab""#, "a\u{07}b"),
            (r#""a\bb""#, "a\u{08}b"),
            (r#""a\fb""#, "a\u{0c}b"),
            // Unknown escapes pass through with the backslash intact
            (r#""a\qb""#, "a\\qb"),
        ];

        for (input, expected) in cases {
            assert_eq!(
                inner(input),
                vec![Token::Text(expected.into())],
                "for {input}"
            );
        }
    }

    #[test]
    fn test_unterminated_literal_is_soft() {
        assert_eq!(inner("\"open"), vec![Token::Text("open".into())]);
        assert_eq!(inner("'12"), vec![Token::Number("12".into())]);
        assert_eq!(inner("`fmt"), vec![Token::Format("fmt".into())]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(inner("a # comment\nb"), vec![w("a"), w("b")]);
        assert_eq!(inner("a # to end of input"), vec![w("a")]);
        assert_eq!(inner("a ## block ## \nb"), vec![w("a"), w("b")]);
        // The closing `##` eats the rest of its line
        assert_eq!(inner("a ## block ## same line\nb"), vec![w("a"), w("b")]);
        assert_eq!(inner("a ## never closed"), vec![w("a")]);
    }

    #[test]
    fn test_shebang() {
        assert_eq!(
            inner("#! NO_EXCEPT true ="),
            vec![w("#!"), w("NO_EXCEPT"), w("true"), w("=")]
        );
    }

    #[test]
    fn test_unary_minus_disambiguation() {
        // Before a non-digit: unary negation
        assert_eq!(inner("-x"), vec![w("neg"), w("x")]);
        // Before a space: the infix subtraction word
        assert_eq!(inner("a - b"), vec![w("a"), w("-"), w("b")]);
        // Before a digit: a signed word
        assert_eq!(inner("-5"), vec![w("-5")]);
        // Doubled: two negations
        assert_eq!(inner("--x"), vec![w("neg"), w("neg"), w("x")]);
        // Arrow
        assert_eq!(inner("-->"), vec![w("-->")]);
        assert_eq!(inner("a --> b"), vec![w("a"), w("-->"), w("b")]);
    }

    #[test]
    fn test_unary_plus_disambiguation() {
        assert_eq!(inner("+x"), vec![w("idnt"), w("x")]);
        assert_eq!(inner("a + b"), vec![w("a"), w("+"), w("b")]);
        assert_eq!(inner("+5"), vec![w("+5")]);
    }

    #[test]
    fn test_logical_equivalence_marker() {
        // `?` terminates the word and any run of `?` collapses
        assert_eq!(inner("x? y"), vec![w("x"), w("??"), w("y")]);
        assert_eq!(inner("x??? y"), vec![w("x"), w("??"), w("y")]);
        assert_eq!(inner("??"), vec![w("??")]);
    }

    #[test]
    fn test_other_arrows_are_plain_words() {
        assert_eq!(inner("<--"), vec![w("<--")]);
        assert_eq!(inner("<->"), vec![w("<->")]);
        assert_eq!(inner("<< >>"), vec![w("<<"), w(">>")]);
    }

    #[test]
    fn test_program_shape() {
        let tokens = tokenize("let x = '7'");
        assert_eq!(
            tokens,
            vec![
                Token::Open,
                w("let"),
                w("x"),
                w("="),
                Token::Number("7".into()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_display_round_trip_shapes() {
        // Token rendering is what parse error context windows show
        assert_eq!(Token::Open.to_string(), "(");
        assert_eq!(Token::MapClose.to_string(), "}");
        assert_eq!(Token::Number("42".into()).to_string(), "'42'");
        assert_eq!(Token::Text("hi".into()).to_string(), "\"hi\"");
        assert_eq!(Token::Format("x".into()).to_string(), "`x`");
        assert_eq!(w("foo").to_string(), "foo");
    }
}
