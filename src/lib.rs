//! Oliver - an interpreter for a small, dynamically-typed expression language
//!
//! Oliver is a Lisp-influenced language with an infix surface syntax. Source
//! text is tokenized, compiled into a postfix expression tree of runtime
//! values, and executed by an iterative two-stack machine:
//!
//! ```text
//! let x = '7'
//! if (x > '3') : "big" << endl ;
//! else         : "small" << endl ;
//! ```
//!
//! The pipeline is deliberately small:
//!
//! - `tokenizer`: character stream -> token sequence (literals, comments,
//!   grouping, unary-operator disambiguation)
//! - `compiler`: token sequence -> a single postfix expression value, with
//!   infix and prefix operator forms rewritten at compile time
//! - `evaluator`: a stack machine pulling terms from a code stack and
//!   producing values on a data stack, with a lexical scope chain
//!
//! Every runtime value is one [`value::Value`], a closed sum over the kinds
//! nothing, boolean, number, text, symbol, op-call, error, expression, list,
//! object, function, and format. All kinds answer the same operation
//! vocabulary; operations that are meaningless for a kind return nothing or
//! an unordered comparison rather than failing.
//!
//! ## Errors
//!
//! Evaluation errors are data: they surface as values of the error kind and
//! flow through the stacks like any other value. The types in this module
//! cover only host-level failures - malformed grouping at compile time and
//! I/O from the command line front end.
//!
//! ## Modules
//!
//! - `value`: the polymorphic runtime value and its dispatch
//! - `number`, `boolean`, `object`, `function`, `format`: kind behavior
//! - `opcode`: the operator enumeration, name table, and range classification
//! - `tokenizer`: source text -> tokens
//! - `compiler`: tokens -> postfix code tree
//! - `evaluator`: the two-stack interpreter

use std::fmt;

/// Default limit on the depth of the scope chain during evaluation.
/// Function application one level beyond this raises a stack overflow error.
pub const DEFAULT_RECURSION_LIMIT: usize = 512;

/// Default limit on the number of values held on the data stack.
/// Pushes beyond this raise a deque overflow error.
pub const DEFAULT_STACK_LIMIT: usize = 512;

/// Categorizes the different kinds of host-level parsing failures.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// A closing `)`, `;`, `]`, or `}` with no matching open collection
    UnbalancedGrouping,
    /// Input ended while a collection was still open
    Incomplete,
}

/// A structured error describing where compilation failed.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Snippet of the token stream surrounding the failure (max 8 tokens)
    pub context: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create a ParseError with a context snippet rendered from the tokens
    /// around the failure position.
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        tokens: &[impl fmt::Display],
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 8;

        let context_start = error_offset.saturating_sub(MAX_CONTEXT / 2);

        let snippet: Vec<String> = tokens
            .iter()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .map(|t| t.to_string())
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...] ");
        }
        display_context.push_str(&snippet.join(" "));
        if context_start + snippet.len() < tokens.len() {
            display_context.push_str(" [...]");
        }

        ParseError {
            kind,
            message: message.into(),
            context: Some(display_context),
        }
    }
}

/// Host-level error types for the interpreter front end
#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::Io(e) => write!(f, "IoError: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub mod boolean;
pub mod compiler;
pub mod evaluator;
pub mod format;
pub mod function;
pub mod number;
pub mod object;
pub mod opcode;
pub mod tokenizer;
pub mod value;

/// Tokenize, compile, and evaluate a source string with default settings,
/// returning the final data stack as a list value.
pub fn run_source(source: &str) -> Result<value::Value, Error> {
    let tokens = tokenizer::tokenize(source);
    let code = compiler::compile(&tokens)?;
    Ok(evaluator::Evaluator::new().eval(code))
}
