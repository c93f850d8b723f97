//! Token sequence -> postfix code tree.
//!
//! The compiler maintains a stack of open collections. Literal and word
//! tokens append to the innermost collection; a closing token pops it and
//! reshapes the collected terms, draining them lead-first:
//!
//! - a `func` marker takes the two previously reshaped terms as the
//!   parameter list and body and replaces them with a function value
//! - a prefix-range operator wraps the term that followed it so the
//!   operator evaluates first and pulls its operand from the code stack
//! - an infix-range operator `A op B` rewrites to the postfix `A B op'`
//!   through the fixed infix-to-postfix table
//!
//! `)`, `;`, and `]` decide whether the closed collection is an expression
//! or a list; `}` reshapes and then materializes an object from the
//! key-value pairs. The reshaped result reads in evaluation order, so the
//! evaluator only ever pulls a frame's lead.

use tracing::trace;

use crate::boolean::Boolean;
use crate::format::FormatSpec;
use crate::function::Function;
use crate::number::Number;
use crate::object::Object;
use crate::opcode::OpCode;
use crate::tokenizer::Token;
use crate::value::Value;
use crate::{ParseError, ParseErrorKind};

/// Which closer ended a collection.
enum Closer {
    Expression,
    List,
    Map,
}

/// Compile a token sequence into a single postfix expression value.
///
/// The tokenizer's implicit wrapping guarantees one top-level collection;
/// unbalanced grouping below that surfaces as a parse error with a token
/// context window.
pub fn compile(tokens: &[Token]) -> Result<Value, ParseError> {
    let mut stack: Vec<Vec<Value>> = vec![Vec::new()];

    for (offset, token) in tokens.iter().enumerate() {
        match token {
            Token::Open => stack.push(Vec::new()),
            Token::ListOpen => stack.push(Vec::new()),
            Token::MapOpen => {
                // The marker survives reshaping and flags the collection as
                // an object literal.
                stack.push(vec![Value::from(OpCode::MapMarker)]);
            }

            Token::Close => close_collection(&mut stack, Closer::Expression, tokens, offset)?,
            Token::ListClose => close_collection(&mut stack, Closer::List, tokens, offset)?,
            Token::MapClose => close_collection(&mut stack, Closer::Map, tokens, offset)?,

            Token::Number(body) => place_term(
                &mut stack,
                Value::Number(Number::from_literal(body)),
            ),
            Token::Text(body) => place_term(&mut stack, Value::text(body.clone())),
            // The value model has no regex kind; regex literals carry their
            // pattern as text.
            Token::Regex(body) => place_term(&mut stack, Value::text(body.clone())),
            Token::Format(body) => place_term(&mut stack, Value::Format(FormatSpec::parse(body))),

            Token::Word(word) => {
                if let Some(term) = classify_word(word) {
                    place_term(&mut stack, term);
                }
            }
        }
    }

    if stack.len() > 1 {
        return Err(ParseError::with_context(
            ParseErrorKind::Incomplete,
            format!("{} unclosed collection(s) at end of input", stack.len() - 1),
            tokens,
            tokens.len().saturating_sub(1),
        ));
    }

    let mut root = stack.pop().unwrap_or_default();
    let program = root.pop().unwrap_or(Value::Expression(Vec::new()));
    trace!(program = %program, "compiled");
    Ok(program)
}

/// Append a term to the innermost open collection.
fn place_term(stack: &mut [Vec<Value>], term: Value) {
    if let Some(open) = stack.last_mut() {
        open.push(term);
    }
}

/// Classify a bare word: operator table first, then the boolean words,
/// everything else a symbol.
fn classify_word(word: &str) -> Option<Value> {
    if let Some(op) = OpCode::from_name(word) {
        return Some(Value::from(op));
    }

    let lower = word.to_lowercase();

    if matches!(
        lower.as_str(),
        "true" | "false" | "1" | "0" | "undef" | "undefined"
    ) {
        return Some(Value::Boolean(Boolean::from_word(&lower)));
    }

    if lower == "nothing" || lower == "none" {
        return None;
    }

    Some(Value::symbol(word))
}

/// Pop the innermost collection, reshape it, and place the result (or the
/// materialized object) on the enclosing collection.
fn close_collection(
    stack: &mut Vec<Vec<Value>>,
    closer: Closer,
    tokens: &[Token],
    offset: usize,
) -> Result<(), ParseError> {
    if stack.len() < 2 {
        return Err(ParseError::with_context(
            ParseErrorKind::UnbalancedGrouping,
            "closing token with no open collection",
            tokens,
            offset,
        ));
    }

    let mut terms = stack.pop().unwrap_or_default();
    let mut exp: Vec<Value> = Vec::new();

    while let Some(term) = terms.pop() {
        let op = term.op_code();

        if op == OpCode::Func {
            // The two terms already reshaped are (params, body).
            let params = exp.pop().unwrap_or(Value::Nothing);
            let body = exp.pop().unwrap_or(Value::Nothing);
            exp.push(Value::Function(Function::new(
                coerce_expression(params),
                coerce_expression(body),
            )));
        } else if op.is_prefix_unary() {
            // The operator evaluates before its operand and pulls it from
            // the code stack.
            let operand = exp.pop();
            let mut wrapped = Vec::new();
            if let Some(operand) = operand {
                wrapped.push(operand);
            }
            wrapped.push(term);
            exp.push(Value::Expression(wrapped));
        } else if op.is_infix_binary() {
            let left = exp.pop();
            if let Some(postfix) = op.postfix_form() {
                exp.push(Value::from(postfix));
            }
            if let Some(left) = left {
                exp.push(left);
            }
        } else {
            exp.push(term);
        }
    }

    let closed = match closer {
        Closer::Expression => Value::Expression(exp),
        Closer::List => Value::List(exp),
        Closer::Map => {
            let mut pairs = Vec::new();
            while let Some(term) = exp.pop() {
                if term.op_code() == OpCode::MapMarker {
                    continue;
                }
                let value = exp.pop().unwrap_or(Value::Nothing);
                pairs.push((term, value));
            }
            Value::Object(Object::from_pairs(pairs))
        }
    };

    place_term(stack, closed);
    Ok(())
}

/// Function parameters and bodies are always expressions; a stray scalar
/// wraps into a one-element expression.
fn coerce_expression(v: Value) -> Value {
    match v {
        Value::Expression(_) => v,
        Value::Nothing => Value::Expression(Vec::new()),
        other => Value::Expression(vec![other]),
    }
}
