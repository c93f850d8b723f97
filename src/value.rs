//! The polymorphic runtime value.
//!
//! Every datum the interpreter touches is a [`Value`]: one tagged variant
//! over a closed kind set, each kind answering the same operation
//! vocabulary. Operations are total - a kind that cannot support an
//! operation returns [`Value::Nothing`], an error value, or an unordered
//! comparison instead of failing. Values copy deeply and carry no identity;
//! equality is structural through the partial order, which makes `nothing`
//! (like NaN) never equal to itself.
//!
//! Arithmetic and logic are exposed through the standard operator traits
//! (`+`, `-`, `*`, `/`, `%`, unary `-`, `&`, `|`, `^`) on value references,
//! mirroring how the evaluator's binary operator group consumes them.

use std::cmp::Ordering;
use std::fmt;
use std::ops;

use crate::boolean::Boolean;
use crate::format::FormatSpec;
use crate::function::Function;
use crate::number::Number;
use crate::object::Object;
use crate::opcode::OpCode;

/// The universal runtime object. Exactly one kind is active.
#[derive(Debug, Clone)]
pub enum Value {
    /// Singleton absence: falsy, unordered against anything, size 0
    Nothing,
    /// Fuzzy truth value
    Boolean(Boolean),
    /// Complex-valued number
    Number(Number),
    /// Immutable string
    Text(String),
    /// Named identifier, resolved through the scope chain at evaluation time
    Symbol(String),
    /// Tagged operator selector
    OpCall(OpCode),
    /// Error message travelling as data
    Error(String),
    /// Ordered value sequence used as code; the logical top is last-pushed
    Expression(Vec<Value>),
    /// Ordered value sequence reified as data
    List(Vec<Value>),
    /// Rendered-string-keyed mapping with a type slot
    Object(Object),
    /// Parameters, body, and captured scope
    Function(Function),
    /// Parsed formatting directives
    Format(FormatSpec),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    pub fn symbol(s: impl Into<String>) -> Value {
        Value::Symbol(s.into())
    }

    pub fn error(msg: impl Into<String>) -> Value {
        Value::Error(msg.into())
    }

    pub fn expression(items: Vec<Value>) -> Value {
        Value::Expression(items)
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(items)
    }

    /// The kind name, as surfaced by the `type` operator. Objects answer
    /// with their type slot.
    pub fn kind(&self) -> String {
        match self {
            Value::Nothing => "nothing".to_owned(),
            Value::Boolean(_) => "boolean".to_owned(),
            Value::Number(_) => "number".to_owned(),
            Value::Text(_) => "text".to_owned(),
            Value::Symbol(_) => "symbol".to_owned(),
            Value::OpCall(_) => "op_call".to_owned(),
            Value::Error(_) => "error".to_owned(),
            Value::Expression(_) => "expression".to_owned(),
            Value::List(_) => "list".to_owned(),
            Value::Object(o) => o.type_name().to_owned(),
            Value::Function(_) => "function".to_owned(),
            Value::Format(_) => "format".to_owned(),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    pub fn is_something(&self) -> bool {
        !self.is_nothing()
    }

    /// The boolean sense of the value.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Boolean(b) => b.is_truthy(),
            Value::Number(n) => n.is_truthy(),
            Value::Text(s) => !s.is_empty(),
            Value::Symbol(s) => !s.is_empty(),
            Value::OpCall(op) => *op != OpCode::Nothing,
            Value::Error(msg) => !msg.is_empty(),
            Value::Expression(items) | Value::List(items) => !items.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Function(f) => f.is_truthy(),
            Value::Format(f) => !f.is_empty(),
        }
    }

    /// Kind-specific size: element counts for collections, char count for
    /// text, the opcode index for op-calls, 0 otherwise.
    pub fn size(&self) -> usize {
        match self {
            Value::Text(s) => s.chars().count(),
            Value::Expression(items) | Value::List(items) => items.len(),
            Value::Object(o) => o.len(),
            Value::OpCall(op) => *op as usize,
            _ => 0,
        }
    }

    /// Kind-specific integer view.
    pub fn integer_view(&self) -> i64 {
        match self {
            Value::Number(n) => n.integer_view(),
            Value::Boolean(b) => b.is_truthy() as i64,
            Value::OpCall(op) => *op as i64,
            _ => 0,
        }
    }

    /// The embedded opcode of an op-call value; the nothing opcode for
    /// every other kind.
    pub fn op_code(&self) -> OpCode {
        match self {
            Value::OpCall(op) => *op,
            _ => OpCode::Nothing,
        }
    }

    /// Structural partial ordering. Distinct kinds - and kinds without an
    /// order, including `nothing` against anything - are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.compare(b),
            (Value::Number(a), Value::Number(b)) => a.compare(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Symbol(a), Value::Symbol(b)) => Some(a.cmp(b)),
            (Value::OpCall(a), Value::OpCall(b)) => Some(a.cmp(b)),
            (Value::Format(a), Value::Format(b)) => a.compare(b),
            (Value::Expression(a), Value::Expression(b)) | (Value::List(a), Value::List(b)) => {
                if a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y) {
                    Some(Ordering::Equal)
                } else {
                    None
                }
            }
            (Value::Object(a), Value::Object(b)) => (a == b).then_some(Ordering::Equal),
            (Value::Function(a), Value::Function(b)) => {
                a.same_shape(b).then_some(Ordering::Equal)
            }
            _ => None,
        }
    }

    /// Raise to the power of.
    pub fn pow(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.pow(b)),
            _ => Value::Nothing,
        }
    }

    /// Reduce to the root of.
    pub fn root(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.root(b)),
            _ => Value::Nothing,
        }
    }

    /// Floor division on the real parts.
    pub fn floor_div(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.floor_div(b)),
            _ => Value::Nothing,
        }
    }

    /// Fractional remainder of the quotient.
    pub fn fractional(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.remainder(b)),
            _ => Value::Nothing,
        }
    }

    pub fn real(&self) -> Value {
        match self {
            Value::Number(n) => Value::Number(n.real()),
            _ => Value::Nothing,
        }
    }

    pub fn imag(&self) -> Value {
        match self {
            Value::Number(n) => Value::Number(n.imag()),
            _ => Value::Nothing,
        }
    }

    /// Absolute value: complex modulus for numbers, length for text,
    /// parameter count for functions.
    pub fn abs(&self) -> Value {
        match self {
            Value::Number(n) => Value::Number(n.abs()),
            Value::Text(s) => Value::from(s.chars().count() as i64),
            Value::Function(f) => Value::from(f.arity() as i64),
            _ => Value::Nothing,
        }
    }

    /// Peek the logical top of a sequence, or the first character of text.
    pub fn lead(&self) -> Value {
        match self {
            Value::Expression(items) | Value::List(items) => {
                items.last().cloned().unwrap_or(Value::Nothing)
            }
            Value::Text(s) => s
                .chars()
                .next()
                .map(|c| Value::Text(c.to_string()))
                .unwrap_or(Value::Nothing),
            _ => Value::Nothing,
        }
    }

    /// Place a value as the new logical top. Pushing nothing is a no-op;
    /// pushing text onto text prepends it.
    pub fn push(&self, item: Value) -> Value {
        if item.is_nothing() {
            return self.clone();
        }

        match self {
            Value::Expression(items) => {
                let mut items = items.clone();
                items.push(item);
                Value::Expression(items)
            }
            Value::List(items) => {
                let mut items = items.clone();
                items.push(item);
                Value::List(items)
            }
            Value::Text(s) => match item {
                Value::Text(front) => Value::Text(format!("{front}{s}")),
                _ => Value::Nothing,
            },
            _ => Value::Nothing,
        }
    }

    /// Remove the logical top, returning the remainder. Empty sequences are
    /// unchanged.
    pub fn drop_lead(&self) -> Value {
        match self {
            Value::Expression(items) => {
                let mut items = items.clone();
                items.pop();
                Value::Expression(items)
            }
            Value::List(items) => {
                let mut items = items.clone();
                items.pop();
                Value::List(items)
            }
            Value::Text(s) => {
                let mut chars = s.chars();
                chars.next();
                Value::Text(chars.as_str().to_owned())
            }
            _ => Value::Nothing,
        }
    }

    /// Lead and drop packaged as a pair.
    pub fn shift(&self) -> (Value, Value) {
        (self.lead(), self.drop_lead())
    }

    /// Reverse the element order of a sequence or the characters of text.
    pub fn reversed(&self) -> Value {
        match self {
            Value::Expression(items) => {
                Value::Expression(items.iter().rev().cloned().collect())
            }
            Value::List(items) => Value::List(items.iter().rev().cloned().collect()),
            Value::Text(s) => Value::Text(s.chars().rev().collect()),
            _ => Value::Nothing,
        }
    }

    /// Storage-order elements of a sequence (bottom first, lead last).
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Expression(items) | Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_elements(self) -> Option<Vec<Value>> {
        match self {
            Value::Expression(items) | Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Index read. Objects read by rendered key; sequences and text read by
    /// zero-based position from the lead.
    pub fn get(&self, key: &Value) -> Value {
        match self {
            Value::Object(o) => o
                .get(key)
                .unwrap_or_else(|| invalid_index(key)),
            Value::Expression(items) | Value::List(items) => match position_key(key) {
                Some(i) => items
                    .len()
                    .checked_sub(i + 1)
                    .and_then(|slot| items.get(slot))
                    .cloned()
                    .unwrap_or(Value::Nothing),
                None => invalid_index(key),
            },
            Value::Text(s) => match position_key(key) {
                Some(i) => s
                    .chars()
                    .nth(i)
                    .map(|c| Value::Text(c.to_string()))
                    .unwrap_or(Value::Nothing),
                None => invalid_index(key),
            },
            _ => Value::Nothing,
        }
    }

    /// Index write, producing a new object.
    pub fn set(&self, key: &Value, value: Value) -> Value {
        match self {
            Value::Object(o) => {
                let mut o = o.clone();
                if o.set(key, value) {
                    Value::Object(o)
                } else {
                    invalid_index(key)
                }
            }
            _ => Value::Nothing,
        }
    }

    /// Index delete, producing a new object.
    pub fn del(&self, key: &Value) -> Value {
        match self {
            Value::Object(o) => {
                let mut o = o.clone();
                if o.del(key) {
                    Value::Object(o)
                } else {
                    invalid_index(key)
                }
            }
            _ => Value::Nothing,
        }
    }

    /// Index membership test.
    pub fn has(&self, key: &Value) -> Value {
        let present = match self {
            Value::Object(o) => o.has(key),
            Value::Expression(items) | Value::List(items) => {
                position_key(key).is_some_and(|i| i < items.len())
            }
            Value::Text(s) => position_key(key).is_some_and(|i| i < s.chars().count()),
            _ => false,
        };

        Value::Boolean(Boolean::from(present))
    }

    /// String rendering with formatting arguments.
    pub fn render(&self, fmt: &FormatSpec) -> String {
        match self {
            Value::Nothing => "nothing".to_owned(),
            Value::Boolean(b) => fmt.pad(b.render(fmt.numeric_bools), '<'),
            Value::Number(n) => n.render(fmt),
            Value::Text(s) => {
                let body = if fmt.is_repr() {
                    quote_text(s)
                } else {
                    s.clone()
                };
                fmt.pad(fmt.clip(body), '<')
            }
            Value::Symbol(s) => s.clone(),
            Value::OpCall(op) => op.surface_name().to_owned(),
            Value::Error(msg) => msg.clone(),
            Value::Expression(items) => render_sequence(items, fmt, "(", ")"),
            Value::List(items) => render_sequence(items, fmt, "[", "]"),
            Value::Object(o) => {
                if o.is_empty() {
                    return "{}".to_owned();
                }
                let body: Vec<String> = o
                    .iter()
                    .map(|(k, v)| format!("{k} = {}", v.render(fmt)))
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
            Value::Function(f) => {
                if !f.is_truthy() {
                    return "func():;".to_owned();
                }
                let params = f.params().render(fmt);
                let mut body = f.body().render(fmt);
                if body.starts_with('(') && body.ends_with(')') {
                    body.replace_range(..1, ":");
                    body.replace_range(body.len() - 1.., ";");
                }
                format!("func{params}{body}")
            }
            Value::Format(f) => format!("`{}`", f.source()),
        }
    }

    /// Rendering with default formatting arguments.
    pub fn render_default(&self) -> String {
        self.render(&FormatSpec::default())
    }
}

/// Sequences render lead-first, so code reads in evaluation order.
fn render_sequence(items: &[Value], fmt: &FormatSpec, open: &str, close: &str) -> String {
    let body: Vec<String> = items.iter().rev().map(|v| v.render(fmt)).collect();
    format!("{open}{}{close}", body.join(", "))
}

fn quote_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn invalid_index(key: &Value) -> Value {
    Value::error(format!(
        "Invalid index - {} - provided!",
        key.render_default()
    ))
}

/// Numeric index shapes: a non-negative real number, or a one-element
/// sequence holding one.
fn position_key(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) => {
            if n.is_nan() || n.is_complex() || n.real_part() < 0.0 {
                None
            } else {
                Some(n.real_part() as usize)
            }
        }
        Value::Expression(items) | Value::List(items) if items.len() == 1 => {
            position_key(&items[0])
        }
        _ => None,
    }
}

/// Strip redundant singleton nesting from an expression: `((x))` becomes
/// `(x)`, stopping at the first non-expression payload.
pub fn unwrap_expression(mut exp: Value) -> Value {
    while matches!(&exp, Value::Expression(items) if items.len() == 1) {
        let inner = exp.lead();
        if !matches!(inner, Value::Expression(_)) {
            return Value::Expression(vec![inner]);
        }
        exp = inner;
    }
    exp
}

/// A two-branch expression whose lead is `a`, used by the conditional
/// operators to carry (consequent, alternative) pairs.
pub fn make_pair(a: Value, b: Value) -> Value {
    Value::Expression(vec![b, a])
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_default())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Boolean(Boolean::from(x))
    }
}

impl From<Boolean> for Value {
    fn from(b: Boolean) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Number(Number::from(x))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::from(x))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<OpCode> for Value {
    fn from(op: OpCode) -> Self {
        Value::OpCall(op)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<FormatSpec> for Value {
    fn from(f: FormatSpec) -> Self {
        Value::Format(f)
    }
}

// Arithmetic and logic through the standard operator traits, all total.

impl<'a, 'b> ops::Add<&'b Value> for &'a Value {
    type Output = Value;

    /// Addition for numbers; concatenation for like sequences, with the
    /// left operand's elements becoming the lead side.
    fn add(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.add(b)),
            (Value::Expression(a), Value::Expression(b)) => {
                let mut items = b.clone();
                items.extend(a.iter().cloned());
                Value::Expression(items)
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = b.clone();
                items.extend(a.iter().cloned());
                Value::List(items)
            }
            _ => Value::Nothing,
        }
    }
}

impl<'a, 'b> ops::Sub<&'b Value> for &'a Value {
    type Output = Value;

    fn sub(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.sub(b)),
            _ => Value::Nothing,
        }
    }
}

impl<'a, 'b> ops::Mul<&'b Value> for &'a Value {
    type Output = Value;

    fn mul(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.mul(b)),
            _ => Value::Nothing,
        }
    }
}

impl<'a, 'b> ops::Div<&'b Value> for &'a Value {
    type Output = Value;

    fn div(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.div(b)),
            _ => Value::Nothing,
        }
    }
}

impl<'a, 'b> ops::Rem<&'b Value> for &'a Value {
    type Output = Value;

    fn rem(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.modulo(b)),
            _ => Value::Nothing,
        }
    }
}

impl<'a> ops::Neg for &'a Value {
    type Output = Value;

    /// Negation for numbers and booleans; the identity for other kinds.
    fn neg(self) -> Value {
        match self {
            Value::Number(n) => Value::Number(n.negate()),
            Value::Boolean(b) => Value::Boolean(b.negate()),
            other => other.clone(),
        }
    }
}

impl<'a, 'b> ops::BitAnd<&'b Value> for &'a Value {
    type Output = Value;

    fn bitand(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(a.and(b)),
            _ => Value::Nothing,
        }
    }
}

impl<'a, 'b> ops::BitOr<&'b Value> for &'a Value {
    type Output = Value;

    fn bitor(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(a.or(b)),
            _ => Value::Nothing,
        }
    }
}

impl<'a, 'b> ops::BitXor<&'b Value> for &'a Value {
    type Output = Value;

    fn bitxor(self, other: &'b Value) -> Value {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(a.xor(b)),
            _ => Value::Nothing,
        }
    }
}
