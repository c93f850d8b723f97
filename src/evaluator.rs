//! The stack evaluator.
//!
//! Execution is iterative over two explicit stacks. The code stack holds
//! frames of work to do; the next term of a frame is its logical lead.
//! The data stack (the deque) holds computed values and is itself
//! addressable as a value through the `deque` opcode sentinel. A vector of
//! name maps forms the lexical scope chain, innermost last; function
//! application pushes a scope and arranges its own teardown by planting an
//! `end_scope` sentinel in the code ahead of the body.
//!
//! Faults never abort the loop. A fault queues an error value together
//! with `emit`/`endl` so it surfaces on the output sink, and evaluation
//! carries on; when exceptions are enabled (`no_exceptions` off), emitting
//! an error value additionally asks the input sink whether to continue,
//! and anything but yes clears the code stack.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use tracing::{debug, trace};

use crate::compiler;
use crate::format::FormatSpec;
use crate::function::Function;
use crate::opcode::OpCode;
use crate::tokenizer;
use crate::value::{Value, make_pair, unwrap_expression};
use crate::{DEFAULT_RECURSION_LIMIT, DEFAULT_STACK_LIMIT};

type Scope = HashMap<String, Value>;

/// The Oliver interpreter runtime: a single-threaded stack interpreter
/// evaluating one postfix code expression.
pub struct Evaluator {
    scopes: Vec<Scope>,
    deque: VecDeque<Value>,
    code: Vec<Vec<Value>>,
    no_exceptions: bool,
    recursion_limit: usize,
    stack_limit: usize,
    fmt: FormatSpec,
    out: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            scopes: Vec::new(),
            deque: VecDeque::new(),
            code: Vec::new(),
            no_exceptions: true,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            stack_limit: DEFAULT_STACK_LIMIT,
            fmt: FormatSpec::default(),
            out: Box::new(io::stdout()),
            input: Box::new(io::BufReader::new(io::stdin())),
        }
    }

    /// Replace the output and input sinks.
    pub fn with_io(mut self, out: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        self.out = out;
        self.input = input;
        self
    }

    /// Override the scope-chain and data-stack limits.
    pub fn with_limits(mut self, recursion_limit: usize, stack_limit: usize) -> Self {
        self.recursion_limit = recursion_limit;
        self.stack_limit = stack_limit;
        self
    }

    /// Enable or disable the continue-prompt on emitted errors. On (the
    /// default) means errors surface and evaluation continues.
    pub fn with_no_exceptions(mut self, flag: bool) -> Self {
        self.no_exceptions = flag;
        self
    }

    /// Evaluate a compiled code expression to completion and return the
    /// final data stack as a list.
    pub fn eval(&mut self, exp: Value) -> Value {
        if !matches!(exp, Value::Expression(_)) {
            return Value::Nothing;
        }

        let exp = unwrap_expression(exp);

        if let Some(items) = exp.into_elements() {
            self.code.push(items);
        }

        self.define_enclosure();
        self.run();

        self.result_deque()
    }

    /// Snapshot of the data stack as a list, oldest value at the lead.
    fn result_deque(&self) -> Value {
        Value::List(self.deque.iter().rev().cloned().collect())
    }

    fn define_enclosure(&mut self) {
        trace!(depth = self.scopes.len() + 1, "scope push");
        self.scopes.push(Scope::new());
    }

    fn delete_enclosure(&mut self) {
        trace!(depth = self.scopes.len(), "scope pop");
        self.scopes.pop();
    }

    /// Queue an error value for emission. Errors are data: the message
    /// travels through the stacks like any other value.
    fn raise(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(error = %message, "evaluation fault");
        self.push_code_term(Value::from(OpCode::Endl));
        self.push_code_term(Value::from(OpCode::Emit));
        self.push_code_term(Value::error(message));
    }

    /// Append a term to the innermost code frame, making it the next term
    /// to execute.
    fn push_code_term(&mut self, term: Value) {
        if term.is_nothing() {
            return;
        }

        if self.code.is_empty() {
            self.code.push(Vec::new());
        }

        if let Some(frame) = self.code.last_mut() {
            frame.push(term);
        }
    }

    /// Pull the next term out of the code, discarding drained frames.
    fn fetch_operand(&mut self) -> Value {
        let term = match self.code.last_mut() {
            Some(frame) => frame.pop().unwrap_or(Value::Nothing),
            None => Value::Nothing,
        };

        while self.code.last().is_some_and(|frame| frame.is_empty()) {
            self.code.pop();
        }

        term
    }

    /// Push a computed value. Nothing-valued results vanish; pushes past
    /// the stack limit fault. Error values bypass the limit so a fault on
    /// a full stack can still surface instead of re-faulting forever.
    fn push_data(&mut self, value: Value) {
        if value.is_nothing() {
            return;
        }

        if self.deque.len() >= self.stack_limit && !matches!(value, Value::Error(_)) {
            self.raise("deque_overflow");
            return;
        }

        self.deque.push_back(value);
    }

    fn pop_data(&mut self) -> Value {
        match self.deque.pop_back() {
            Some(value) => value,
            None => {
                self.raise("deque_underflow");
                Value::Nothing
            }
        }
    }

    /// Resolve a symbol through the scope chain, innermost first.
    fn get_symbol(&mut self, symbol: &Value) -> Value {
        let name = symbol.render_default();

        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(&name) {
                return value.clone();
            }
        }

        self.raise(format!("{name} = undef_var"));
        Value::Nothing
    }

    fn set_symbol(&mut self, name: &Value, value: Value) {
        if self.scopes.is_empty() {
            self.define_enclosure();
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.render_default(), value);
        }
    }

    fn resolve(&mut self, mut term: Value) -> Value {
        while matches!(term, Value::Symbol(_)) {
            term = self.get_symbol(&term);
        }
        term
    }

    /// The evaluation loop: fetch, resolve, dispatch, until the code stack
    /// drains.
    fn run(&mut self) {
        while !self.code.is_empty() {
            let term = self.fetch_operand();
            let term = self.resolve(term);

            trace!(term = %term, "dispatch");

            match term {
                Value::Expression(_) => {
                    // Expressions re-enter the code as a fresh frame so
                    // their elements execute in order.
                    let exp = unwrap_expression(term);
                    if let Some(items) = exp.into_elements() {
                        if !items.is_empty() {
                            self.code.push(items);
                        }
                    }
                }

                Value::Function(f) => self.apply_function(f),

                Value::OpCall(op) if op.is_runtime() => self.dispatch(op),
                Value::OpCall(_) => {}

                other => self.push_data(other),
            }

            while self.code.last().is_some_and(|frame| frame.is_empty()) {
                self.code.pop();
            }
        }
    }

    /// Instantiate a call frame: bind each formal to the next code term,
    /// push the captured scope, and plant the teardown sentinel ahead of
    /// the body.
    fn apply_function(&mut self, func: Function) {
        let mut enclosure = func.scope().clone();

        let mut formals: Vec<Value> = func
            .params()
            .elements()
            .map(|items| items.to_vec())
            .unwrap_or_default();

        while let Some(name) = formals.pop() {
            let mut value = self.fetch_operand();

            if value.op_code() == OpCode::Deque {
                value = self.result_deque();
            }

            value = self.resolve(value);

            if matches!(name, Value::Symbol(_)) {
                enclosure.insert(name.render_default(), value);
            } else {
                self.raise(format!(
                    "Invalid function symbol defined: {}",
                    name.render_default()
                ));
            }
        }

        if self.scopes.len() >= self.recursion_limit {
            self.raise("stack_overflow");
            return;
        }

        debug!(depth = self.scopes.len() + 1, "function call");
        self.scopes.push(enclosure);
        self.push_code_term(Value::from(OpCode::EndScope));
        self.push_code_term(func.body().clone());
    }

    /// Opcode-range dispatch to the operator groups.
    fn dispatch(&mut self, op: OpCode) {
        if op < OpCode::FundamentalOperatorsEnd {
            self.fundamental_operators(op);
        } else if op < OpCode::SequentialOperatorsEnd {
            self.sequence_operators(op);
        } else if op < OpCode::IndexOperatorsEnd {
            self.index_operators(op);
        } else if op < OpCode::BinaryOperatorsEnd {
            self.binary_operators(op);
        } else if op < OpCode::AlgorithmOperatorsEnd {
            self.algorithm_operators(op);
        }
    }

    fn fundamental_operators(&mut self, op: OpCode) {
        match op {
            // Place the next code term on the data stack unevaluated.
            OpCode::Idnt => {
                let term = self.fetch_operand();
                self.push_data(term);
            }

            // Negate the next code term. Functions specialize instead:
            // binding the current scope negates their free variables.
            OpCode::Neg => {
                let term = self.fetch_operand();
                let mut term = self.resolve(term);

                if let Value::Function(ref mut f) = term {
                    if let Some(scope) = self.scopes.last() {
                        f.bind_scope(scope);
                    }
                }

                self.push_data(-&term);
            }

            OpCode::Deque => {
                let snapshot = self.result_deque();
                self.push_data(snapshot);
            }

            OpCode::Emit => self.emit(),

            OpCode::Endl => {
                let _ = writeln!(self.out);
            }

            // Read a line, run it through the front end, and queue the
            // resulting code.
            OpCode::Input => {
                let mut line = String::new();
                if self.input.read_line(&mut line).is_err() {
                    self.raise("input unavailable");
                    return;
                }

                match compiler::compile(&tokenizer::tokenize(line.trim_end())) {
                    Ok(code) => self.push_code_term(code),
                    Err(e) => self.raise(e.message),
                }
            }

            OpCode::Assign => self.assign(),
            OpCode::Let => self.let_binding(),
            OpCode::Def => self.define_function(),

            OpCode::IsDef => {
                let value = self.pop_data();
                let defined = if value.op_code() == OpCode::Deque {
                    !self.deque.is_empty()
                } else {
                    value.is_something()
                };
                self.push_data(Value::from(defined));
            }

            OpCode::Bool => {
                let value = self.pop_data();
                let truthy = if value.op_code() == OpCode::Deque {
                    !self.deque.is_empty()
                } else {
                    value.is_truthy()
                };
                self.push_data(Value::from(truthy));
            }

            OpCode::Size => {
                let value = self.pop_data();
                self.push_data(Value::from(value.size() as i64));
            }

            OpCode::Type => {
                let value = self.pop_data();
                self.push_data(Value::text(value.kind()));
            }

            // Infix implication: the antecedent is on the data stack, the
            // branch pair is the next code term.
            OpCode::ImplyInfix => {
                let p = self.pop_data();
                let q = self.fetch_operand();
                let branch = if p.is_truthy() {
                    q.lead()
                } else {
                    q.drop_lead().lead()
                };
                self.push_code_term(branch);
            }

            // Postfix implication: both operands on the data stack.
            OpCode::Imply => {
                let q = self.pop_data();
                let p = self.pop_data();
                let branch = if p.is_truthy() {
                    q.lead()
                } else {
                    q.drop_lead().lead()
                };
                self.push_code_term(branch);
            }

            OpCode::If => self.fold_conditional(),

            OpCode::EndScope => self.delete_enclosure(),

            OpCode::Shebang => {
                let tag = self.fetch_operand();
                let value = self.fetch_operand();
                let equals = self.fetch_operand();

                if equals.op_code() == OpCode::Eq && tag.op_code() == OpCode::NoExcept {
                    self.no_exceptions =
                        matches!(value, Value::Boolean(_)) && value.is_truthy();
                    debug!(no_exceptions = self.no_exceptions, "shebang configuration");
                }
            }

            OpCode::BoolAlpha => self.fmt.numeric_bools = false,
            OpCode::BoolNumeric => self.fmt.numeric_bools = true,

            _ => {}
        }
    }

    /// Render and write the top of the data stack. A format value on top
    /// applies to the value beneath it. Emitting an error value consults
    /// the continue-prompt when exceptions are enabled.
    fn emit(&mut self) {
        let (value, fmt) = match self.pop_data() {
            Value::Format(mut spec) => {
                spec.numeric_bools = self.fmt.numeric_bools;
                (self.pop_data(), spec)
            }
            other => (other, self.fmt.clone()),
        };

        if let Value::Error(message) = &value {
            let _ = write!(self.out, "{message}");

            if !self.no_exceptions {
                let _ = write!(self.out, "!\nContinue runtime? ");
                let _ = self.out.flush();

                let mut answer = String::new();
                let _ = self.input.read_line(&mut answer);
                let answer = answer.trim().to_lowercase();

                if answer != "y" && answer != "yes" {
                    debug!("runtime halted at error emission");
                    self.code.clear();
                }
            }
            return;
        }

        let _ = write!(self.out, "{}", value.render(&fmt));
    }

    /// Pop a value and a target; bind symbols in the innermost scope, or
    /// reset the data stack when the target is the deque sentinel.
    fn assign(&mut self) {
        let value = self.pop_data();
        let target = self.pop_data();

        if matches!(target, Value::Symbol(_)) {
            self.set_symbol(&target, value);
            return;
        }

        if target.op_code() == OpCode::Deque {
            self.deque.clear();

            match value {
                Value::Expression(items) | Value::List(items) => {
                    // Lead-first, so a deque snapshot restores in push
                    // order.
                    for item in items.into_iter().rev() {
                        self.deque.push_back(item);
                    }
                }
                other => self.deque.push_back(other),
            }
            return;
        }

        self.raise(format!(
            "Miss handled assignment: {} = {}",
            value.render_default(),
            target.render_default()
        ));
    }

    /// The `let` rewriter. Equality binds; a function value becomes a
    /// `def`; an indexed target becomes a `set` call whose result rebinds
    /// the name.
    fn let_binding(&mut self) {
        let name = self.fetch_operand();

        if name.is_nothing() {
            self.raise("code_underflow");
            return;
        }

        let mut value = self.fetch_operand();
        let mut oper = self.fetch_operand();

        if oper.op_code() != OpCode::Eq {
            // let name index = value  ->  name index value set
            let index = value;
            value = oper;
            oper = self.fetch_operand();

            value = Value::Expression(vec![
                Value::from(OpCode::Set),
                value,
                index,
                name.clone(),
            ]);
        }

        if oper.op_code() != OpCode::Eq {
            return;
        }

        // Unary operators swallow their operand at compile time; pull it
        // back so the deferred assignment sees the full form.
        if value.op_code() == OpCode::Idnt {
            let operand = self.fetch_operand();
            value = Value::Expression(vec![operand, Value::from(OpCode::Idnt)]);
        } else if value.op_code() == OpCode::Neg {
            let operand = self.fetch_operand();
            value = Value::Expression(vec![operand, Value::from(OpCode::Neg)]);
        }

        if let Value::Function(f) = value {
            // Functions are not evaluated before assignment; they are
            // applied as if `def` had been called.
            self.push_code_term(f.body().clone());
            self.push_code_term(f.params().clone());
            self.push_code_term(name);
            self.push_code_term(Value::from(OpCode::Def));
            return;
        }

        self.push_code_term(Value::Expression(vec![
            Value::from(OpCode::Assign),
            value,
            name,
            Value::from(OpCode::Idnt),
        ]));
    }

    /// Build a function from `(name, args, body)`, capture the defining
    /// scope, self-bind for recursion, and defer to `assign`.
    fn define_function(&mut self) {
        let name = self.fetch_operand();

        if name.is_nothing() {
            self.raise("code_underflow");
            return;
        }

        let args = self.fetch_operand();
        let body = self.fetch_operand();

        let mut lam = Function::new(args, body);

        if self.scopes.len() > 1 {
            // Capture the local scope only; globals stay reachable
            // through the chain.
            if let Some(scope) = self.scopes.last() {
                lam.bind_scope(scope);
            }
        }

        let self_copy = Value::Function(lam.clone());
        lam.bind_variable(&name, self_copy);
        lam.bind_variable(&Value::text("self"), name.clone());

        self.push_data(name);
        self.push_data(Value::Function(lam));
        self.push_code_term(Value::from(OpCode::Assign));
    }

    /// Gather `(condition, consequent)` pairs from an `if`/`elif`/`else`
    /// chain and fold them into nested postfix implications.
    fn fold_conditional(&mut self) {
        let mut gathered: Vec<Value> = Vec::new();
        let mut oper = Value::Nothing;

        loop {
            let mut p = self.fetch_operand();
            let mut q = self.fetch_operand();

            if oper.op_code() == OpCode::Else {
                // The else arm has no condition; the second fetch
                // overshot, so put it back.
                self.push_code_term(q);
                q = p;
                p = Value::from(true);
            }

            gathered.push(q);
            gathered.push(p);

            oper = self.fetch_operand();

            if !matches!(oper.op_code(), OpCode::Elif | OpCode::Else) {
                self.push_code_term(oper);
                break;
            }
        }

        // Fold back-to-front so the first condition tests first and each
        // false branch falls through to the remainder of the chain.
        let mut statement = Value::Expression(Vec::new());

        while let Some(p) = gathered.pop() {
            let q = gathered.pop().unwrap_or(Value::Nothing);

            let mut items = vec![
                Value::from(OpCode::Imply),
                make_pair(q, statement),
                Value::from(OpCode::Idnt),
            ];
            if p.is_something() {
                items.push(p);
            }

            statement = Value::Expression(items);
        }

        self.push_code_term(statement);
    }

    fn sequence_operators(&mut self, op: OpCode) {
        match op {
            OpCode::Lead => {
                let x = self.pop_data();
                self.push_data(x.lead());
            }

            OpCode::Join => {
                let y = self.pop_data();
                let x = self.pop_data();
                self.push_data(y.push(x));
            }

            OpCode::Drop => {
                let x = self.pop_data();
                self.push_data(x.drop_lead());
            }

            // Like drop, but the remainder goes back to the code for
            // evaluation.
            OpCode::Next => {
                let x = self.pop_data();
                self.push_code_term(x.drop_lead());
            }

            OpCode::DequeLead => {
                let x = self.pop_data();
                if x.op_code() == OpCode::Deque {
                    let front = self.deque.front().cloned().unwrap_or(Value::Nothing);
                    self.push_data(front);
                }
            }

            OpCode::DequeLast => {
                let x = self.pop_data();
                if x.op_code() == OpCode::Deque {
                    let back = self.deque.back().cloned().unwrap_or(Value::Nothing);
                    self.push_data(back);
                }
            }

            OpCode::DequeJoin => {
                let x = self.pop_data();
                let y = self.pop_data();
                if x.op_code() == OpCode::Deque && y.is_something() {
                    self.deque.push_front(y);
                }
            }

            OpCode::DequePush => {
                let x = self.pop_data();
                let y = self.pop_data();
                if x.op_code() == OpCode::Deque && y.is_something() {
                    self.deque.push_back(y);
                }
            }

            OpCode::DequeDrop => {
                let x = self.pop_data();
                if x.op_code() == OpCode::Deque {
                    self.deque.pop_front();
                }
            }

            OpCode::DequeShift => {
                let x = self.pop_data();
                if x.op_code() == OpCode::Deque {
                    self.deque.pop_back();
                }
            }

            _ => {}
        }
    }

    fn index_operators(&mut self, op: OpCode) {
        match op {
            OpCode::Get => {
                let key = self.pop_data();
                let target = self.pop_data();
                self.push_data(target.get(&key));
            }

            OpCode::Set => {
                let value = self.pop_data();
                let key = self.pop_data();
                let target = self.pop_data();
                self.push_data(target.set(&key, value));
            }

            OpCode::Has => {
                let key = self.pop_data();
                let target = self.pop_data();
                self.push_data(target.has(&key));
            }

            OpCode::Del => {
                let key = self.pop_data();
                let target = self.pop_data();
                self.push_data(target.del(&key));
            }

            _ => {}
        }
    }

    fn binary_operators(&mut self, op: OpCode) {
        let y = self.pop_data();
        let x = self.pop_data();

        let result = match op {
            // Logical operators keep fuzzy weights between booleans and
            // fall back to crisp truthiness otherwise.
            OpCode::LogicalAnd => match (&x, &y) {
                (Value::Boolean(_), Value::Boolean(_)) => &x & &y,
                _ => Value::from(x.is_truthy() && y.is_truthy()),
            },
            OpCode::LogicalOr => match (&x, &y) {
                (Value::Boolean(_), Value::Boolean(_)) => &x | &y,
                _ => Value::from(x.is_truthy() || y.is_truthy()),
            },
            OpCode::LogicalXor => match (&x, &y) {
                (Value::Boolean(_), Value::Boolean(_)) => &x ^ &y,
                _ => Value::from(x.is_truthy() != y.is_truthy()),
            },

            OpCode::Eq => Value::from(x == y),
            OpCode::Ne => Value::from(x != y),
            OpCode::Gt => Value::from(x.compare(&y) == Some(std::cmp::Ordering::Greater)),
            OpCode::Ge => Value::from(matches!(
                x.compare(&y),
                Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
            )),
            OpCode::Lt => Value::from(x.compare(&y) == Some(std::cmp::Ordering::Less)),
            OpCode::Le => Value::from(matches!(
                x.compare(&y),
                Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
            )),

            OpCode::Add => &x + &y,
            OpCode::Sub => &x - &y,
            OpCode::Mul => &x * &y,
            OpCode::Div => &x / &y,
            OpCode::Mod => &x % &y,
            OpCode::Fdiv => x.floor_div(&y),
            OpCode::Rem => x.fractional(&y),
            OpCode::Exp => x.pow(&y),

            _ => Value::Nothing,
        };

        self.push_data(result);
    }

    fn algorithm_operators(&mut self, op: OpCode) {
        if op == OpCode::Rev {
            let x = self.pop_data();
            self.push_data(x.reversed());
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// A write sink the test can read back after the evaluator is done
    /// with its half.
    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    struct Harness {
        evaluator: Evaluator,
        sink: SharedSink,
    }

    fn harness_with(input: &str, configure: impl FnOnce(Evaluator) -> Evaluator) -> Harness {
        let sink = SharedSink::default();
        let evaluator = configure(Evaluator::new()).with_io(
            Box::new(sink.clone()),
            Box::new(Cursor::new(input.as_bytes().to_vec())),
        );
        Harness { evaluator, sink }
    }

    /// Evaluate a source string, returning the result deque and the
    /// output text.
    fn run_with(source: &str, input: &str, configure: impl FnOnce(Evaluator) -> Evaluator) -> (Value, String) {
        let mut h = harness_with(input, configure);
        let code = compiler::compile(&tokenizer::tokenize(source)).unwrap();
        let result = h.evaluator.eval(code);
        (result, h.sink.contents())
    }

    fn run(source: &str) -> (Value, String) {
        run_with(source, "", |e| e)
    }

    /// The top of the data stack: the most recently pushed value, which
    /// the snapshot stores first.
    fn top(result: &Value) -> Value {
        result
            .elements()
            .and_then(|items| items.first())
            .cloned()
            .unwrap_or(Value::Nothing)
    }

    fn num(x: i64) -> Value {
        Value::from(x)
    }

    fn txt(s: &str) -> Value {
        Value::text(s)
    }

    #[test]
    fn test_empty_expression_leaves_nothing() {
        let (result, out) = run("( )");
        assert_eq!(result.size(), 0);
        assert_eq!(out, "");

        let (result, _) = run("");
        assert_eq!(result.size(), 0);
    }

    #[test]
    fn test_literals_land_on_the_data_stack() {
        let (result, _) = run("'42'");
        assert_eq!(top(&result), num(42));

        let (result, _) = run("\"hello\"");
        assert_eq!(top(&result), txt("hello"));

        let (result, _) = run("'1' '2' '3'");
        assert_eq!(result.size(), 3);
        assert_eq!(top(&result), num(3));
    }

    #[test]
    fn test_arithmetic_scenarios() {
        let cases: Vec<(&str, Value)> = vec![
            // Grouping preserves precedence
            ("( '2' + ('3' * '4') )", num(14)),
            // Without grouping the rewrite evaluates left to right
            ("( '2' + '3' * '4' )", num(20)),
            ("'10' - '4'", num(6)),
            ("'10' / '4'", Value::from(2.5)),
            ("'10' % '3'", num(1)),
            ("'7' // '2'", num(3)),
            ("'2' ** '8'", num(256)),
            ("'10' '4' sub", num(6)),
            ("'3' '4' mul", num(12)),
            ("'9' '2' mod", num(1)),
        ];

        for (source, expected) in cases {
            let (result, _) = run(source);
            assert_eq!(top(&result), expected, "for program: {source}");
        }
    }

    #[test]
    fn test_fractional_remainder() {
        let (result, _) = run("'7' %% '2'");
        let Value::Number(n) = top(&result) else {
            panic!("expected number");
        };
        assert!((n.real_part() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero_is_nan() {
        let (result, _) = run("'1' / '0'");
        let Value::Number(n) = top(&result) else {
            panic!("expected number, got {}", top(&result));
        };
        assert!(n.is_nan());

        let (result, _) = run("'1' % '0'");
        let Value::Number(n) = top(&result) else {
            panic!("expected number");
        };
        assert!(n.is_nan());
    }

    #[test]
    fn test_relational_operators() {
        let cases: Vec<(&str, bool)> = vec![
            ("'3' > '2'", true),
            ("'2' > '3'", false),
            ("'2' < '3'", true),
            ("'2' <= '2'", true),
            ("'2' >= '3'", false),
            ("'2' = '2'", true),
            ("'2' = '3'", false),
            ("'2' -= '3'", true),
            ("\"a\" < \"b\"", true),
            // NaN is unordered: every relation but ne reads false
            ("'nan' = '1'", false),
            ("'nan' < '1'", false),
            ("'nan' >= '1'", false),
            ("'nan' -= '1'", true),
        ];

        for (source, expected) in cases {
            let (result, _) = run(source);
            assert_eq!(
                top(&result).is_truthy(),
                expected,
                "for program: {source}"
            );
        }
    }

    #[test]
    fn test_logical_operators() {
        let cases: Vec<(&str, bool)> = vec![
            ("true & true", true),
            ("true & false", false),
            ("true | false", true),
            ("false | false", false),
            ("true ^ false", true),
            ("false and true", false),
            ("false or true", true),
            // Non-booleans coerce through truthiness
            ("'1' & '2'", true),
            ("'0' | \"\"", false),
        ];

        for (source, expected) in cases {
            let (result, _) = run(source);
            assert_eq!(
                top(&result).is_truthy(),
                expected,
                "for program: {source}"
            );
        }
    }

    #[test]
    fn test_let_binding_and_lookup() {
        let (result, _) = run("let x = '7' x '1' +");
        assert_eq!(top(&result), num(8));

        // Rebinding replaces the innermost binding
        let (result, _) = run("let x = '1' let x = '2' x");
        assert_eq!(top(&result), num(2));

        let (result, _) = run("let s = \"hi\" s");
        assert_eq!(top(&result), txt("hi"));
    }

    #[test]
    fn test_let_with_indexed_target() {
        let (result, _) = run("let o = { \"k\" '1' } let o [\"k\"] = '9' o \"k\" get");
        assert_eq!(top(&result), num(9));
    }

    #[test]
    fn test_conditional_scenarios() {
        let (result, _) = run("if ( '3' > '2' ) : \"yes\" ; else : \"no\" ;");
        assert_eq!(top(&result), txt("yes"));

        let (result, _) = run("if ( '1' > '2' ) : \"yes\" ; else : \"no\" ;");
        assert_eq!(top(&result), txt("no"));

        // Without an else, a false condition leaves nothing behind
        let (result, _) = run("if ( '1' > '2' ) : \"yes\" ;");
        assert_eq!(result.size(), 0);
    }

    #[test]
    fn test_elif_chain() {
        let program = |x: i64| {
            format!(
                "let x = '{x}' \
                 if ( x > '10' ) : \"big\" ; \
                 elif ( x > '5' ) : \"mid\" ; \
                 else : \"small\" ;"
            )
        };

        let (result, _) = run(&program(20));
        assert_eq!(top(&result), txt("big"));

        let (result, _) = run(&program(7));
        assert_eq!(top(&result), txt("mid"));

        let (result, _) = run(&program(1));
        assert_eq!(top(&result), txt("small"));
    }

    #[test]
    fn test_infix_then() {
        let (result, _) = run("( '5' > '3' ) then : \"yes\" \"no\" ;");
        assert_eq!(top(&result), txt("yes"));

        let (result, _) = run("( '1' > '3' ) then : \"yes\" \"no\" ;");
        assert_eq!(top(&result), txt("no"));
    }

    #[test]
    fn test_postfix_imply() {
        let (result, _) = run("( '5' > '3' ) idnt : \"yes\" \"no\" ; imply");
        assert_eq!(top(&result), txt("yes"));
    }

    #[test]
    fn test_function_definition_and_application() {
        let (result, _) = run("def sq ( n ) : n n * ; sq '5'");
        assert_eq!(top(&result), num(25));

        // Multiple parameters bind textually
        let (result, _) = run("def subtract ( a b ) : a b sub ; subtract '10' '4'");
        assert_eq!(top(&result), num(6));

        // Applying the same binding twice
        let (result, _) = run("def sq ( n ) : n n * ; sq '2' sq '3'");
        let items = result.elements().unwrap();
        assert_eq!(items[0], num(9));
        assert_eq!(items[1], num(4));
    }

    #[test]
    fn test_let_with_function_value_defers_to_def() {
        let (result, _) = run("let sq = func ( n ) : n n * ; sq '6'");
        assert_eq!(top(&result), num(36));
    }

    #[test]
    fn test_lexical_scope_shadowing() {
        let (result, _) = run("let x = '1' def f ( x ) : x ; f '2' x");
        // The call sees its parameter, the outer lookup the global
        let items = result.elements().unwrap();
        assert_eq!(items[0], num(1));
        assert_eq!(items[1], num(2));
    }

    #[test]
    fn test_scope_teardown() {
        // After a call returns, its locals are gone
        let (_, out) = run("def f ( n ) : let local = '1' local ; f '0' local <<");
        assert!(out.contains("undef_var"), "output was: {out}");
    }

    #[test]
    fn test_recursive_function() {
        let (result, _) = run(
            "def fact ( n ) : \
                 let m = ( n - '1' ) \
                 if ( n > '1' ) : ( n * ( fact m ) ) ; \
                 else : '1' ; \
             ; \
             fact '5'",
        );
        assert_eq!(top(&result), num(120));
    }

    #[test]
    fn test_recursion_limit_boundary() {
        let program = "def fact ( n ) : \
                 let m = ( n - '1' ) \
                 if ( n > '1' ) : ( n * ( fact m ) ) ; \
                 else : '1' ; \
             ; \
             fact '5'";

        // Enough scope room: the recursion completes
        let (result, out) = run_with(program, "", |e| e.with_limits(16, DEFAULT_STACK_LIMIT));
        assert_eq!(top(&result), num(120));
        assert!(!out.contains("stack_overflow"));

        // One scope short: the deepest call faults
        let (_, out) = run_with(program, "", |e| e.with_limits(5, DEFAULT_STACK_LIMIT));
        assert!(out.contains("stack_overflow"), "output was: {out}");
    }

    #[test]
    fn test_data_stack_limit() {
        let (result, out) =
            run_with("'1' '2' '3' '4'", "", |e| e.with_limits(DEFAULT_RECURSION_LIMIT, 3));
        assert!(out.contains("deque_overflow"), "output was: {out}");
        assert_eq!(result.size(), 3);
        assert_eq!(top(&result), num(3));
    }

    #[test]
    fn test_object_scenarios() {
        let (result, _) = run("let o = { \"k\" \"v\" } o \"k\" get");
        assert_eq!(top(&result), txt("v"));

        let (result, _) = run("let o = { \"k\" \"v\" } o \"k\" has");
        assert!(top(&result).is_truthy());

        let (result, _) = run("let o = { \"k\" \"v\" } o \"missing\" has");
        assert!(!top(&result).is_truthy());

        let (result, _) = run("let o = { \"a\" '1' \"b\" '2' } o \"a\" del \"a\" has");
        assert!(!top(&result).is_truthy());

        // set returns the updated object
        let (result, _) = run("{ \"a\" '1' } \"b\" '2' set \"b\" get");
        assert_eq!(top(&result), num(2));
    }

    #[test]
    fn test_object_type_slot() {
        let (result, _) = run("let p = { \"type\" \"point\" \"x\" '1' } p type");
        assert_eq!(top(&result), txt("point"));
    }

    #[test]
    fn test_undefined_variable_emission() {
        let (result, out) = run("y");
        assert!(out.contains("y = undef_var"), "output was: {out}");
        assert!(out.ends_with('\n'));
        assert_eq!(result.size(), 0);
    }

    #[test]
    fn test_emit_and_endl() {
        let (_, out) = run("\"hello\" << endl");
        assert_eq!(out, "hello\n");

        let (_, out) = run("'42' <<");
        assert_eq!(out, "42");

        let (_, out) = run("true <<");
        assert_eq!(out, "true");
    }

    #[test]
    fn test_emit_with_format() {
        let (_, out) = run("'255' `x` <<");
        assert_eq!(out, "ff");

        let (_, out) = run("'2.5' `.2f` <<");
        assert_eq!(out, "2.50");

        let (_, out) = run("\"hi\" `*>4` <<");
        assert_eq!(out, "**hi");
    }

    #[test]
    fn test_bool_rendering_styles() {
        let (_, out) = run("bool_numeric true << false <<");
        assert_eq!(out, "10");

        let (_, out) = run("bool_numeric bool_alpha true <<");
        assert_eq!(out, "true");
    }

    #[test]
    fn test_size_type_bool_is() {
        let cases: Vec<(&str, Value)> = vec![
            ("\"abc\" size", num(3)),
            ("[ '1' '2' ] size", num(2)),
            ("'5' size", num(0)),
            ("'5' type", txt("number")),
            ("\"x\" type", txt("text")),
            ("[ ] type", txt("list")),
        ];

        for (source, expected) in cases {
            let (result, _) = run(source);
            assert_eq!(top(&result), expected, "for program: {source}");
        }

        let (result, _) = run("'0' bool");
        assert!(!top(&result).is_truthy());
        let (result, _) = run("'7' bool");
        assert!(top(&result).is_truthy());
        let (result, _) = run("\"x\" is");
        assert!(top(&result).is_truthy());
    }

    #[test]
    fn test_sequence_operators() {
        let (result, _) = run("[ '1' '2' ] lead");
        assert_eq!(top(&result), num(1));

        let (result, _) = run("[ '1' '2' ] drop");
        assert_eq!(top(&result), Value::list(vec![num(2)]));

        let (result, _) = run("'3' [ '1' '2' ] join");
        assert_eq!(top(&result).render_default(), "[3, 1, 2]");

        let (result, _) = run("[ '1' '2' ] rev");
        assert_eq!(top(&result).render_default(), "[2, 1]");
    }

    #[test]
    fn test_deque_targeted_sequence_operators() {
        // lead_ copies the front (oldest) value
        let (result, _) = run("'1' '2' idnt deque lead_");
        assert_eq!(top(&result), num(1));
        assert_eq!(result.size(), 3);

        // _last copies the back (newest) value
        let (result, _) = run("'1' '2' idnt deque _last");
        assert_eq!(top(&result), num(2));

        // drop_ removes the front value
        let (result, _) = run("'1' '2' idnt deque drop_");
        assert_eq!(result.size(), 1);
        assert_eq!(top(&result), num(2));

        // _drop removes the back value
        let (result, _) = run("'1' '2' idnt deque _drop");
        assert_eq!(result.size(), 1);
        assert_eq!(top(&result), num(1));

        // join_ inserts at the front (the bottom of the stack)
        let (result, _) = run("'9' '1' idnt deque join_");
        let items = result.elements().unwrap();
        assert_eq!(items.last().unwrap(), &num(1));
        assert_eq!(top(&result), num(9));

        // _join appends at the back (the top of the stack)
        let (result, _) = run("'9' '1' idnt deque _join");
        assert_eq!(top(&result), num(1));
    }

    #[test]
    fn test_deque_snapshot_and_reset() {
        // The deque opcode pushes a snapshot list
        let (result, _) = run("'1' '2' deque");
        let snapshot = top(&result);
        assert_eq!(snapshot.kind(), "list");
        assert_eq!(snapshot.size(), 2);
        // Oldest at the lead: iterating lead-first gives push order
        assert_eq!(snapshot.lead(), num(1));

        // Assigning a sequence to the sentinel resets the stack; elements
        // land in lead-first order, so the list's lead is the new bottom
        let (result, _) = run("'9' idnt deque [ '8' '7' ] assign");
        assert_eq!(result.size(), 2);
        assert_eq!(top(&result), num(7));
        assert_eq!(result.lead(), num(8));
    }

    #[test]
    fn test_function_with_deque_argument() {
        let (result, _) = run("def count ( xs ) : xs size ; '1' '2' count deque");
        assert_eq!(top(&result), num(2));
    }

    #[test]
    fn test_assign_to_non_symbol_faults() {
        let (_, out) = run("idnt '1' '2' assign");
        assert!(out.contains("Miss handled assignment"), "output was: {out}");
    }

    #[test]
    fn test_input_operator() {
        let (result, out) = run_with(">>", "'3' '4' add\n", |e| e);
        assert_eq!(top(&result), num(7));
        assert_eq!(out, "");
    }

    #[test]
    fn test_continue_prompt_halts_when_declined() {
        let (_, out) = run_with("#! NO_EXCEPT = false y \"after\" <<", "n\n", |e| e);
        assert!(out.contains("undef_var"));
        assert!(out.contains("Continue runtime?"));
        // The code stack was cleared before "after" could emit
        assert!(!out.contains("after"));
    }

    #[test]
    fn test_continue_prompt_continues_when_accepted() {
        let (_, out) = run_with("#! NO_EXCEPT = false y \"after\" <<", "y\n", |e| e);
        assert!(out.contains("Continue runtime?"));
        assert!(out.contains("after"));
    }

    #[test]
    fn test_no_exceptions_default_skips_prompt() {
        let (_, out) = run("y \"after\" <<");
        assert!(out.contains("undef_var"));
        assert!(!out.contains("Continue runtime?"));
        assert!(out.contains("after"));
    }

    #[test]
    fn test_code_stack_drains_to_empty() {
        // Whatever the program, the loop terminates with an empty code
        // stack; reaching this assertion at all means run() returned.
        let programs = [
            "",
            "'1' '2' '3'",
            "y",
            "def f ( n ) : n ; f '1'",
            "if ( '1' ) : '2' ;",
        ];

        for program in programs {
            let (_, _) = run(program);
        }
    }

    #[test]
    fn test_eval_rejects_non_expression() {
        let mut e = Evaluator::new();
        assert!(e.eval(Value::from(42)).is_nothing());
        assert!(e.eval(Value::list(vec![])).is_nothing());
    }

    #[test]
    fn test_neg_operator() {
        let (result, _) = run("neg '5'");
        assert_eq!(top(&result), num(-5));

        let (result, _) = run("-'5'");
        assert_eq!(top(&result), num(-5));

        let (result, _) = run("neg true");
        assert!(!top(&result).is_truthy());
    }

    #[test]
    fn test_idnt_defers_evaluation() {
        // idnt pushes the symbol itself, unresolved
        let (result, _) = run("idnt x type");
        assert_eq!(top(&result), txt("symbol"));
    }

    /// Expected outcome of one comprehensive scenario.
    #[derive(Debug)]
    enum Expected {
        /// The data stack top equals this value
        Top(Value),
        /// The data stack top renders to this text
        Render(&'static str),
        /// The data stack top has this boolean sense
        Truthy(bool),
        /// The data stack ends empty
        Empty,
        /// The output sink holds exactly this text
        Output(&'static str),
        /// The output sink contains this text
        OutputHas(&'static str),
    }
    use Expected::*;

    fn run_comprehensive_scenarios(cases: Vec<(&str, Expected)>) {
        for (i, (source, expected)) in cases.iter().enumerate() {
            let (result, out) = run(source);
            let test_id = format!("scenario #{} '{source}'", i + 1);

            match expected {
                Top(value) => assert_eq!(&top(&result), value, "{test_id}"),
                Render(text) => {
                    assert_eq!(top(&result).render_default(), *text, "{test_id}")
                }
                Truthy(sense) => {
                    assert_eq!(top(&result).is_truthy(), *sense, "{test_id}")
                }
                Empty => assert_eq!(result.size(), 0, "{test_id}: stack was {result}"),
                Output(text) => assert_eq!(out, *text, "{test_id}"),
                OutputHas(text) => {
                    assert!(out.contains(text), "{test_id}: output was {out}")
                }
            }
        }
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive scenario coverage is intentionally thorough
    fn test_comprehensive_scenarios() {
        let cases: Vec<(&str, Expected)> = vec![
            // === LITERALS ===
            ("'0'", Top(num(0))),
            ("'3.5'", Render("3.5")),
            ("'3 + 4j'", Render("(3,4j)")),
            ("'4j'", Render("4j")),
            ("'nan'", Render("nan")),
            ("\"two words\"", Top(txt("two words"))),
            ("true", Truthy(true)),
            ("undef", Truthy(false)),
            // Reserved nothing words leave no value behind
            ("nothing", Empty),
            ("none", Empty),
            // === ARITHMETIC ===
            ("'1' + '2'", Top(num(3))),
            ("'1' - '2'", Top(num(-1))),
            ("'6' * '7'", Top(num(42))),
            ("'9' / '2'", Render("4.5")),
            ("'9' % '2'", Top(num(1))),
            ("'9' // '2'", Top(num(4))),
            ("'3' ** '3'", Top(num(27))),
            ("'16' '2' fdiv", Top(num(8))),
            ("'16' '0' div", Render("nan")),
            ("'16' '0' mod", Render("nan")),
            ("'nan' + '1'", Render("nan")),
            // Complex arithmetic follows host semantics
            ("'4j' * '4j'", Render("-16")),
            ("'1 + 2j' + '3 - 1j'", Render("(4,1j)")),
            // Mismatched kinds vanish instead of failing
            ("'1' \"x\" add", Empty),
            ("\"x\" \"y\" sub", Empty),
            // Unary forms
            ("neg '7'", Top(num(-7))),
            ("-'7'", Top(num(-7))),
            // === COMPARISON ===
            ("'2' < '3'", Truthy(true)),
            ("'3' '3' le", Truthy(true)),
            ("'2' '3' gt", Truthy(false)),
            ("\"abc\" \"abd\" lt", Truthy(true)),
            ("\"b\" \"a\" ge", Truthy(true)),
            // Distinct kinds are unordered: only ne reads true
            ("'1' = \"1\"", Truthy(false)),
            ("'1' -= \"1\"", Truthy(true)),
            ("true '1' eq", Truthy(false)),
            // === LOGIC ===
            ("'3' '0' and", Truthy(false)),
            ("'3' '0' or", Truthy(true)),
            ("'3' '0' xor", Truthy(true)),
            ("'3' '3' xor", Truthy(false)),
            ("undef bool", Truthy(false)),
            // The undefined boolean poisons the averaged certainty
            ("undef true |", Truthy(false)),
            // === TEXT AS SEQUENCE ===
            ("\"a\" \"b\" join", Render("ab")),
            ("\"abc\" lead", Top(txt("a"))),
            ("\"abc\" drop", Top(txt("bc"))),
            ("\"abc\" rev", Top(txt("cba"))),
            ("\"abc\" '1' get", Top(txt("b"))),
            ("\"abc\" '2' has", Truthy(true)),
            ("\"abc\" '3' has", Truthy(false)),
            ("\"abc\" size", Top(num(3))),
            // === LISTS ===
            ("[ '1' '2' '3' ] '2' get", Top(num(3))),
            ("[ '1' '2' '3' ] '0' get", Top(num(1))),
            ("[ '1' ] [ '2' ] add", Render("[1, 2]")),
            ("[ '1' '2' ] [ ] eq", Truthy(false)),
            ("[ '1' '2' ] [ '1' '2' ] eq", Truthy(true)),
            ("[ ] bool", Truthy(false)),
            // === OBJECTS ===
            ("{ \"a\" '1' } size", Top(num(1))),
            ("{ \"a\" '1' } \"a\" get", Top(num(1))),
            ("{ } bool", Truthy(false)),
            ("{ \"a\" '1' } [\"a\"] get", Top(num(1))),
            // A missing key reads as nothing, an unsupported key shape as
            // an invalid-index error value
            ("{ \"a\" '1' } \"b\" get", Empty),
            (
                "{ \"a\" '1' } [ '1' '2' ] get",
                Render("Invalid index - [1, 2] - provided!"),
            ),
            // === BINDINGS ===
            ("let x = '2' let y = '3' ( x * y )", Top(num(6))),
            ("let a = '1' let a = ( a + '1' ) a", Top(num(2))),
            ("let t = \"hi\" t t join", Render("hihi")),
            // === INTROSPECTION ===
            ("'5' is", Truthy(true)),
            ("'0' is", Truthy(true)),
            ("'5' type", Top(txt("number"))),
            ("idnt add type", Top(txt("op_call"))),
            ("idnt x type", Top(txt("symbol"))),
            ("`x` type", Top(txt("format"))),
            // The sentinel tests stack emptiness
            ("idnt deque bool", Truthy(false)),
            ("'1' idnt deque bool", Truthy(true)),
            // === CONTROL FLOW ===
            ("( '1' ) then : \"t\" \"f\" ; <<", Output("t")),
            ("( '0' ) then : \"t\" \"f\" ; <<", Output("f")),
            ("if ( '1' ) : '10' ; else : '20' ;", Top(num(10))),
            ("if ( '0' ) : '10' ; elif ( '1' ) : '20' ; else : '30' ;", Top(num(20))),
            ("if ( '0' ) : '10' ; elif ( '0' ) : '20' ; else : '30' ;", Top(num(30))),
            // === EMISSION ===
            ("endl", Output("\n")),
            ("'1' << '2' <<", Output("12")),
            ("\"x = \" << '42' << endl", Output("x = 42\n")),
            ("'255' `#x` <<", Output("ff")),
            ("bool_numeric false <<", Output("0")),
            // === ERRORS ARE DATA ===
            ("zzz", OutputHas("zzz = undef_var")),
            ("'1' lead", Empty),
            ("idnt '1' '2' assign", OutputHas("Miss handled assignment")),
        ];

        run_comprehensive_scenarios(cases);
    }

    #[test]
    fn test_compile_eval_round_trip_for_literals() {
        // Literal values survive source -> tokens -> code -> evaluation
        let cases: Vec<(&str, Value)> = vec![
            ("'14'", num(14)),
            ("'-3'", num(-3)),
            ("\"text\"", txt("text")),
            ("true", Value::from(true)),
            ("false", Value::from(false)),
        ];

        for (source, expected) in cases {
            let (result, _) = run(source);
            let value = top(&result);
            assert_eq!(value, expected, "for literal {source}");

            // And the rendered form re-evaluates to the same value
            let rendered = if value.kind() == "number" {
                format!("'{}'", value.render_default())
            } else if value.kind() == "text" {
                format!("\"{}\"", value.render_default())
            } else {
                value.render_default()
            };
            let (again, _) = run(&rendered);
            assert_eq!(top(&again), expected, "re-evaluating {rendered}");
        }
    }
}
