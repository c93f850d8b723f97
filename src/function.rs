//! The function kind.
//!
//! A function is a parameter list, a body expression, and a captured scope.
//! Scopes are bound after definition: `def` captures the defining scope and
//! then records the function under its own name (and the name under the key
//! `self`) so recursive calls resolve without a cyclic reference - the
//! capture is a copy, not a shared cell.

use std::collections::HashMap;

use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Function {
    params: Box<Value>,
    body: Box<Value>,
    scope: HashMap<String, Value>,
}

impl Function {
    pub fn new(params: Value, body: Value) -> Self {
        Function {
            params: Box::new(params),
            body: Box::new(body),
            scope: HashMap::new(),
        }
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn scope(&self) -> &HashMap<String, Value> {
        &self.scope
    }

    pub fn is_truthy(&self) -> bool {
        self.params.is_truthy() || self.body.is_truthy()
    }

    /// Number of formal parameters.
    pub fn arity(&self) -> usize {
        self.params.size()
    }

    /// Bind an enclosing scope into the captured scope. The name recorded
    /// under `self` is skipped so the capture never holds the function's
    /// own name twice, and existing bindings are not overwritten.
    pub fn bind_scope(&mut self, enclosing: &HashMap<String, Value>) {
        let self_name = self
            .scope
            .get("self")
            .map(|v| v.render_default())
            .unwrap_or_default();

        for (name, value) in enclosing {
            if *name != self_name && !self.scope.contains_key(name) {
                self.scope.insert(name.clone(), value.clone());
            }
        }
    }

    /// Bind a single variable into the captured scope.
    pub fn bind_variable(&mut self, name: &Value, value: Value) {
        self.scope.insert(name.render_default(), value);
    }

    /// Functions compare by shape: equivalent when parameters and body
    /// match, unordered otherwise. The captured scope does not participate.
    pub fn same_shape(&self, other: &Function) -> bool {
        self.params == other.params && self.body == other.body
    }
}
