//! Operator enumeration and the surface-name table.
//!
//! The interpreter classifies operators in O(1) by partitioning the opcode
//! enumeration into contiguous ranges bounded by sentinel variants:
//!
//! - **prefix unary** and **infix binary** opcodes exist only at compile
//!   time; the compiler rewrites them into postfix runtime forms
//! - **fundamental**, **sequential**, **index**, **binary**, and
//!   **algorithm** opcodes are dispatched by the evaluator to the matching
//!   operator group
//!
//! Surface names are resolved through a fixed table. Several names map to
//! [`OpCode::Nothing`] on purpose (`none`, `nothing`, `??`): they compile to
//! an op-call the evaluator ignores.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Interpreter operator enumeration.
///
/// Variant order is load-bearing: range classification compares against the
/// `*Start`/`*End` sentinels, so new opcodes must be added inside the range
/// they dispatch with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpCode {
    Nothing,

    // Compile-time operators. The compiler rewrites these while closing a
    // collection; any that leak through to the evaluator are ignored.
    PrefixOperatorsStart,
    Idnt,
    Neg,
    PrefixOperatorsEnd,

    InfixOperatorsStart,
    InfixAnd,
    InfixOr,
    InfixXor,
    InfixAdd,
    InfixSub,
    InfixMul,
    InfixDiv,
    InfixMod,
    InfixFdiv,
    InfixRem,
    InfixExp,
    InfixEq,
    InfixNe,
    InfixLt,
    InfixLe,
    InfixGt,
    InfixGe,
    InfixLead,
    InfixJoin,
    InfixDrop,
    InfixOperatorsEnd,

    // Runtime operators: fundamental group.
    Shebang,
    NoExcept,
    Deque,
    Emit,
    Endl,
    Input,
    Assign,
    Let,
    IsDef,
    Size,
    Type,
    Bool,
    ImplyInfix,
    Imply,
    If,
    Elif,
    Else,
    Func,
    Def,
    EndScope,
    BoolAlpha,
    BoolNumeric,
    FundamentalOperatorsEnd,

    // Runtime operators: sequential group.
    Lead,
    Join,
    Drop,
    Next,
    DequeLead,
    DequeLast,
    DequeJoin,
    DequePush,
    DequeDrop,
    DequeShift,
    SequentialOperatorsEnd,

    // Runtime operators: index group.
    Get,
    Set,
    Has,
    Del,
    IndexOperatorsEnd,

    // Runtime operators: binary group.
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Fdiv,
    Rem,
    Exp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    BinaryOperatorsEnd,

    // Runtime operators: algorithm group.
    Rev,
    AlgorithmOperatorsEnd,

    // Compile-time marker pushed when a `{` opens an object collection.
    MapMarker,

    EndOperators,
}

impl OpCode {
    /// Compile-time prefix unary operators (`idnt`, `neg`).
    pub fn is_prefix_unary(self) -> bool {
        self > OpCode::PrefixOperatorsStart && self < OpCode::PrefixOperatorsEnd
    }

    /// Compile-time infix binary operators rewritten to postfix.
    pub fn is_infix_binary(self) -> bool {
        self > OpCode::InfixOperatorsStart && self < OpCode::InfixOperatorsEnd
    }

    /// True for every opcode the evaluator dispatches on.
    pub fn is_runtime(self) -> bool {
        self > OpCode::Nothing && self < OpCode::EndOperators
    }

    /// The surface spelling of this opcode, used when rendering op-call
    /// values back to source form.
    pub fn surface_name(self) -> &'static str {
        SURFACE_NAMES
            .get(&self)
            .copied()
            .unwrap_or("unknown_operator")
    }

    /// Look up a bare word in the operator name table.
    pub fn from_name(name: &str) -> Option<OpCode> {
        OPERATORS.get(name).copied()
    }

    /// Map a compile-time infix opcode to its postfix runtime counterpart.
    pub fn postfix_form(self) -> Option<OpCode> {
        use OpCode::*;

        let postfix = match self {
            InfixAnd => LogicalAnd,
            InfixOr => LogicalOr,
            InfixXor => LogicalXor,
            InfixAdd => Add,
            InfixSub => Sub,
            InfixMul => Mul,
            InfixDiv => Div,
            InfixMod => Mod,
            InfixFdiv => Fdiv,
            InfixRem => Rem,
            InfixExp => Exp,
            InfixEq => Eq,
            InfixNe => Ne,
            InfixLt => Lt,
            InfixLe => Le,
            InfixGt => Gt,
            InfixGe => Ge,
            InfixLead => Lead,
            InfixJoin => Join,
            InfixDrop => Drop,
            _ => return None,
        };

        Some(postfix)
    }
}

/// The fixed operator name table mapping surface spellings to opcodes.
static OPERATORS: LazyLock<HashMap<&'static str, OpCode>> = LazyLock::new(|| {
    use OpCode::*;

    HashMap::from([
        // Fundamental operators
        ("#!", Shebang),
        ("NO_EXCEPT", NoExcept),
        ("none", Nothing),
        ("nothing", Nothing),
        ("??", Nothing),
        ("idnt", Idnt),
        ("deque", Deque),
        ("<<", Emit),
        (">>", Input),
        ("assign", Assign),
        ("let", Let),
        ("if", If),
        ("is", IsDef),
        ("elif", Elif),
        ("else", Else),
        ("func", Func),
        ("def", Def),
        ("neg", Neg),
        ("endl", Endl),
        ("size", Size),
        ("type", Type),
        ("bool", Bool),
        // Fundamental sequential operators
        ("lead", Lead),
        ("<--", InfixLead),
        ("join", Join),
        ("<->", InfixJoin),
        ("drop", Drop),
        ("-->", InfixDrop),
        ("next", Next),
        ("lead_", DequeLead),
        ("_last", DequeLast),
        ("join_", DequeJoin),
        ("_join", DequePush),
        ("drop_", DequeDrop),
        ("_drop", DequeShift),
        // Binary postfix mathematical operators
        ("add", Add),
        ("sub", Sub),
        ("mul", Mul),
        ("div", Div),
        ("mod", Mod),
        ("fdiv", Fdiv),
        ("rem", Rem),
        ("exp", Exp),
        // Binary infix mathematical operators
        ("+", InfixAdd),
        ("-", InfixSub),
        ("*", InfixMul),
        ("/", InfixDiv),
        ("%", InfixMod),
        ("//", InfixFdiv),
        ("%%", InfixRem),
        ("**", InfixExp),
        // Binary postfix relational operators
        ("eq", Eq),
        ("ne", Ne),
        ("lt", Lt),
        ("le", Le),
        ("gt", Gt),
        ("ge", Ge),
        // Binary infix relational operators
        ("=", InfixEq),
        ("-=", InfixNe),
        ("<", InfixLt),
        ("<=", InfixLe),
        (">", InfixGt),
        (">=", InfixGe),
        // Binary infix and postfix logical operators
        ("&", InfixAnd),
        ("and", LogicalAnd),
        ("|", InfixOr),
        ("or", LogicalOr),
        ("^", InfixXor),
        ("xor", LogicalXor),
        ("then", ImplyInfix),
        ("imply", Imply),
        // Index operators
        ("get", Get),
        ("set", Set),
        ("has", Has),
        ("del", Del),
        // Algorithm operators
        ("rev", Rev),
        // I/O operators
        ("bool_alpha", BoolAlpha),
        ("bool_numeric", BoolNumeric),
    ])
});

/// Reverse lookup for rendering op-calls. Where several spellings share an
/// opcode the canonical (word) spelling wins.
static SURFACE_NAMES: LazyLock<HashMap<OpCode, &'static str>> = LazyLock::new(|| {
    let mut names: HashMap<OpCode, &'static str> = HashMap::new();

    // Canonical spellings first so aliases never shadow them.
    for canonical in [
        "nothing", "idnt", "neg", "deque", "<<", ">>", "assign", "let", "if", "elif", "else",
        "func", "def", "endl", "is", "size", "type", "bool", "then", "imply", "lead", "join",
        "drop", "next", "lead_", "_last", "join_", "_join", "drop_", "_drop", "add", "sub", "mul",
        "div", "mod", "fdiv", "rem", "exp", "eq", "ne", "lt", "le", "gt", "ge", "and", "or", "xor",
        "get", "set", "has", "del", "rev", "bool_alpha", "bool_numeric", "#!", "NO_EXCEPT",
    ] {
        if let Some(op) = OpCode::from_name(canonical) {
            names.entry(op).or_insert(canonical);
        }
    }

    for (name, op) in OPERATORS.iter() {
        names.entry(*op).or_insert(name);
    }

    names.insert(OpCode::EndScope, "end_scope");

    names
});
