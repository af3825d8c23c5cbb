//! Property-based fuzzing tests for the VectorL lexer, compiler and machine
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. The lexer and parser never panic on arbitrary input
//! 2. Shape broadcasting obeys its algebraic laws
//! 3. Constant folding reaches a fixpoint and agrees with plain arithmetic
//! 4. Typed expression trees keep their metadata through rebuilding, and
//!    folded values agree with what the machine computes
//! 5. Runs are deterministic and events dispatch in (time, emission) order

use proptest::prelude::*;
use std::rc::Rc;
use std::sync::Arc;
use vectorl::builtins::{Reduction, ReductionBuiltin};
use vectorl::compiler::{Expr, ExprKind, ExprRef, Selector, Stmt, StmtKind, VarId};
use vectorl::parser::{BinaryOp, UnaryOp};
use vectorl::runtime::Scalar;
use vectorl::types::{broadcast_shape, broadcastable_into};
use vectorl::{
    run, Array, Builtin, CaptureSink, MemorySources, Parser, RunOptions, Scanner, Shape, Simulation,
    Type,
};

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// Generate random strings that might break the lexer
fn arbitrary_source_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[\x00-\x7F]{0,500}").unwrap()
}

/// Generate token soup made of VectorL lexemes
fn vectorl_like_string() -> impl Strategy<Value = String> {
    prop::collection::vec(vectorl_token(), 0..60).prop_map(|tokens| tokens.join(" "))
}

fn vectorl_token() -> impl Strategy<Value = String> {
    prop_oneof![
        // Punctuation
        Just("(".to_string()),
        Just(")".to_string()),
        Just("[".to_string()),
        Just("]".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just(";".to_string()),
        Just(",".to_string()),
        Just(":".to_string()),
        Just("::".to_string()),
        Just("...".to_string()),
        Just(":=".to_string()),
        Just("=".to_string()),
        Just("?".to_string()),
        Just(".".to_string()),
        // Keywords
        Just("var".to_string()),
        Just("let".to_string()),
        Just("const".to_string()),
        Just("func".to_string()),
        Just("event".to_string()),
        Just("on".to_string()),
        Just("emit".to_string()),
        Just("after".to_string()),
        Just("print".to_string()),
        Just("if".to_string()),
        Just("else".to_string()),
        Just("import".to_string()),
        Just("from".to_string()),
        Just("int".to_string()),
        Just("real".to_string()),
        Just("bool".to_string()),
        Just("time".to_string()),
        Just("Init".to_string()),
        // Operators
        Just("+".to_string()),
        Just("-".to_string()),
        Just("*".to_string()),
        Just("/".to_string()),
        Just("<".to_string()),
        Just(">=".to_string()),
        Just("&&".to_string()),
        Just("!".to_string()),
        Just("~".to_string()),
        // Literals
        (-1000i64..1000i64).prop_map(|n| n.to_string()),
        (0.0f64..100.0f64).prop_map(|f| format!("{:.2}", f)),
        r#""[a-zA-Z0-9 ]{0,20}""#.prop_map(|s| s),
        Just("true".to_string()),
        // Identifiers
        "[a-z][a-z0-9_]{0,6}".prop_map(|s| s),
        // Comments
        Just("//".to_string()),
        Just("/*".to_string()),
    ]
}

fn shape() -> impl Strategy<Value = Shape> {
    prop::collection::vec(1usize..4, 0..4).prop_map(Shape::new)
}

/// Integer arithmetic trees small enough never to overflow
#[derive(Debug, Clone)]
enum Arith {
    Lit(i64),
    Op(BinaryOp, Box<Arith>, Box<Arith>),
}

fn arith() -> impl Strategy<Value = Arith> {
    let leaf = (-9i64..10).prop_map(Arith::Lit);
    leaf.prop_recursive(3, 8, 2, |inner| {
        (
            prop_oneof![Just(BinaryOp::Add), Just(BinaryOp::Sub), Just(BinaryOp::Mul)],
            inner.clone(),
            inner,
        )
            .prop_map(|(op, l, r)| Arith::Op(op, Box::new(l), Box::new(r)))
    })
}

impl Arith {
    fn expr(&self) -> ExprRef {
        match self {
            Arith::Lit(i) => Expr::literal(Array::int(*i)),
            Arith::Op(op, l, r) => Expr::binary(*op, l.expr(), r.expr()).unwrap(),
        }
    }

    fn eval(&self) -> i64 {
        match self {
            Arith::Lit(i) => *i,
            Arith::Op(BinaryOp::Add, l, r) => l.eval() + r.eval(),
            Arith::Op(BinaryOp::Sub, l, r) => l.eval() - r.eval(),
            Arith::Op(_, l, r) => l.eval() * r.eval(),
        }
    }

    fn source(&self) -> String {
        match self {
            Arith::Lit(i) if *i < 0 => format!("({})", i),
            Arith::Lit(i) => i.to_string(),
            Arith::Op(op, l, r) => format!("({} {} {})", l.source(), op, r.source()),
        }
    }
}

/// Element types and shapes of generated leaves; any two shapes broadcast
const TYPES: [Type; 3] = [Type::Bool, Type::Int, Type::Real];
const SHAPES: [&[usize]; 3] = [&[], &[3], &[2, 3]];

/// Typed expression tree over bool, int and real arrays
#[derive(Debug, Clone)]
enum Node {
    /// Literal of a type and shape slot; cells cycle through the values
    Lit(usize, usize, Vec<i8>),
    /// The pre-declared variable of a type and shape slot
    Var(usize, usize),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Cast(usize, Box<Node>),
    Cond(Box<Node>, Box<Node>, Box<Node>),
    /// `x[0]`; scalars are left alone
    Index(Box<Node>),
    /// Reduction along axis 0; scalars are left alone
    Reduce(Reduction, Box<Node>),
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        3 => (0..3usize, 0..3usize, prop::collection::vec(-4i8..5, 1..7))
            .prop_map(|(t, s, values)| Node::Lit(t, s, values)),
        1 => (0..3usize, 0..3usize).prop_map(|(t, s)| Node::Var(t, s)),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (prop_oneof![Just(UnaryOp::Neg), Just(UnaryOp::Not)], inner.clone())
                .prop_map(|(op, x)| Node::Unary(op, Box::new(x))),
            (
                prop::sample::select(vec![
                    BinaryOp::Add,
                    BinaryOp::Sub,
                    BinaryOp::Mul,
                    BinaryOp::Div,
                    BinaryOp::Lt,
                    BinaryOp::Eq,
                    BinaryOp::And,
                ]),
                inner.clone(),
                inner.clone(),
            )
                .prop_map(|(op, l, r)| Node::Binary(op, Box::new(l), Box::new(r))),
            (0..3usize, inner.clone()).prop_map(|(t, x)| Node::Cast(t, Box::new(x))),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, y, n)| Node::Cond(Box::new(c), Box::new(y), Box::new(n))),
            inner.clone().prop_map(|x| Node::Index(Box::new(x))),
            (prop::sample::select(Reduction::ALL.to_vec()), inner)
                .prop_map(|(r, x)| Node::Reduce(r, Box::new(x))),
        ]
    })
}

fn leaf_array(t: usize, s: usize, values: &[i8]) -> Array {
    let shape = Shape::new(SHAPES[s].to_vec());
    let cells: Vec<Scalar> = values
        .iter()
        .cycle()
        .take(shape.size())
        .map(|&v| match TYPES[t] {
            Type::Bool => Scalar::Bool(v > 0),
            Type::Int => Scalar::Int(v as i64),
            _ => Scalar::Real(v as f64 / 2.0),
        })
        .collect();
    Array::from_scalars(TYPES[t], shape, cells).unwrap()
}

/// Initial value of the variable in a type and shape slot
fn var_init(t: usize, s: usize) -> Array {
    leaf_array(t, s, &[1, -2, 3, 0, 2, -1])
}

fn var_name(t: usize, s: usize) -> String {
    format!("v{}{}", t, s)
}

fn literal_source(array: &Array) -> String {
    let cells: Vec<String> = array
        .cells()
        .map(|cell| match cell {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) if i < 0 => format!("({})", i),
            Scalar::Int(i) => i.to_string(),
            Scalar::Real(r) if r < 0.0 => format!("({:?})", r),
            Scalar::Real(r) => format!("{:?}", r),
        })
        .collect();
    match array.shape().dims() {
        [] => cells[0].clone(),
        [_] => format!("[{}]", cells.join(", ")),
        [_, n] => {
            let rows: Vec<String> = cells.chunks(*n).map(|row| format!("[{}]", row.join(", "))).collect();
            format!("[{}]", rows.join(", "))
        }
        dims => panic!("no literal syntax for rank {}", dims.len()),
    }
}

impl Node {
    /// Builds the tree bottom-up and renders it as source text
    ///
    /// Variables become references, or with `inline` literals of their
    /// initial values. Every node built is pushed on `seen`.
    fn build(&self, inline: bool, seen: &mut Vec<ExprRef>) -> (ExprRef, String) {
        let (expr, source) = match self {
            Node::Lit(t, s, values) => {
                let array = leaf_array(*t, *s, values);
                let source = literal_source(&array);
                (Expr::literal(array), source)
            }
            Node::Var(t, s) if inline => {
                let array = var_init(*t, *s);
                let source = literal_source(&array);
                (Expr::literal(array), source)
            }
            Node::Var(t, s) => {
                let shape = Shape::new(SHAPES[*s].to_vec());
                (Expr::var_ref(VarId(*t * 3 + *s), TYPES[*t], shape), var_name(*t, *s))
            }
            Node::Unary(op, x) => {
                let (x, src) = x.build(inline, seen);
                (Expr::unary(*op, x).unwrap(), format!("({}{})", op, src))
            }
            Node::Binary(op, l, r) => {
                let (l, lsrc) = l.build(inline, seen);
                let (r, rsrc) = r.build(inline, seen);
                (Expr::binary(*op, l, r).unwrap(), format!("({} {} {})", lsrc, op, rsrc))
            }
            Node::Cast(t, x) => {
                let (x, src) = x.build(inline, seen);
                (Expr::cast(TYPES[*t], x).unwrap(), format!("{}({})", TYPES[*t], src))
            }
            Node::Cond(c, y, n) => {
                let (c, csrc) = c.build(inline, seen);
                let (y, ysrc) = y.build(inline, seen);
                let (n, nsrc) = n.build(inline, seen);
                let c = Expr::cast(Type::Bool, c).unwrap();
                (
                    Expr::cond(c, y, n).unwrap(),
                    format!("(bool({}) ? {} : {})", csrc, ysrc, nsrc),
                )
            }
            Node::Index(x) => {
                let (x, src) = x.build(inline, seen);
                if x.is_scalar() {
                    return (x, src);
                }
                let zero = Selector::Expr(Expr::literal(Array::int(0)));
                (Expr::index(x, vec![zero]).unwrap(), format!("({})[0]", src))
            }
            Node::Reduce(reduction, x) => {
                let (x, src) = x.build(inline, seen);
                if x.is_scalar() {
                    return (x, src);
                }
                let builtin: Arc<dyn Builtin> = Arc::new(ReductionBuiltin(*reduction));
                let source = format!("{}({}, 0)", builtin.name(), src);
                (
                    Expr::builtin(builtin, vec![x, Expr::literal(Array::int(0))]).unwrap(),
                    source,
                )
            }
        };
        seen.push(expr.clone());
        (expr, source)
    }

    /// Module declaring every slot variable and an `out` variable that
    /// `Init` overwrites with the tree, once directly and once under an `if`
    fn program(&self) -> (String, ExprRef) {
        let (_, source) = self.build(false, &mut Vec::new());
        let (folded, inline) = self.build(true, &mut Vec::new());
        let mut lines = Vec::new();
        for t in 0..3 {
            for s in 0..3 {
                lines.push(format!(
                    "var {} {} = {};",
                    TYPES[t],
                    var_name(t, s),
                    literal_source(&var_init(t, s))
                ));
            }
        }
        lines.push(format!("var {} out = {};", folded.ty, inline));
        lines.push(format!(
            "on Init {{ out := {src}; if (v10 > 0) {{ out := {src}; }} print out; }}",
            src = source
        ));
        (lines.join("\n"), folded)
    }
}

/// Target and right side of every assignment under `stmt`
fn assignments(stmt: &Stmt, out: &mut Vec<(ExprRef, ExprRef)>) {
    match &stmt.kind {
        StmtKind::Assign { lhs, rhs } => out.push((lhs.expr.clone(), rhs.clone())),
        StmtKind::If { then, els, .. } => {
            assignments(then, out);
            if let Some(els) = els {
                assignments(els, out);
            }
        }
        StmtKind::Block(stmts) => stmts.iter().for_each(|s| assignments(s, out)),
        _ => {}
    }
}

fn simulate(source: &str) -> (Simulation, CaptureSink) {
    let sink = CaptureSink::new();
    let mut sim = Simulation::compile(MemorySources::new().with("main", source), "main", sink.clone())
        .unwrap_or_else(|d| panic!("{}\n{:#?}", source, d.messages()));
    sim.start(None, None).unwrap();
    (sim, sink)
}

fn run_source(source: &str, options: &RunOptions) -> (vectorl::RunReport, CaptureSink) {
    let sink = CaptureSink::new();
    let report = run(MemorySources::new().with("main", source), "main", options, sink.clone());
    (report, sink)
}

fn bounded() -> RunOptions {
    RunOptions {
        steps: Some(200),
        ..RunOptions::default()
    }
}

// =============================================================================
// LEXER AND PARSER
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn lexer_never_panics(source in arbitrary_source_string()) {
        let _ = Scanner::new(&source).scan_tokens();
    }

    #[test]
    fn lexer_handles_vectorl_like(source in vectorl_like_string()) {
        let _ = Scanner::new(&source).scan_tokens();
    }

    #[test]
    fn parser_never_panics_on_valid_tokens(source in vectorl_like_string()) {
        if let Ok(tokens) = Scanner::new(&source).scan_tokens() {
            let _ = Parser::new(tokens).parse_module();
        }
    }

    #[test]
    fn parser_handles_deep_nesting(depth in 1usize..60) {
        let source = format!("const int x = {}1{};", "(".repeat(depth), ")".repeat(depth));
        let tokens = Scanner::new(&source).scan_tokens().unwrap();
        let module = Parser::new(tokens).parse();
        prop_assert!(module.is_ok());
    }

    #[test]
    fn parser_reports_unbalanced_brackets(open in 1usize..20, close in 0usize..20) {
        prop_assume!(open != close);
        let source = format!("const int x = {}1{};", "[".repeat(open), "]".repeat(close));
        let tokens = Scanner::new(&source).scan_tokens().unwrap();
        let (_, errors) = Parser::new(tokens).parse_module();
        prop_assert!(!errors.is_empty());
    }
}

// =============================================================================
// SHAPES AND CONSTANT FOLDING
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn broadcast_is_idempotent(s in shape()) {
        prop_assert_eq!(broadcast_shape(&[&s, &s]).unwrap(), s.clone());
        prop_assert_eq!(broadcast_shape(&[&s, &Shape::scalar()]).unwrap(), s.clone());
        prop_assert!(broadcastable_into(&s, &s));
        prop_assert!(broadcastable_into(&s, &Shape::scalar()));
    }

    #[test]
    fn broadcast_is_commutative(a in shape(), b in shape()) {
        let ab = broadcast_shape(&[&a, &b]).ok();
        let ba = broadcast_shape(&[&b, &a]).ok();
        prop_assert_eq!(ab.clone(), ba);
        // assignment compatibility implies the broadcast leaves the target shape alone
        if broadcastable_into(&a, &b) {
            prop_assert_eq!(ab, Some(a));
        }
    }

    #[test]
    fn folding_reaches_a_fixpoint(tree in arith()) {
        let expr = tree.expr();
        prop_assert_eq!(expr.constant, Some(true));
        prop_assert_eq!(expr.value.clone(), Some(Array::int(tree.eval())));

        let folded = expr.folded();
        prop_assert!(matches!(folded.kind, ExprKind::Literal));
        prop_assert!(Rc::ptr_eq(&folded.folded(), &folded));
        prop_assert!(folded.structurally_equal(&expr));
    }

    #[test]
    fn compiled_constants_match_arithmetic(tree in arith()) {
        let source = format!("const int c = {};\non Init print c;", tree.source());
        let (report, sink) = run_source(&source, &RunOptions::default());
        prop_assert!(report.success, "{:?}", report.messages);
        prop_assert_eq!(sink.lines(), vec![tree.eval().to_string()]);
    }
}

// =============================================================================
// TYPED EXPRESSION TREES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn rebuilt_nodes_keep_their_metadata(tree in node()) {
        let mut seen = Vec::new();
        tree.build(false, &mut seen);
        for expr in &seen {
            let rebuilt = expr.rebuilt().unwrap();
            prop_assert_eq!(rebuilt.ty, expr.ty);
            prop_assert_eq!(&rebuilt.shape, &expr.shape);
            prop_assert_eq!(rebuilt.constant, expr.constant);
            prop_assert_eq!(
                rebuilt.value.as_ref().map(Array::to_string),
                expr.value.as_ref().map(Array::to_string)
            );
        }
    }

    #[test]
    fn constant_values_match_static_type_and_shape(tree in node()) {
        let mut seen = Vec::new();
        tree.build(true, &mut seen);
        for expr in &seen {
            prop_assert_eq!(expr.constant, Some(true));
            let value = expr.value.as_ref().unwrap();
            prop_assert_eq!(value.ty(), expr.ty);
            prop_assert_eq!(Some(value.shape()), expr.shape.as_ref());
        }
    }

    #[test]
    fn compiled_assignments_fit_their_targets(tree in node()) {
        let (source, _) = tree.program();
        let (sim, _) = simulate(&source);
        let model = sim.factory().model();

        let mut pairs = Vec::new();
        for action in &model.actions {
            assignments(&action.body, &mut pairs);
        }
        prop_assert!(pairs.len() >= 2);
        for (target, rhs) in &pairs {
            prop_assert_eq!(rhs.ty, target.ty);
            let (lhs, r) = (target.shape.as_ref().unwrap(), rhs.shape.as_ref().unwrap());
            prop_assert!(broadcastable_into(lhs, r), "{} := {}", lhs, r);
        }
        for variable in &model.variables {
            prop_assert_eq!(variable.init.ty(), variable.ty);
            prop_assert_eq!(variable.init.shape(), &variable.shape);
        }
    }

    #[test]
    fn machine_agrees_with_folding(tree in node()) {
        let (source, folded) = tree.program();
        let (first, first_sink) = simulate(&source);
        let (second, second_sink) = simulate(&source);

        let out = first.value("out").unwrap();
        prop_assert_eq!(out.ty(), folded.ty);
        prop_assert_eq!(Some(out.shape()), folded.shape.as_ref());
        prop_assert_eq!(out.to_string(), folded.value.as_ref().unwrap().to_string());

        let mut names = vec!["out".to_string()];
        for t in 0..3 {
            for s in 0..3 {
                names.push(var_name(t, s));
            }
        }
        for name in &names {
            prop_assert_eq!(
                first.value(name).map(Array::to_string),
                second.value(name).map(Array::to_string)
            );
        }
        prop_assert_eq!(first_sink.lines(), second_sink.lines());
    }
}

// =============================================================================
// MACHINE
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn runs_are_deterministic(ticks in 1i64..30, delay in 1i64..5) {
        let source = format!(
            "var int k = 0;\nevent tick();\non Init emit tick() after {d};\n\
             on tick {{ k := k + 1; print now, k; if (k < {n}) emit tick() after {d}; }}",
            d = delay,
            n = ticks
        );
        let (first, first_sink) = run_source(&source, &RunOptions::default());
        let (second, second_sink) = run_source(&source, &RunOptions::default());
        prop_assert!(first.success);
        prop_assert_eq!(first.step_count, ticks as u64 + 1);
        prop_assert_eq!(first.final_now, (ticks * delay) as f64);
        prop_assert_eq!(first.step_count, second.step_count);
        prop_assert_eq!(first_sink.lines(), second_sink.lines());
    }

    #[test]
    fn events_dispatch_in_time_then_emission_order(delays in prop::collection::vec(0i64..10, 1..20)) {
        let emits: Vec<String> = delays
            .iter()
            .enumerate()
            .map(|(i, d)| format!("emit e({}) after {};", i, d))
            .collect();
        let source = format!("event e(int i);\non Init {{ {} }}\non e {{}}", emits.join(" "));
        let (report, sink) = run_source(&source, &bounded());
        prop_assert!(report.success, "{:?}", report.messages);

        let order: Vec<(f64, i64)> = sink
            .dispatches()
            .into_iter()
            .filter(|d| d.event == "main.e")
            .map(|d| (d.time, d.args[0].as_scalar().unwrap().as_i64()))
            .collect();
        let mut expected: Vec<(f64, i64)> = delays
            .iter()
            .enumerate()
            .map(|(i, d)| (*d as f64, i as i64))
            .collect();
        expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        prop_assert_eq!(order, expected);
    }

    #[test]
    fn full_pipeline_never_panics(source in vectorl_like_string()) {
        let _ = run_source(&source, &bounded());
    }
}

// =============================================================================
// REGRESSION TESTS
// =============================================================================

#[test]
fn regression_empty_input() {
    let (report, _) = run_source("", &RunOptions::default());
    assert!(report.success);
    assert_eq!(report.step_count, 1);
}

#[test]
fn regression_only_comments() {
    let (report, _) = run_source("// nothing here\n/* or here */", &RunOptions::default());
    assert!(report.success);
}

#[test]
fn regression_null_bytes() {
    let _ = Scanner::new("var int a = \0;").scan_tokens();
}

#[test]
fn regression_very_long_number() {
    let source = format!("const int x = {};", "9".repeat(200));
    let (report, _) = run_source(&source, &RunOptions::default());
    assert!(!report.success);
}

#[test]
fn regression_self_emitting_event_is_bounded_by_steps() {
    let (report, _) = run_source("event e(); on Init emit e() after 0; on e emit e() after 0;", &bounded());
    assert!(report.success);
    assert_eq!(report.step_count, 200);
    assert_eq!(report.pending_events, 1);
}
