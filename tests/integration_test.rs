// ABOUTME: End-to-end tests against the public Runtime surface

use minilisp::error::ErrorKind;
use minilisp::runtime::Runtime;
use minilisp::value::Value;

fn setup() -> (Runtime, Value) {
    let mut rt = Runtime::new();
    let scope = rt.default_scope();
    (rt, scope)
}

fn eval_ok(rt: &mut Runtime, scope: Value, src: &str) -> Value {
    let form = rt.parse_progn(src).expect("parse");
    rt.eval(scope, form).expect("eval")
}

fn eval_err_kind(rt: &mut Runtime, scope: Value, src: &str) -> ErrorKind {
    let form = rt.parse_progn(src).expect("parse");
    assert!(rt.eval(scope, form).is_none());
    rt.last_error_kind().expect("an error")
}

// ============================================================================
// Scenarios (literal, §8)
// ============================================================================

#[test]
fn scenario_1_nullary_lambda() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_ok(&mut rt, scope, "((lambda () 1))").as_int(), Some(1));
}

#[test]
fn scenario_2_lambda_with_argument() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_ok(&mut rt, scope, "((lambda (x) (+ 1 x)) 1)").as_int(), Some(2));
}

#[test]
fn scenario_3_lambda_missing_params_is_arity_too_few() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_err_kind(&mut rt, scope, "(lambda)"), ErrorKind::ArityTooFew);
}

#[test]
fn scenario_4_non_symbol_param_is_type_error() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_err_kind(&mut rt, scope, "(lambda (x 2) 1)"), ErrorKind::Type);
}

#[test]
fn scenario_5_when_macro_expands_and_reevaluates() {
    let (mut rt, scope) = setup();
    eval_ok(&mut rt, scope, "(define when (macro (c t) `(if ,c ,t '())))");
    assert_eq!(eval_ok(&mut rt, scope, "(when 1 42)").as_int(), Some(42));
    assert_eq!(eval_ok(&mut rt, scope, "(when 0 42)"), rt.nil());
}

#[test]
fn scenario_6_reduce_variants() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_ok(&mut rt, scope, "(reduce + '(1 2 3 4))").as_int(), Some(10));
    assert_eq!(eval_ok(&mut rt, scope, "(reduce + 10 '(1 2 3 4))").as_int(), Some(20));
    assert_eq!(eval_err_kind(&mut rt, scope, "(reduce + '(1))"), ErrorKind::ArityTooFew);
}

#[test]
fn scenario_7_divide_by_zero() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_err_kind(&mut rt, scope, "(/ 1 0)"), ErrorKind::DivideByZero);
}

#[test]
fn scenario_8_map_squares() {
    let (mut rt, scope) = setup();
    let result = eval_ok(&mut rt, scope, "(map (lambda (x) (* x x)) '(1 2 3))");
    assert_eq!(result.to_display_string(rt.nil()), "(1 4 9)");
}

#[test]
fn scenario_9_parses_string_escapes() {
    let (mut rt, scope) = setup();
    let result = eval_ok(&mut rt, scope, r#""hi\nthere""#);
    assert_eq!(result.as_str(), Some("hi\nthere"));
}

#[test]
fn scenario_10_dotted_symbol_rewrites_to_getattr() {
    let mut rt = Runtime::new();
    let form = rt.parse_progn("a.b.c").unwrap();
    assert_eq!(form.to_display_string(rt.nil()), "(progn (getattr (getattr a (quote b)) (quote c)))");
}

// ============================================================================
// Universal invariants (§8)
// ============================================================================

#[test]
fn invariant_mark_sweep_keeps_reachable_values_alive() {
    let (mut rt, scope) = setup();
    eval_ok(&mut rt, scope, "(define lst (cons 1 (cons 2 (cons 3 '()))))");
    rt.mark(scope);
    rt.sweep();
    let result = eval_ok(&mut rt, scope, "lst");
    assert_eq!(result.to_display_string(rt.nil()), "(1 2 3)");
}

#[test]
fn invariant_eq_is_identity_equals_is_value() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_ok(&mut rt, scope, "(eq? 5 5)").as_int(), Some(0));
    assert_eq!(eval_ok(&mut rt, scope, "(== 5 5)").as_int(), Some(1));
}

#[test]
fn invariant_print_parse_round_trips_a_list() {
    let (mut rt, scope) = setup();
    let value = eval_ok(&mut rt, scope, "'(1 2 3)");
    let printed = value.to_display_string(rt.nil());
    let reparsed = eval_ok(&mut rt, scope, &format!("'{printed}"));
    assert_eq!(reparsed.to_display_string(rt.nil()), printed);
}

#[test]
fn invariant_quasiquote_without_unquote_is_identity() {
    let (mut rt, scope) = setup();
    let result = eval_ok(&mut rt, scope, "`(1 2 3)");
    assert_eq!(result.to_display_string(rt.nil()), "(1 2 3)");
}

#[test]
fn invariant_lexical_scope_survives_outer_rebinding() {
    let (mut rt, scope) = setup();
    let make_getter = eval_ok(&mut rt, scope, "((lambda (x) (lambda () x)) 1)");
    eval_ok(&mut rt, scope, "(define x 999)");
    let result = rt.apply(scope, make_getter, rt.nil()).unwrap();
    assert_eq!(result.as_int(), Some(1));
}

// ============================================================================
// Embedder surface: scripts, errors, and the REPL-style mark/sweep cycle
// ============================================================================

#[test]
fn runs_a_multi_form_script_and_returns_the_last_value() {
    let (mut rt, scope) = setup();
    let form = rt.parse_progn("(define x 10) (define y 20) (+ x y)").unwrap();
    assert_eq!(rt.eval(scope, form).unwrap().as_int(), Some(30));
}

#[test]
fn parse_error_is_recoverable_through_the_error_slot() {
    let (mut rt, _scope) = setup();
    assert!(rt.parse_progn("(1 2").is_none());
    assert!(rt.has_error());
    rt.clear_error();
    assert!(!rt.has_error());
}

#[test]
fn undefined_symbol_is_its_own_error_kind() {
    let (mut rt, scope) = setup();
    assert_eq!(eval_err_kind(&mut rt, scope, "never-defined"), ErrorKind::UndefinedSymbol);
}

#[test]
fn repl_style_repeated_mark_and_sweep_keeps_definitions_live() {
    let (mut rt, scope) = setup();
    for (src, expected) in [
        ("(define a 1)", 1),
        ("(define b (+ a 1))", 2),
        ("(define c (+ b 1))", 3),
    ] {
        let result = eval_ok(&mut rt, scope, src);
        assert_eq!(result.as_int(), Some(expected));
        rt.mark(scope);
        rt.sweep();
    }
    assert_eq!(eval_ok(&mut rt, scope, "(+ a b c)").as_int(), Some(6));
}
