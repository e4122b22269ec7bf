use pretty_assertions::assert_eq;
use std::fs;
use tbasic::{Config, Executer, ScriptError, Value};

fn run(source: &str) -> Executer {
    let mut exec = Executer::with_standard_library();
    if let Err(err) = exec.execute(source) {
        panic!("script failed:\n{}", err.report());
    }
    exec
}

fn var(exec: &Executer, name: &str) -> Value {
    exec.global().get_variable(name).unwrap()
}

#[test]
fn if_runs_exactly_one_branch() {
    let source = "\
hits$ = 0
x$ = 0
IF 1 = 1 THEN
  x$ = 1
  hits$ = hits$ + 1
ELSE
  x$ = 2
  hits$ = hits$ + 1
END IF
if x$ = 5 then
  x$ = 3
else
  hits$ = hits$ + 1
end if";
    let exec = run(source);
    assert_eq!(var(&exec, "x$"), Value::Int(1));
    assert_eq!(var(&exec, "hits$"), Value::Int(2));
}

#[test]
fn function_scope_shadows_while_loops_mutate() {
    let source = "\
counter$ = 0
FUNCTION bump()
  counter$ = 100
  return counter$
END FUNCTION
WHILE counter$ < 3
  counter$ = counter$ + 1
WEND
r$ = bump()";
    let exec = run(source);
    assert_eq!(var(&exec, "counter$"), Value::Int(3));
    assert_eq!(var(&exec, "r$"), Value::Int(100));
}

#[test]
fn constants_cannot_change_from_nested_scopes() {
    let source = "\
CONST @max = 5
FUNCTION f()
  IF TRUE THEN
    LET @max = 6
  END IF
END FUNCTION
f()";
    let mut exec = Executer::new();
    let err = exec.execute(source).unwrap_err();
    assert!(matches!(err.root(), ScriptError::ConstantChange(_)));
    assert_eq!(err.line(), Some(7));
    assert_eq!(var(&exec, "@max"), Value::Int(5));
}

#[test]
fn functions_return_values_and_recurse() {
    let source = "\
FUNCTION fact(n$)
  IF n$ <= 1 THEN
    return 1
  END IF
  return n$ * fact(n$ - 1)
END FUNCTION
FUNCTION last()
  5 + 5
END FUNCTION
a$ = fact(10)
b$ = last()";
    let exec = run(source);
    assert_eq!(var(&exec, "a$"), Value::Int(3628800));
    assert_eq!(var(&exec, "b$"), Value::Int(10));
}

#[test]
fn functions_can_be_called_before_their_declaration() {
    let exec = run("r$ = twice(4)\nFUNCTION twice(x$)\nreturn x$ * 2\nEND FUNCTION");
    assert_eq!(var(&exec, "r$"), Value::Int(8));
}

#[test]
fn return_inside_loops_unwinds_the_function() {
    let source = "\
FUNCTION find(limit$)
  i$ = 0
  WHILE TRUE
    i$ = i$ + 1
    IF i$ >= limit$ THEN
      return i$ * 10
    END IF
  WEND
  return -1
END FUNCTION
r$ = find(4)
after$ = 1";
    let exec = run(source);
    assert_eq!(var(&exec, "r$"), Value::Int(40));
    assert_eq!(var(&exec, "after$"), Value::Int(1));
    assert!(!exec.break_requested());
}

#[test]
fn do_until_matches_do_while_not() {
    let source = "\
a$ = 0
DO UNTIL a$ >= 5
  a$ = a$ + 1
LOOP
b$ = 0
DO WHILE NOT (b$ >= 5)
  b$ = b$ + 1
LOOP
c$ = 10
DO WHILE c$ < 5
  c$ = c$ + 1
LOOP";
    let exec = run(source);
    assert_eq!(var(&exec, "a$"), Value::Int(5));
    assert_eq!(var(&exec, "b$"), Value::Int(5));
    assert_eq!(var(&exec, "c$"), Value::Int(11));
}

#[test]
fn break_leaves_only_the_innermost_loop() {
    let source = "\
count$ = 0
FOR i$ = 1 TO 3
  FOR j$ = 1 TO 3
    IF j$ = 2 THEN
      BREAK
    END IF
    count$ = count$ + 1
  NEXT
NEXT";
    let exec = run(source);
    assert_eq!(var(&exec, "count$"), Value::Int(3));
}

#[test]
fn for_loops_count_both_ways() {
    let source = "\
total$ = 0
FOR i$ = 1 TO 10
  total$ = total$ + i$
NEXT
seen$ = \"\"
FOR k$ = 10 TO 1 STEP -3
  seen$ = seen$ + Str(k$) + \",\"
NEXT";
    let exec = run(source);
    assert_eq!(var(&exec, "total$"), Value::Int(55));
    assert_eq!(var(&exec, "seen$"), Value::from("10,7,4,1,"));
    assert!(exec.global().get_variable("i$").is_err());
}

#[test]
fn zero_step_is_rejected() {
    let mut exec = Executer::new();
    let err = exec.execute("FOR i$ = 1 TO 2 STEP 0\nNEXT").unwrap_err();
    assert!(matches!(err.root(), ScriptError::Argument(_)));
}

#[test]
fn unterminated_block_reports_its_header_line() {
    let mut exec = Executer::new();
    let err = exec.execute("x$ = 1\n\nIF x$ = 1 THEN\ny$ = 2").unwrap_err();
    assert!(matches!(err.root(), ScriptError::UnterminatedBlock { line: 3, .. }));
    assert_eq!(err.line(), Some(3));
}

#[test]
fn select_prefers_the_later_duplicate_case() {
    let source = "\
r$ = \"\"
d$ = \"\"
SELECT 2
CASE 1
  r$ = \"one\"
CASE 2
  r$ = \"first two\"
CASE 1 + 1
  r$ = \"second two\"
DEFAULT
  r$ = \"other\"
END SELECT
SELECT \"z\"
CASE \"a\"
  d$ = \"a\"
DEFAULT
  d$ = \"fallback\"
END SELECT";
    let exec = run(source);
    assert_eq!(var(&exec, "r$"), Value::from("second two"));
    assert_eq!(var(&exec, "d$"), Value::from("fallback"));
}

#[test]
fn multi_dimensional_arrays() {
    let source = "\
DIM grid$[2, 3]
grid$[1, 2] = 5
v$ = grid$[1, 2] + 1
rows$ = Len(grid$)
cols$ = Len(grid$[0])";
    let exec = run(source);
    assert_eq!(var(&exec, "v$"), Value::Int(6));
    assert_eq!(var(&exec, "rows$"), Value::Int(2));
    assert_eq!(var(&exec, "cols$"), Value::Int(3));
}

#[test]
fn element_assignment_out_of_range_fails() {
    let mut exec = Executer::new();
    let err = exec.execute("DIM a$[2]\na$[2] = 1").unwrap_err();
    assert!(matches!(err.root(), ScriptError::IndexOutOfRange { index: 2, .. }));
}

#[test]
fn include_loads_functions_and_statements() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("helpers.tbs"),
        "FUNCTION twice(x$)\nreturn x$ * 2\nEND FUNCTION\nloaded$ = TRUE",
    )
    .unwrap();

    let config = Config {
        include_paths: vec![dir.path().to_path_buf()],
        ..Config::default()
    };
    let mut exec = Executer::with_config(config);
    exec.execute("#include \"helpers.tbs\"\nr$ = twice(21)").unwrap();
    assert_eq!(var(&exec, "r$"), Value::Int(42));
    assert_eq!(var(&exec, "loaded$"), Value::Bool(true));

    let err = exec.execute("#include missing.tbs").unwrap_err();
    assert!(matches!(err.root(), ScriptError::Io(_)));
}

#[test]
fn runaway_recursion_hits_the_call_limit() {
    let config = Config {
        max_call_depth: 16,
        ..Config::default()
    };
    let mut exec = Executer::with_config(config);
    let err = exec
        .execute("FUNCTION f(n$)\nreturn f(n$ + 1)\nEND FUNCTION\nf(0)")
        .unwrap_err();
    assert!(matches!(err.root(), ScriptError::RecursionLimit(16)));
}

#[test]
fn exit_inside_a_function_stops_the_script() {
    let source = "\
FUNCTION stop()
  EXIT
END FUNCTION
a$ = 1
stop()
a$ = 2";
    let mut exec = Executer::new();
    exec.execute(source).unwrap();
    assert_eq!(var(&exec, "a$"), Value::Int(1));
    assert!(exec.exit_requested());
}

#[test]
fn names_are_case_insensitive() {
    let exec = run("Total$ = 1\nTOTAL$ = total$ + 1\nr$ = strupper(\"ok\")");
    assert_eq!(var(&exec, "total$"), Value::Int(2));
    assert_eq!(var(&exec, "r$"), Value::from("OK"));
}

#[test]
fn standard_library_functions_compose() {
    let exec = run("s$ = StrUpper(\"abc\") + Str(Len(\"xy\"))\nparts$ = StrSplit(\"a b c\", \" \")\nn$ = Size(parts$)");
    assert_eq!(var(&exec, "s$"), Value::from("ABC2"));
    assert_eq!(var(&exec, "n$"), Value::Int(3));
}

#[test]
fn continuation_lines_keep_the_first_line_number() {
    let mut exec = Executer::new();
    let err = exec.execute("x$ = 1 + _\n  2 / 0\ny$ = 1").unwrap_err();
    assert_eq!(err.line(), Some(1));
    assert!(matches!(err.root(), ScriptError::DivideByZero));
}

#[test]
fn inequality_operators_negate_their_equalities() {
    let source = "\
loose$ = \"ABC\" = \"abc\"
loose_ne$ = \"ABC\" <> \"abc\"
strict$ = \"ABC\" == \"abc\"
strict_ne$ = \"ABC\" != \"abc\"
differ$ = \"ABC\" <> \"abd\"";
    let exec = run(source);
    assert_eq!(var(&exec, "loose$"), Value::Bool(true));
    assert_eq!(var(&exec, "loose_ne$"), Value::Bool(false));
    assert_eq!(var(&exec, "strict$"), Value::Bool(false));
    assert_eq!(var(&exec, "strict_ne$"), Value::Bool(true));
    assert_eq!(var(&exec, "differ$"), Value::Bool(true));
}

#[test]
fn recursion_near_the_default_limit_fits_on_a_small_thread() {
    let depth = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let exec = run("\
FUNCTION down(n$)
  IF n$ <= 0 THEN
    return 0
  END IF
  return 1 + down(n$ - 1)
END FUNCTION
r$ = down(250)");
            var(&exec, "r$")
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(depth, Value::Int(250));
}
