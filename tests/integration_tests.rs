use jitcc::codegen::Options;
use jitcc::engine::{OptLevel, RunValue};
use jitcc::error::{CodegenError, EngineError, Error, LexError, ParseError};

fn run(input: &str) -> RunValue {
    jitcc::run(input).unwrap()
}

fn run_int(input: &str) -> i64 {
    match run(input) {
        RunValue::Int(n) => n,
        other => panic!("expected an integer, got {other:?}"),
    }
}

fn wrap_in_main(input: &str) -> String {
    format!("int main() {{{}}}", input)
}

fn codegen_error(input: &str) -> CodegenError {
    match jitcc::run(input) {
        Err(Error::Codegen(e)) => e,
        other => panic!("expected a codegen error, got {other:?}"),
    }
}

#[test]
fn return_literal() {
    for n in [0, 1, 42, 255, 1 << 40, i64::MAX] {
        assert_eq!(run_int(&wrap_in_main(&format!("return {n};"))), n);
    }
}

#[test]
fn modulo_is_truncated_remainder() {
    for (a, b) in [(7, 3), (-7, 3), (7, -3), (-7, -3), (3, 7), (100, 10)] {
        let input = wrap_in_main(&format!("int a = {a}; int b = {b}; return a % b;"));
        assert_eq!(run_int(&input), a % b, "{a} % {b}");
    }
    assert_eq!(run_int(&wrap_in_main("int z = 0; return 5 % z;")), 0);
}

#[test]
fn modulo_in_several_functions_shares_one_import() {
    let input = "
        int odd(int n) { return n % 2; }
        int last_digit(int n) { return n % 10; }
        int main() { return odd(7) * 100 + last_digit(-42) + 17 % 5; }
    ";
    assert_eq!(run_int(input), 100 - 2 + 2);
}

#[test]
fn integer_division_never_traps() {
    assert_eq!(run_int(&wrap_in_main("int a = -7; int b = 2; return a / b;")), -3);
    assert_eq!(run_int(&wrap_in_main("int z = 0; return 7 / z;")), 0);
    assert_eq!(
        run_int(&wrap_in_main(
            "int a = -9223372036854775807 - 1; int b = -1; return a / b;"
        )),
        0
    );
    assert_eq!(run_int("int g = 1 / 0; int main() { return g + 5; }"), 5);
}

#[test]
fn runtime_symbol_names_are_reserved() {
    assert_eq!(
        codegen_error("int mod(int a, int b) { return 42; } int main() { return 7 % 3; }"),
        CodegenError::ReservedName("mod".to_string())
    );
    assert_eq!(
        codegen_error("int main() { return 7 % 3; } int mod(int a, int b) { return 42; }"),
        CodegenError::ReservedName("mod".to_string())
    );
    assert_eq!(
        codegen_error("int mod = 1; int main() { return 7 % 3; }"),
        CodegenError::ReservedName("mod".to_string())
    );
    assert_eq!(run_int(&wrap_in_main("int mod = 7; return mod % 3;")), 1);
}

#[test]
fn unary_operators_on_floats() {
    assert_eq!(
        run("float main() { float x = 2.5; return -x; }"),
        RunValue::Float(-2.5)
    );
    assert_eq!(
        run_int(&wrap_in_main("float x = 0.0; float y = 0.5; return !x + !y * 10;")),
        1
    );
}

#[test]
fn logical_operators_evaluate_both_sides() {
    let input = "
        int calls;
        int a() { calls = calls + 1; return 0; }
        int b() { calls = calls + 10; return 1; }
        int main() {
            int r = a() && b();
            r = r + (b() || a()) * 100;
            return calls + r;
        }
    ";
    assert_eq!(run_int(input), 22 + 100);
}

#[test]
fn comparisons_yield_zero_or_one() {
    assert_eq!(run_int(&wrap_in_main("return (3 > 2) + (2 >= 3) + !0 + !5;")), 2);
    assert_eq!(run_int(&wrap_in_main("return (-1 < 1) + (1 == 1.0) + (2 != 2);")), 2);
}

#[test]
fn if_without_else() {
    assert_eq!(run_int(&wrap_in_main("int x = 1; if (0) x = 2; return x;")), 1);
    assert_eq!(run_int(&wrap_in_main("int x = 1; if (x) x = 2; return x;")), 2);
}

#[test]
fn if_else() {
    let input = "int pick(int c) { if (c) { return 10; } else { return 20; } }
                 int main() { return pick(1) + pick(0); }";
    assert_eq!(run_int(input), 30);
}

#[test]
fn while_with_false_condition_never_runs() {
    assert_eq!(
        run_int(&wrap_in_main("int n = 0; while (n > 5) n = n + 1; return n;")),
        0
    );
    assert_eq!(
        run_int(&wrap_in_main("int n = 0; while (n < 5) n = n + 1; return n;")),
        5
    );
}

#[test]
fn break_and_continue() {
    let input = wrap_in_main(
        "int i = 0; int s = 0;
         while (1) {
             i = i + 1;
             if (i > 10) break;
             if (i % 2 == 0) continue;
             s = s + i;
         }
         return s;",
    );
    assert_eq!(run_int(&input), 25);

    let nested = wrap_in_main(
        "int i = 0; int n = 0;
         while (i < 3) {
             int j = 0;
             while (1) { j = j + 1; if (j == 4) break; n = n + 1; }
             i = i + 1;
         }
         return n;",
    );
    assert_eq!(run_int(&nested), 9);
}

#[test]
fn globals() {
    assert_eq!(run_int("int x = 5; int main() { x = x + 3; return x; }"), 8);
    assert_eq!(run_int("int x; int main() { return x; }"), 0);
    assert_eq!(
        run_int(
            "int g = 1 + 2 * 3; float h = -1; const int k = 7 % 3;
             int main() { return g + h + k; }"
        ),
        7
    );
}

#[test]
fn floats() {
    assert_eq!(
        run("float main() { float x = 1.5; return x * 2 + 0.25; }"),
        RunValue::Float(3.25)
    );
    assert_eq!(run_int(&wrap_in_main("int a = 7.9; return a;")), 7);
    assert_eq!(
        run("float half(float x) { return x / 2; } float main() { return half(3); }"),
        RunValue::Float(1.5)
    );
}

#[test]
fn recursion() {
    let input = "
        int fib(int n) {
            if (n < 2) { return n; } else { return fib(n - 1) + fib(n - 2); }
        }
        int main() { return fib(15); }
    ";
    assert_eq!(run_int(input), 610);

    let options = Options {
        opt_level: OptLevel::Speed,
        ..Options::default()
    };
    let mut program = jitcc::compile(input, &options).unwrap();
    assert_eq!(program.run(), Ok(RunValue::Int(610)));
}

#[test]
fn last_executed_return_wins() {
    assert_eq!(run_int(&wrap_in_main("return 1; return 2;")), 2);
    assert_eq!(run_int(&wrap_in_main("return 1; if (0) return 2;")), 1);
}

#[test]
fn locals_share_one_scope_per_function() {
    assert_eq!(run_int(&wrap_in_main("{ int a = 3; } return a;")), 3);
    assert_eq!(run_int(&wrap_in_main("int a = 1; int a = 2; return a;")), 2);
}

#[test]
fn void_functions() {
    assert_eq!(run("void main() { }"), RunValue::Void);
    let input = "
        int count;
        void bump() { count = count + 1; return; }
        int main() { bump(); bump(); return bump() + count; }
    ";
    assert_eq!(run_int(input), 3);
}

#[test]
fn printed_program_compiles_to_same_result() {
    let input = "int g = 2; int main() { int i = 0; while (i < 10) { i = i + g; } return i * g; }";
    let printed = jitcc::parse(input).unwrap().to_string();
    assert_eq!(run_int(&printed), run_int(input));
}

#[test]
fn codegen_errors() {
    assert_eq!(
        codegen_error(&wrap_in_main("return y;")),
        CodegenError::UndeclaredIdentifier("y".to_string())
    );
    assert_eq!(
        codegen_error("int main() { return f(); } int f() { return 1; }"),
        CodegenError::UndeclaredFunction("f".to_string())
    );
    assert_eq!(
        codegen_error("int main() { return 0; } int main() { return 1; }"),
        CodegenError::DuplicateEntryPoint("main".to_string())
    );
    assert_eq!(
        codegen_error("int main() { int a = 1; }"),
        CodegenError::MissingReturnValue("main".to_string())
    );
    assert_eq!(
        codegen_error("int a = 1; int b = a + 1; int main() { return b; }"),
        CodegenError::UnsupportedGlobalInitializer("b".to_string())
    );
    assert_eq!(
        codegen_error("const int k = 1; int main() { k = 2; return k; }"),
        CodegenError::ConstantAssignment("k".to_string())
    );
    assert_eq!(
        codegen_error(&wrap_in_main("break; return 0;")),
        CodegenError::LoopControlOutsideLoop("break")
    );
    assert_eq!(
        codegen_error(&wrap_in_main("if (1) continue; return 0;")),
        CodegenError::LoopControlOutsideLoop("continue")
    );
    assert_eq!(
        codegen_error("int f() { return 1; } int main() { return f() + y; }"),
        CodegenError::UndeclaredIdentifier("y".to_string())
    );
    assert_eq!(
        codegen_error("int f(int a) { return a; } int main() { return f(1, 2); }"),
        CodegenError::ArityMismatch {
            name: "f".to_string(),
            expected: 1,
            found: 2,
        }
    );
}

#[test]
fn missing_entry_point() {
    assert_eq!(
        jitcc::run("int f() { return 1; }"),
        Err(Error::Engine(EngineError::MissingEntryPoint("main".to_string())))
    );

    let options = Options {
        entry: "start".to_string(),
        ..Options::default()
    };
    let mut program = jitcc::compile("int start() { return 9; }", &options).unwrap();
    assert_eq!(program.run(), Ok(RunValue::Int(9)));
}

#[test]
fn front_end_errors() {
    assert_eq!(
        jitcc::run("int main() { return 1 @ 2; }"),
        Err(Error::Lex(LexError::UnexpectedChar { ch: '@', line: 1 }))
    );
    assert!(matches!(
        jitcc::run("int main() {\n return (1; }"),
        Err(Error::Parse(ParseError::UnexpectedToken { line: 2, .. }))
    ));
}
