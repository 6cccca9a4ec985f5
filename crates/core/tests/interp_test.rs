use graver_core::{Error, Interpreter, NullDevice, PsError, PsObject};

fn interp() -> Interpreter {
    Interpreter::new(Box::new(NullDevice)).expect("interpreter setup")
}

fn run(source: &str) -> Interpreter {
    let mut interp = interp();
    interp.run_source(source.as_bytes()).expect("program runs");
    interp
}

fn run_err(source: &str) -> PsError {
    let mut interp = interp();
    match interp.run_source(source.as_bytes()) {
        Err(Error::Ps(e)) => e,
        Err(other) => panic!("expected language error, got {other:?}"),
        Ok(()) => panic!("expected error running {source:?}"),
    }
}

fn pop_int(interp: &mut Interpreter) -> i64 {
    interp.op_stack.pop_int().expect("integer on stack")
}

fn pop_real(interp: &mut Interpreter) -> f64 {
    interp.op_stack.pop_real().expect("number on stack")
}

fn pop_bool(interp: &mut Interpreter) -> bool {
    interp.op_stack.pop_bool().expect("boolean on stack")
}

#[test]
fn integer_arithmetic_stays_integral() {
    let mut i = run("1 2 add 4 mul");
    assert_eq!(i.op_stack.pop().unwrap(), PsObject::Integer(12));
}

#[test]
fn mixed_arithmetic_promotes_to_real() {
    let mut i = run("1 2.0 add");
    assert_eq!(i.op_stack.pop().unwrap(), PsObject::Real(3.0));
}

#[test]
fn division_family() {
    let mut i = run("7 2 idiv 7 3 mod 1 2 div");
    assert!((pop_real(&mut i) - 0.5).abs() < 1e-12);
    assert_eq!(pop_int(&mut i), 1);
    assert_eq!(pop_int(&mut i), 3);
}

#[test]
fn division_by_zero_is_undefinedresult() {
    assert_eq!(run_err("1 0 div"), PsError::UndefinedResult);
    assert_eq!(run_err("1 0 idiv"), PsError::UndefinedResult);
}

#[test]
fn stack_manipulation() {
    let mut i = run("1 2 3 exch");
    assert_eq!(pop_int(&mut i), 2);
    assert_eq!(pop_int(&mut i), 3);
    assert_eq!(pop_int(&mut i), 1);

    let mut i = run("1 2 2 copy");
    assert_eq!(i.op_stack.len(), 4);
    assert_eq!(pop_int(&mut i), 2);
    assert_eq!(pop_int(&mut i), 1);

    let mut i = run("10 20 30 2 index");
    assert_eq!(pop_int(&mut i), 10);

    let mut i = run("1 2 3 3 1 roll");
    assert_eq!(pop_int(&mut i), 2);
    assert_eq!(pop_int(&mut i), 1);
    assert_eq!(pop_int(&mut i), 3);
}

#[test]
fn def_and_lookup() {
    let mut i = run("/x 42 def x");
    assert_eq!(pop_int(&mut i), 42);
}

#[test]
fn begin_end_scoping() {
    let mut i = run("/x 1 def 2 dict begin /x 2 def x end x");
    assert_eq!(pop_int(&mut i), 1);
    assert_eq!(pop_int(&mut i), 2);
}

#[test]
fn store_replaces_innermost_binding() {
    let mut i = run("/x 1 def 2 dict begin /x 2 store x end x");
    // store found the binding in userdict and replaced it there.
    assert_eq!(pop_int(&mut i), 2);
    assert_eq!(pop_int(&mut i), 2);
}

#[test]
fn where_and_known() {
    let mut i = run("/x 1 def /x where");
    assert!(pop_bool(&mut i));
    let mut i = run("/nodef where");
    assert!(!pop_bool(&mut i));
    let mut i = run("2 dict dup /k 1 put /k known");
    assert!(pop_bool(&mut i));
}

#[test]
fn procedures_defer_then_execute() {
    let mut i = run("/double {2 mul} def 5 double");
    assert_eq!(pop_int(&mut i), 10);
}

#[test]
fn exec_runs_a_procedure() {
    let mut i = run("{1 2 add} exec");
    assert_eq!(pop_int(&mut i), 3);
}

#[test]
fn if_and_ifelse() {
    let mut i = run("true {1} if false {2} if 3");
    assert_eq!(pop_int(&mut i), 3);
    assert_eq!(pop_int(&mut i), 1);

    let mut i = run("false {1} {2} ifelse");
    assert_eq!(pop_int(&mut i), 2);
}

#[test]
fn for_loop_accumulates() {
    let mut i = run("0 1 1 10 {add} for");
    assert_eq!(pop_int(&mut i), 55);
}

#[test]
fn for_loop_with_negative_increment() {
    let mut i = run("0 10 -1 1 {add} for");
    assert_eq!(pop_int(&mut i), 55);
}

#[test]
fn for_loop_keeps_real_control_values() {
    let mut i = run("0 0.0 0.5 1.0 {add} for");
    // 0 + 0.0 + 0.5 + 1.0
    assert!((pop_real(&mut i) - 1.5).abs() < 1e-12);
}

#[test]
fn repeat_runs_exactly_n_times() {
    let mut i = run("0 10 {1 add} repeat");
    assert_eq!(pop_int(&mut i), 10);

    let mut i = run("0 0 {1 add} repeat");
    assert_eq!(pop_int(&mut i), 0);
}

#[test]
fn loop_runs_until_exit() {
    let mut i = run("/i 0 def { /i i 1 add def i 5 eq {exit} if } loop i");
    assert_eq!(pop_int(&mut i), 5);
}

#[test]
fn exit_unwinds_only_the_innermost_loop() {
    let mut i = run("0 1 1 3 { pop 1 1 5 { 2 eq {exit} if } for 1 add } for");
    assert_eq!(pop_int(&mut i), 3);
}

#[test]
fn exit_outside_a_loop_is_invalidexit() {
    assert_eq!(run_err("exit"), PsError::InvalidExit);
}

#[test]
fn forall_over_arrays_and_strings() {
    let mut i = run("0 [1 2 3] {add} forall");
    assert_eq!(pop_int(&mut i), 6);

    let mut i = run("0 (abc) {add} forall");
    assert_eq!(pop_int(&mut i), 97 + 98 + 99);
}

#[test]
fn quit_discards_pending_execution() {
    let mut i = run("1 quit 2");
    assert_eq!(i.op_stack.len(), 1);
    assert_eq!(pop_int(&mut i), 1);
}

#[test]
fn relational_delegation_matches_primitives() {
    // ne == eq not, lt == ge not, le == gt not, across type mixes.
    let cases = [
        ("1 2", "1 2"),
        ("2 1", "2 1"),
        ("1 1.0", "1 1.0"),
        ("2.5 2.5", "2.5 2.5"),
        ("(abc) (abd)", "(abc) (abd)"),
        ("(b) (a)", "(b) (a)"),
        ("(same) (same)", "(same) (same)"),
    ];
    for (left, right) in cases {
        let mut i = run(&format!(
            "{left} ne {left} eq not {right} lt {right} ge not {right} le {right} gt not"
        ));
        let gt_not = pop_bool(&mut i);
        let le = pop_bool(&mut i);
        let ge_not = pop_bool(&mut i);
        let lt = pop_bool(&mut i);
        let eq_not = pop_bool(&mut i);
        let ne = pop_bool(&mut i);
        assert_eq!(ne, eq_not, "ne vs eq-not for {left}");
        assert_eq!(lt, ge_not, "lt vs ge-not for {right}");
        assert_eq!(le, gt_not, "le vs gt-not for {right}");
    }
}

#[test]
fn eq_compares_names_and_strings_by_text() {
    let mut i = run("/abc (abc) eq");
    assert!(pop_bool(&mut i));
    let mut i = run("1 1.0 eq");
    assert!(pop_bool(&mut i));
    // Two separately allocated arrays are not identical.
    let mut i = run("[1] [1] eq");
    assert!(!pop_bool(&mut i));
    // The same array is.
    let mut i = run("[1] dup eq");
    assert!(pop_bool(&mut i));
}

#[test]
fn boolean_and_bitwise_operators() {
    let mut i = run("true false or 12 10 and 1 3 bitshift");
    assert_eq!(pop_int(&mut i), 8);
    assert_eq!(pop_int(&mut i), 8);
    assert!(pop_bool(&mut i));
}

#[test]
fn array_literals_and_access() {
    let mut i = run("[1 2 3] length");
    assert_eq!(pop_int(&mut i), 3);

    let mut i = run("[10 20 30] 1 get");
    assert_eq!(pop_int(&mut i), 20);

    let mut i = run("3 array dup 0 7 put 0 get");
    assert_eq!(pop_int(&mut i), 7);
}

#[test]
fn dict_literals_and_access() {
    let mut i = run("<< /a 1 /b 2 >> length");
    assert_eq!(pop_int(&mut i), 2);

    let mut i = run("<< /a 1 >> /a get");
    assert_eq!(pop_int(&mut i), 1);
}

#[test]
fn string_access_and_intervals() {
    let mut i = run("(hello) length (hello) 1 get");
    assert_eq!(pop_int(&mut i), 101);
    assert_eq!(pop_int(&mut i), 5);

    let mut i = run("(hello) 1 3 getinterval (ell) eq");
    assert!(pop_bool(&mut i));

    let mut i = run("(hello) dup 1 (EL) putinterval 1 get");
    assert_eq!(pop_int(&mut i), i64::from(b'E'));
}

#[test]
fn getinterval_views_alias_storage() {
    let mut i = run("(hello) dup 1 3 getinterval 0 88 put 1 get");
    assert_eq!(pop_int(&mut i), i64::from(b'X'));
}

#[test]
fn counttomark_and_cleartomark() {
    let mut i = run("mark 1 2 3 counttomark");
    assert_eq!(pop_int(&mut i), 3);

    let mut i = run("9 mark 1 2 cleartomark");
    assert_eq!(i.op_stack.len(), 1);
    assert_eq!(pop_int(&mut i), 9);
}

#[test]
fn type_operator_reports_canonical_names() {
    for (value, expected) in [
        ("42", "integertype"),
        ("4.5", "realtype"),
        ("true", "booleantype"),
        ("(s)", "stringtype"),
        ("/n", "nametype"),
        ("[1]", "arraytype"),
        ("1 dict", "dicttype"),
        ("null", "nulltype"),
        ("mark", "marktype"),
    ] {
        let mut i = run(&format!("{value} type /{expected} eq"));
        assert!(pop_bool(&mut i), "type of {value}");
    }
}

#[test]
fn cvx_xcheck_and_cvlit() {
    let mut i = run("/foo cvx xcheck");
    assert!(pop_bool(&mut i));
    let mut i = run("/foo xcheck");
    assert!(!pop_bool(&mut i));
    let mut i = run("{1} cvlit xcheck");
    assert!(!pop_bool(&mut i));
}

#[test]
fn bind_resolves_operator_names() {
    let mut i = run("{add} bind 0 get type /operatortype eq");
    assert!(pop_bool(&mut i));
}

#[test]
fn readonly_blocks_writes() {
    assert_eq!(run_err("[1 2] readonly 0 9 put"), PsError::InvalidAccess);
    let mut i = run("[1 2] readonly wcheck");
    assert!(!pop_bool(&mut i));
}

#[test]
fn undefined_name_reports_which_name() {
    assert_eq!(
        run_err("nosuchoperator"),
        PsError::Undefined("nosuchoperator".into())
    );
}

#[test]
fn recognized_unsupported_features_are_unregistered() {
    for op in ["image", "imagemask", "shfill", "setpattern"] {
        match run_err(op) {
            PsError::Unregistered(_) => {}
            other => panic!("{op} should be unregistered, got {other:?}"),
        }
    }
}

#[test]
fn stack_underflow_is_a_language_error() {
    assert_eq!(run_err("add"), PsError::StackUnderflow);
    assert_eq!(run_err("pop"), PsError::StackUnderflow);
}

#[test]
fn save_restore_rolls_back_vm_mutations() {
    let mut i = run(
        "/a [1 2 3] def \
         a 0 99 put \
         save \
         a 1 88 put \
         restore \
         a 0 get a 1 get",
    );
    // The mutation after save is rolled back; the one before survives.
    assert_eq!(pop_int(&mut i), 2);
    assert_eq!(pop_int(&mut i), 99);
}

#[test]
fn restoring_a_stale_save_is_invalidrestore() {
    assert_eq!(run_err("save dup restore restore"), PsError::InvalidRestore);
}

#[test]
fn vmstatus_reports_nesting_level() {
    let mut i = run("vmstatus pop pop save pop vmstatus pop pop");
    assert_eq!(pop_int(&mut i), 1);
    assert_eq!(pop_int(&mut i), 0);
}

#[test]
fn executable_array_encountered_directly_is_data() {
    // A top-level procedure literal lands on the operand stack.
    let mut i = run("{1 2 add}");
    assert_eq!(i.op_stack.len(), 1);
    let top = i.op_stack.pop().unwrap();
    assert!(matches!(top, PsObject::Array(r) if !r.literal));
}

#[test]
fn print_operators_write_to_the_sink() {
    // `=` and `==` consume their operand even when output is discarded.
    let mut i = run("1 2 = =");
    assert!(i.op_stack.is_empty());
}
