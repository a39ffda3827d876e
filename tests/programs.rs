use loxwalk::interpreter::Interpreter;
use loxwalk::value::Value;
use loxwalk::LoxError;
use pretty_assertions::assert_eq;

fn run(source: &str) -> (String, Result<Option<Value>, Vec<String>>) {
    let mut interpreter = Interpreter::with_output(Vec::new());
    let result = loxwalk::run(source, &mut interpreter)
        .map_err(|errors| errors.iter().map(|e| e.to_string()).collect());
    let output = String::from_utf8(interpreter.into_output()).unwrap();
    (output, result)
}

#[test]
fn bank_account() {
    let source = r#"
        class Account {
            init(owner) {
                this.owner = owner;
                this.balance = 0;
            }
            deposit(amount) {
                this.balance = this.balance + amount;
                return this;
            }
            report() {
                print this.owner + " has " + "money";
                print this.balance;
            }
        }

        class Savings < Account {
            init(owner, rate) {
                super.init(owner);
                this.rate = rate;
            }
            accrue() {
                return this.deposit(this.balance * this.rate);
            }
        }

        var s = Savings("ada", 0.5);
        s.deposit(10).deposit(10);
        s.accrue();
        s.report();
    "#;
    let (output, result) = run(source);
    assert_eq!(result, Ok(Some(Value::Nil)));
    assert_eq!(output, "ada has money\n30\n");
}

#[test]
fn closures_make_independent_counters() {
    let source = r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                return i;
            }
            return count;
        }
        var a = makeCounter();
        var b = makeCounter();
        print a();
        print a();
        print b();
        a() + b()
    "#;
    let (output, result) = run(source);
    assert_eq!(output, "1\n2\n1\n");
    assert_eq!(result, Ok(Some(Value::Number(5.0))));
}

#[test]
fn every_syntax_error_is_reported() {
    let source = "var = 1;\nprint (2;\nfun f( {}\nprint 3;";
    let (output, result) = run(source);
    assert_eq!(output, "");
    assert_eq!(
        result,
        Err(vec![
            "error: [line 1] at '=': Expect variable name.".to_string(),
            "error: [line 2] at ';': Expect ')' after expression.".to_string(),
            "error: [line 3] at '{': Expect parameter name.".to_string(),
        ])
    );
}

#[test]
fn scan_errors_come_before_syntax_errors() {
    let (_, result) = run("print #;");
    assert_eq!(
        result,
        Err(vec![
            "error: [line 1] Unexpected character '#'.".to_string(),
            "error: [line 1] at ';': Expect expression.".to_string(),
        ])
    );
}

#[test]
fn runtime_error_stops_the_program() {
    let source = "print 1;\nprint nope;\nprint 3;";
    let (output, result) = run(source);
    assert_eq!(output, "1\n");
    assert_eq!(
        result,
        Err(vec!["[line 2] NameError: Undefined variable 'nope'.".to_string()])
    );
}

#[test]
fn runtime_errors_are_tagged_as_runtime() {
    let mut interpreter = Interpreter::with_output(Vec::new());
    let errors = loxwalk::run("nil();", &mut interpreter).unwrap_err();
    assert!(errors.iter().all(LoxError::is_runtime));
    let errors = loxwalk::run("nil(;", &mut interpreter).unwrap_err();
    assert!(!errors.iter().any(LoxError::is_runtime));
}

#[test]
fn parse_source_feeds_the_printer() {
    let (statements, errors) = loxwalk::parse_source("var x = -1 * (2 + y);");
    assert!(errors.is_empty());
    assert_eq!(
        loxwalk::printer::AstPrinter::new().print_program(&statements),
        "(var x (* (- 1) (group (+ 2 y))))"
    );
}
