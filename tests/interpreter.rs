#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use rox::session::Session;

    /// A session whose printed lines land in the returned buffer.
    fn capturing_session() -> (Session, Rc<RefCell<Vec<String>>>) {
        let lines: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&lines);

        let session = Session::with_output(move |line: &str| sink.borrow_mut().push(line.to_string()));

        (session, lines)
    }

    /// Run a program; printed output joined by newlines, or the error text.
    fn run(source: &str) -> String {
        let (mut session, lines) = capturing_session();

        let result = session.run(source);
        let output = lines.borrow().join("\n");

        match result {
            Ok(()) => output,
            Err(errors) => errors
                .iter()
                .map(|e| e.message().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Evaluate a single expression the same way.
    fn evaluate(source: &str) -> String {
        let (mut session, lines) = capturing_session();

        let result = session.evaluate(source);
        let output = lines.borrow().join("\n");

        match result {
            Ok(()) => output,
            Err(errors) => errors
                .iter()
                .map(|e| e.message().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    // ── expressions ─────────────────────────────────────────────────────────

    #[test]
    fn test_ternary() {
        assert_eq!(evaluate("1 ? 2 : 3"), "2");
        assert_eq!(evaluate("nil ? 2 : 3"), "3");
    }

    #[test]
    fn test_comma_returns_rightmost_operand() {
        assert_eq!(evaluate("1, 2, 3"), "3");
        // nil results are not echoed
        assert_eq!(evaluate("1, 2, 3, nil"), "");
    }

    #[test]
    fn test_binary() {
        assert_eq!(evaluate("1 + 2"), "3");
        assert_eq!(evaluate("1 - 2"), "-1");
        assert_eq!(evaluate("1 - 1 / 2"), "0.5");
        assert_eq!(evaluate("1 < 2"), "true");
        assert_eq!(evaluate("\"2\" + 2"), "22");
        assert_eq!(evaluate("2 + \"a\""), "2a");
        assert_eq!(evaluate("7 % 3"), "1");
        assert_eq!(evaluate("\"a\" == \"a\""), "true");
        assert_eq!(evaluate("nil == nil"), "true");
        assert_eq!(evaluate("1 == \"1\""), "false");
    }

    #[test]
    fn test_binary_errors() {
        assert_eq!(evaluate("1 < 2 < 3"), "Operands must be numbers.");
        assert_eq!(evaluate("1 / 0"), "Cannot divide by zero.");
        assert_eq!(evaluate("1 % 0"), "Cannot divide by zero.");
        assert_eq!(evaluate("true + 1"), "Invalid operands.");
        assert_eq!(evaluate("-\"a\""), "Operand must be a number.");
    }

    #[test]
    fn test_runtime_error_carries_line() {
        let (mut session, _) = capturing_session();

        let errors = session.run("var a = 1;\nprint a / 0;").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Cannot divide by zero.\n[line 2]");
        assert_eq!(errors[0].line(), Some(2));
    }

    // ── variables and scope ─────────────────────────────────────────────────

    #[test]
    fn test_var_statements() {
        assert_eq!(run("var a = 1; print a;"), "1");
        assert_eq!(run("var a = \"hello\"; print a + \" world\";"), "hello world");
        assert_eq!(run("var a; print a;"), "nil");
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(run("var a = 1; print a += 1;"), "2");
        assert_eq!(run("var a = 1; print a -= 1;"), "0");
        assert_eq!(run("var a = 1; print a *= 2;"), "2");
        assert_eq!(run("var a = 1; print a /= 2;"), "0.5");
    }

    #[test]
    fn test_shadowing() {
        let source = indoc! {"
            var a = 1;
            {
              var a = a + 2;
              print a;
            }
            print a;
        "};

        assert_eq!(run(source), "3\n1");
    }

    #[test]
    fn test_scoping_rules() {
        let redeclared = indoc! {"
            var a = 1;
            {
              var a = 2;
              var a = 3;
            }
        "};
        assert_eq!(run(redeclared), "Already a variable with this name in this scope.");

        let global_redefinition = indoc! {"
            var a = 1;
            var a = 2;
            {
              print a;
            }
        "};
        assert_eq!(run(global_redefinition), "2");
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(run("print nope;"), "Undefined variable 'nope'.");
        assert_eq!(run("nope = 1;"), "Undefined variable 'nope'.");
    }

    #[test]
    fn test_ternary_statements() {
        assert_eq!(run("var a = true ? 1 : 2; print a;"), "1");
        assert_eq!(run("var a = false ? 1 : true ? 2 : 3; print a;"), "2");
        assert_eq!(run("var a = false ? 1 : false ? 2 : 3; print a;"), "3");
    }

    #[test]
    fn test_logical_yields_operands() {
        assert_eq!(run("print true and \"no\";"), "no");
        assert_eq!(run("print false and \"no\";"), "false");
        assert_eq!(run("print 1 and 2 and 3;"), "3");
        assert_eq!(run("print nil and 2 and 3;"), "nil");
        assert_eq!(run("print nil or 2 or 3;"), "2");
        assert_eq!(run("print nil or nil or 3;"), "3");
    }

    // ── loops ───────────────────────────────────────────────────────────────

    #[test]
    fn test_loops() {
        assert_eq!(
            run("var i = 0; while (i < 5) { print i; i = i + 1; }"),
            "0\n1\n2\n3\n4"
        );
        assert_eq!(
            run("for (var i = 0; i < 5; i = i + 1) { print i; }"),
            "0\n1\n2\n3\n4"
        );
        assert_eq!(run("for (var i = 0; i < 5; i += 1) { print i; }"), "0\n1\n2\n3\n4");
        assert_eq!(run("for (var i = 5; i > 0; i -= 1) { print i; }"), "5\n4\n3\n2\n1");
    }

    #[test]
    fn test_while_break_and_continue() {
        let breaking = indoc! {"
            var i = 0;
            while (i < 10) {
              if (i == 3) break;
              print i;
              i = i + 1;
            }
        "};
        assert_eq!(run(breaking), "0\n1\n2");

        let continuing = indoc! {"
            var i = 0;
            while (i < 5) {
              i = i + 1;
              if (i == 3) continue;
              print i;
            }
        "};
        assert_eq!(run(continuing), "1\n2\n4\n5");
    }

    #[test]
    fn test_for_break_and_continue() {
        let breaking = indoc! {"
            for (var i = 0; i < 5; i = i + 1) {
              if (i == 2) break;
              print i;
            }
        "};
        assert_eq!(run(breaking), "0\n1");

        // continue still runs the increment
        let continuing = indoc! {"
            for (var i = 0; i < 5; i = i + 1) {
              if (i == 2) continue;
              print i;
            }
        "};
        assert_eq!(run(continuing), "0\n1\n3\n4");
    }

    #[test]
    fn test_break_only_leaves_innermost_loop() {
        let source = indoc! {r#"
            for (var i = 0; i < 2; i = i + 1) {
              for (var j = 0; j < 10; j = j + 1) {
                if (j == 2) break;
                print i + "-" + j;
              }
            }
        "#};

        assert_eq!(run(source), "0-0\n0-1\n1-0\n1-1");
    }

    #[test]
    fn test_continue_through_nested_blocks() {
        let source = indoc! {"
            var i = 0;
            while (i < 3) {
              i = i + 1;
              {
                {
                  if (i == 2) continue;
                }
              }
              print i;
            }
        "};

        assert_eq!(run(source), "1\n3");
    }

    #[test]
    fn test_return_from_inside_loop() {
        let source = indoc! {"
            fun find() {
              for (var i = 0; i < 10; i = i + 1) {
                while (true) {
                  if (i == 4) return i;
                  break;
                }
              }
              return -1;
            }
            print find();
        "};

        assert_eq!(run(source), "4");
    }

    // ── functions ───────────────────────────────────────────────────────────

    #[test]
    fn test_functions() {
        let printing = indoc! {"
            fun add(a, b) {
              print a + b;
            }

            add(1, 2);
        "};
        assert_eq!(run(printing), "3");

        let returning = indoc! {"
            fun add(a, b) {
              return a + b;
            }

            print add(1, 2);
        "};
        assert_eq!(run(returning), "3");

        let recursive = indoc! {"
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "};
        assert_eq!(run(recursive), "55");
    }

    #[test]
    fn test_closures() {
        let factory = indoc! {"
            fun add_factory(a) {
              return fun(b) {
                return a + b;
              };
            }

            print add_factory(2)(2);
        "};
        assert_eq!(run(factory), "4");

        let counter = indoc! {"
            fun make_counter() {
              var count = 0;
              fun inc() {
                count = count + 1;
                return count;
              }
              return inc;
            }
            var c = make_counter();
            print c();
            print c();
            var d = make_counter();
            print d();
        "};
        assert_eq!(run(counter), "1\n2\n1");

        let passed_in = indoc! {"
            fun add_closure(a) {
              for (var i = 0; i < 5; i += 1)
                print a(i);
            }

            add_closure((a) => a + 1);
        "};
        assert_eq!(run(passed_in), "1\n2\n3\n4\n5");
    }

    #[test]
    fn test_closure_binds_at_declaration() {
        let source = indoc! {r#"
            var a = "global";
            {
              fun show() {
                print a;
              }

              show();
              var a = "block";
              show();
            }
        "#};

        assert_eq!(run(source), "global\nglobal");
    }

    #[test]
    fn test_lambdas() {
        let anonymous = indoc! {"
            fun do_something(fn) {
              var i = 2;
              fn(i);
            }

            do_something(fun (i) { print i; });
        "};
        assert_eq!(run(anonymous), "2");

        let arrow = indoc! {"
            fun do_something(fn) {
              var i = 2;
              fn(i);
            }

            do_something((i) => { print i; });
        "};
        assert_eq!(run(arrow), "2");
    }

    #[test]
    fn test_call_errors() {
        assert_eq!(run("\"a\"();"), "Can only call functions and classes.");
        assert_eq!(
            run("fun f(a, b) {} f(1);"),
            "Expected 2 arguments but got 1."
        );
        assert_eq!(run("clock(1);"), "Expected 0 arguments but got 1.");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(run("print 3.0;"), "3");
        assert_eq!(run("print -0.5;"), "-0.5");
        assert_eq!(run("print clock;"), "<native fn>");
        assert_eq!(run("fun f() {} print f;"), "<fn f>");
        assert_eq!(run("print (x) => x;"), "<fn lambda>");
        assert_eq!(run("class P {} print P; print P();"), "P\nP instance");
        assert_eq!(run("print nil;"), "nil");
    }

    // ── classes ─────────────────────────────────────────────────────────────

    #[test]
    fn test_classes() {
        let fields = indoc! {r#"
            class Cake {
              taste() {
                var adjective = "delicious";
                print "The " + this.flavor + " cake is " + adjective + "!";
              }
            }
            var cake = Cake();
            cake.flavor = "German chocolate";
            cake.taste();
        "#};
        assert_eq!(
            run(fields),
            "German chocolate\nThe German chocolate cake is delicious!"
        );

        let init = indoc! {r#"
            class Cake {
              init() {
                print "Init invoked";
              }
            }
            var cake = Cake();
        "#};
        assert_eq!(run(init), "Init invoked");

        let statics = indoc! {"
            class Math {
              class square(n) {
                return n * n;
              }
            }
            print Math.square(2);
        "};
        assert_eq!(run(statics), "4");
    }

    #[test]
    fn test_getters() {
        let getter = indoc! {"
            class Square {
              init(width) {
                this.width = width;
              }

              area {
                return this.width * this.width;
              }
            }
            var square = Square(5);
            print square.area;
        "};
        assert_eq!(run(getter), "25");

        // fields shadow methods of the same name
        let shadowed = indoc! {"
            class Square {
              init(width) {
                this.width = width;
              }

              width(v) {
                this.width = v;
              }

              area {
                return this.width * this.width;
              }
            }
            var square = Square(5);
            print square.area;
            square.width = 10;
            print square.area;
        "};
        assert_eq!(run(shadowed), "25\n10\n100");

        // a parenthesised zero-argument method is an ordinary method
        let method = indoc! {"
            class A {
              f() { return 1; }
            }
            print A().f;
            print A().f();
        "};
        assert_eq!(run(method), "<fn f>\n1");
    }

    #[test]
    fn test_initializer_returns_receiver() {
        let source = indoc! {"
            class P {
              init(x) {
                this.x = x;
              }
            }
            var p = P(3);
            print p.init(4).x;
            print p.x;
        "};
        assert_eq!(run(source), "4\n4");

        let early = indoc! {"
            class P {
              init() {
                this.v = 1;
                return;
                this.v = 2;
              }
            }
            print P().v;
        "};
        assert_eq!(run(early), "1");

        assert_eq!(
            run("class P { init(a, b) {} } P(1);"),
            "Expected 2 arguments but got 1."
        );
    }

    #[test]
    fn test_inheritance() {
        let source = indoc! {r#"
            class A {
              speak() { return "A"; }
              name { return "a"; }
            }
            class B < A {
              speak() { return super.speak() + "B"; }
            }
            var b = B();
            print b.speak();
            print b.name;
        "#};
        assert_eq!(run(source), "AB\na");

        let init_chain = indoc! {"
            class A {
              init(x) { this.x = x; }
            }
            class B < A {
              init(x) { super.init(x * 2); }
            }
            print B(4).x;
        "};
        assert_eq!(run(init_chain), "8");

        let statics = indoc! {"
            class A {
              class make() { return 1; }
            }
            class B < A {}
            print B.make();
        "};
        assert_eq!(run(statics), "1");
    }

    #[test]
    fn test_static_getters() {
        let source = indoc! {r#"
            class Shape {
              class kind { return "shape"; }
              class describe() { return "a " + Shape.kind; }
            }
            print Shape.kind;
            print Shape.describe();
            print Shape.describe;
        "#};

        assert_eq!(run(source), "shape\na shape\n<fn describe>");
    }

    #[test]
    fn test_static_methods_are_inherited() {
        let source = indoc! {r#"
            class A {
              class origin() { return "A"; }
              class label { return "from A"; }
            }
            class B < A {
              class origin() { return "B"; }
            }
            class C < B {}
            print C.origin();
            print C.label;
            print B.label;
            print A.origin();
        "#};

        assert_eq!(run(source), "B\nfrom A\nfrom A\nA");

        // statics are not visible on instances
        assert_eq!(
            run("class A { class make() { return 1; } } A().make();"),
            "Undefined property 'make'."
        );
    }

    #[test]
    fn test_deep_recursion_completes() {
        let source = indoc! {r#"
            fun count(n) {
              if (n > 0) return count(n - 1);
              return "done";
            }
            print count(1000);
        "#};

        assert_eq!(run(source), "done");

        let sum = indoc! {"
            fun sum(n) {
              if (n == 0) return 0;
              return n + sum(n - 1);
            }
            print sum(2000);
        "};

        assert_eq!(run(sum), "2001000");
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        let (mut session, lines) = capturing_session();

        let errors = session
            .run("fun forever(n) { return forever(n + 1); }\nforever(0);")
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "Stack overflow.");
        assert!(errors[0].is_runtime());

        // the session survives and its globals are intact
        assert!(session.run("print forever;").is_ok());
        assert_eq!(*lines.borrow(), vec!["<fn forever>".to_string()]);
    }

    #[test]
    fn test_runaway_getter_is_a_runtime_error() {
        let (mut session, lines) = capturing_session();

        let errors = session
            .run("class A { g { return this.g; } }\nprint A().g;")
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "Stack overflow.");

        let statics = session
            .run("class B { class g { return B.g; } }\nprint B.g;")
            .unwrap_err();
        assert_eq!(statics[0].message(), "Stack overflow.");

        assert!(session.run("print A;").is_ok());
        assert_eq!(*lines.borrow(), vec!["A".to_string()]);
    }

    #[test]
    fn test_deeply_nested_expression() {
        let source = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
        assert_eq!(evaluate(&source), "1");

        let negations = format!("{}true", "!".repeat(2001));
        assert_eq!(evaluate(&negations), "false");
    }

    #[test]
    fn test_this_in_nested_lambda() {
        let source = indoc! {"
            class A {
              init() { this.x = 1; }
              f() { return () => this.x; }
            }
            print A().f()();
        "};

        assert_eq!(run(source), "1");
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(run("var x = 1; x.y;"), "Only instances have properties.");
        assert_eq!(run("var x = 1; x.y = 2;"), "Only instances have fields.");
        assert_eq!(run("class A {} A().z;"), "Undefined property 'z'.");
        assert_eq!(run("class A {} A.z;"), "Undefined property 'z'.");
        assert_eq!(run("var A = 1; class B < A {}"), "Superclass must be a class.");
    }

    // ── top level and sessions ──────────────────────────────────────────────

    #[test]
    fn test_top_level_echo() {
        assert_eq!(run("1 + 2;"), "3");
        assert_eq!(run("{ 1 + 2; }"), "");
        assert_eq!(run("fun f() {} f();"), "");
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        assert_eq!(run("print 1; var;"), "Expected variable name.");
        assert_eq!(run("print 1; return 2;"), "Can't return from top-level code.");
    }

    #[test]
    fn test_runtime_error_aborts_only_its_unit() {
        let (mut session, lines) = capturing_session();

        assert!(session.run("var a = 1;").is_ok());

        let errors = session.run("print a; a = b; print 2;").unwrap_err();
        assert_eq!(errors[0].message(), "Undefined variable 'b'.");

        assert!(session.run("print a;").is_ok());

        assert_eq!(*lines.borrow(), vec!["1".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_session_keeps_definitions() {
        let (mut session, lines) = capturing_session();

        session.run("var a = 1;").unwrap();
        session.run("var a = 2;").unwrap();
        session.run("fun f() { return g(); }").unwrap();
        session.run("fun g() { return 7; }").unwrap();
        session.run("print a; print f();").unwrap();
        session.run("{ var a = a + 1; print a; }").unwrap();
        session.evaluate("a * 10").unwrap();

        assert_eq!(
            *lines.borrow(),
            vec![
                "2".to_string(),
                "7".to_string(),
                "3".to_string(),
                "20".to_string(),
            ]
        );
    }
}
