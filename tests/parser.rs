#[cfg(test)]
mod parser_tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::expr::{Expr, ExprKind};
    use rox::parser::Parser;
    use rox::scanner::scan_tokens;
    use rox::stmt::Stmt;

    fn parse_expr(source: &str) -> (Option<Expr>, Vec<LoxError>) {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

        Parser::new(&tokens).parse_expression()
    }

    fn parse_program(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
        let (tokens, lex_errors) = scan_tokens(source);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);

        Parser::new(&tokens).parse()
    }

    fn print_expr(source: &str) -> String {
        let (expr, errors) = parse_expr(source);
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        AstPrinter::print(&expr.expect("expression"))
    }

    fn print_program(source: &str) -> Vec<String> {
        let (statements, errors) = parse_program(source);
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    fn messages(errors: &[LoxError]) -> Vec<&str> {
        errors.iter().map(LoxError::message).collect()
    }

    // ── expressions ─────────────────────────────────────────────────────────

    #[test]
    fn test_binary_precedence() {
        assert_eq!(print_expr("1 + 2"), "(+ 1.0 2.0)");
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expr("10 % 4 - 1"), "(- (% 10.0 4.0) 1.0)");
        assert_eq!(print_expr("-1 < 2 == !false"), "(== (< (- 1.0) 2.0) (! false))");
    }

    #[test]
    fn test_comma_is_left_associative() {
        assert_eq!(print_expr("1, 2"), "(, 1.0 2.0)");
        assert_eq!(print_expr("1, 2, 3"), "(, (, 1.0 2.0) 3.0)");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(print_expr("true ? 1 : 3"), "(? true 1.0 3.0)");
        assert_eq!(
            print_expr("false ? 1 : true ? 2 : 3"),
            "(? false 1.0 (? true 2.0 3.0))"
        );
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn test_calls_and_properties() {
        assert_eq!(print_expr("f(1)(2)"), "(call (call f 1.0) 2.0)");
        assert_eq!(print_expr("a.b.c"), "(. (. a b) c)");
        assert_eq!(print_expr("a.b = 3"), "(= (. a b) 3.0)");
    }

    #[test]
    fn test_compound_assignment_desugars() {
        assert_eq!(print_expr("a += 1"), "(= a (+ a 1.0))");
        assert_eq!(print_expr("a -= 1"), "(= a (- a 1.0))");
        assert_eq!(print_expr("a *= 2"), "(= a (* a 2.0))");
        assert_eq!(print_expr("a /= 2"), "(= a (/ a 2.0))");
        assert_eq!(print_expr("o.n += 1"), "(= (. o n) (+ (. o n) 1.0))");
    }

    #[test]
    fn test_lambdas() {
        assert_eq!(
            print_expr("(a, b) => a + b"),
            "(lambda lambda (a b) (return (+ a b)))"
        );
        assert_eq!(print_expr("() => { print 1; }"), "(lambda lambda () (print 1.0))");
        assert_eq!(
            print_expr("fun (x) { return x; }"),
            "(lambda lambda (x) (return x))"
        );
        // a parenthesised name without an arrow stays a grouping
        assert_eq!(print_expr("(a)"), "(group a)");
    }

    #[test]
    fn test_trailing_semicolon_tolerated() {
        assert_eq!(print_expr("1 + 2;"), "(+ 1.0 2.0)");
    }

    #[test]
    fn test_printer_is_stable() {
        let sources = [
            "1 + 2 * 3",
            "-(1 - 2) / 3",
            "1, 2, 3",
            "nil ? \"yes\" : !true",
            "(1 == 2) != (3 >= 4)",
        ];

        for source in sources {
            let first = print_expr(source);
            let second = print_expr(source);

            assert_eq!(first, second, "unstable print for {:?}", source);

            let (expr, _) = parse_expr(source);
            let expr = expr.expect("expression");
            assert_eq!(AstPrinter::print(&expr), AstPrinter::print(&expr));
        }
    }

    #[test]
    fn test_deeply_nested_grouping() {
        let depth = 2000;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));

        let printed = print_expr(&source);

        assert_eq!(printed.matches("(group ").count(), depth);
        assert!(printed.ends_with(&format!("1.0{}", ")".repeat(depth))));
    }

    #[test]
    fn test_expression_ids_are_unique() {
        let (first, _) = parse_expr("a");
        let (second, _) = parse_expr("a");

        assert_ne!(first.expect("first").id, second.expect("second").id);
    }

    // ── statements ──────────────────────────────────────────────────────────

    #[test]
    fn test_var_declaration() {
        assert_eq!(print_program("var a = 2; var b;"), vec!["(var a 2.0)", "(var b)"]);
    }

    #[test]
    fn test_for_desugars_to_while() {
        assert_eq!(
            print_program("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (print i) (= i (+ i 1.0))))"]
        );

        assert_eq!(print_program("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn test_control_statements() {
        let source = indoc! {"
            while (x) { if (y) continue; else break; }
            fun f(a, b) { return a; }
        "};

        assert_eq!(
            print_program(source),
            vec![
                "(while x (block (if y (continue) (break))))",
                "(fun f (a b) (return a))",
            ]
        );
    }

    #[test]
    fn test_class_members() {
        let source = indoc! {"
            class B < A {
                init(x) { this.x = x; }
                area { return 1; }
                class make() { return B(0); }
            }
        "};

        assert_eq!(
            print_program(source),
            vec![
                "(class B < A (method init (x) (; (= (. this x) x))) \
                 (method area () (return 1.0)) \
                 (static make () (return (call B 0.0))))"
            ]
        );

        let (statements, _) = parse_program(source);
        let Stmt::Class { methods, .. } = &statements[0] else {
            panic!("expected class");
        };
        assert!(!methods[0].is_getter);
        assert!(methods[1].is_getter);
    }

    #[test]
    fn test_fun_without_name_is_an_expression() {
        let (statements, errors) = parse_program("fun (x) { return x; }(1);");

        assert!(errors.is_empty());
        assert!(matches!(
            &statements[0],
            Stmt::Expression(Expr {
                kind: ExprKind::Call { .. },
                ..
            })
        ));
    }

    // ── errors ──────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_left_operand() {
        let (expr, errors) = parse_expr("+ 3");

        assert!(expr.is_none());
        assert_eq!(messages(&errors), vec!["Binary operator missing left-hand operand."]);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at '+': Binary operator missing left-hand operand."
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (_, errors) = parse_program("1 = 2;");

        assert_eq!(
            errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn test_leftover_input_after_expression() {
        let (expr, errors) = parse_expr("1 2");

        assert!(expr.is_none());
        assert_eq!(messages(&errors), vec!["Expected end of expression."]);
    }

    #[test]
    fn test_recovery_keeps_later_statements() {
        let (statements, errors) = parse_program("var = 1; print 2; var b");

        assert_eq!(statements.len(), 1);
        assert_eq!(AstPrinter::print_stmt(&statements[0]), "(print 2.0)");
        assert_eq!(
            errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "[line 1] Error at '=': Expected variable name.",
                "[line 1] Error at end: Expected ';' after variable declaration.",
            ]
        );
    }

    #[test]
    fn test_duplicate_method_is_reported() {
        let (statements, errors) = parse_program("class A { f() {} f() {} }");

        assert_eq!(statements.len(), 1);
        assert_eq!(messages(&errors), vec!["Already a method named 'f' in this class."]);
    }

    #[test]
    fn test_too_many_arguments_is_not_fatal() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (statements, errors) = parse_program(&source);

        assert_eq!(statements.len(), 1);
        assert_eq!(messages(&errors), vec!["Can't have more than 255 arguments."]);
    }

    #[test]
    fn test_too_many_parameters_is_not_fatal() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let (statements, errors) = parse_program(&source);

        assert_eq!(statements.len(), 1);
        assert_eq!(messages(&errors), vec!["Can't have more than 255 parameters."]);
    }
}
