use super::*;
use crate::ast::display::{format_expr, format_file};
use crate::diagnostic::Diagnostic;
use crate::lexer::{tokenize, ScanOptions};

fn parse(source: &str) -> File {
    let tokens = tokenize(source, 0, ScanOptions::default()).expect("scan failed");
    Parser::new(tokens, 0)
        .parse_file()
        .unwrap_or_else(|errs| panic!("parse failed: {:?}", errs))
}

fn parse_errors(source: &str) -> Vec<Diagnostic> {
    let tokens = tokenize(source, 0, ScanOptions::default()).expect("scan failed");
    match Parser::new(tokens, 0).parse_file() {
        Ok(_) => panic!("expected parse errors"),
        Err(errs) => errs,
    }
}

fn body(source: &str) -> Vec<Stmt> {
    let file = parse(&format!("package p\nfunc f() {{\n{}\n}}\n", source));
    match file.decls.into_iter().next() {
        Some(Decl::Func(func)) => func.body.expect("body").stmts,
        _ => panic!("expected function"),
    }
}

fn collect_ids(stmts: &[Stmt], out: &mut Vec<NodeId>) {
    for stmt in stmts {
        out.push(stmt.id);
        match &stmt.kind {
            StmtKind::Block(b) => collect_ids(&b.stmts, out),
            StmtKind::If { then, els, .. } => {
                collect_ids(&then.stmts, out);
                if let Some(els) = els {
                    collect_ids(std::slice::from_ref(els.as_ref()), out);
                }
            }
            StmtKind::For { body, .. } | StmtKind::Range { body, .. } => {
                collect_ids(&body.stmts, out)
            }
            _ => {}
        }
    }
}

#[test]
fn test_package_and_imports() {
    let file = parse("package main\n\nimport (\n    \"fmt\"\n    str \"strings\"\n)\n");
    assert_eq!(file.package.as_ref().map(|p| p.node.as_str()), Some("main"));
    assert_eq!(file.imports.len(), 2);
    assert_eq!(file.imports[1].alias.as_deref(), Some("str"));
    assert_eq!(file.imports[1].path, "\"strings\"");
}

#[test]
fn test_param_grouping() {
    let file = parse("package p\nfunc f(a, b int, c string) {}\n");
    let func = file.find_function("f").expect("f");
    assert_eq!(func.params.len(), 2);
    assert_eq!(func.params[0].names.len(), 2);
    assert_eq!(func.params[0].ty.node, Type::named("int"));
    assert_eq!(func.params[1].names[0].node, "c");
    assert_eq!(arity(&func.params), 3);
}

#[test]
fn test_unnamed_results() {
    let file = parse("package p\nfunc f() (int, error) { return 0, nil }\n");
    let func = file.find_function("f").expect("f");
    assert_eq!(func.results.len(), 2);
    assert!(func.results.iter().all(|r| r.names.is_empty()));
    assert_eq!(func.results[1].ty.node, Type::named("error"));
}

#[test]
fn test_named_results_and_receiver() {
    let file = parse("package p\nfunc (s *Server) Stats() (hits, misses int) { return }\n");
    let func = file.find_function("Stats").expect("Stats");
    let recv = func.recv.as_ref().expect("receiver");
    assert_eq!(recv.len(), 1);
    assert_eq!(recv[0].ty.node, Type::named("Server").pointer_to());
    assert_eq!(func.results.len(), 1);
    assert_eq!(func.results[0].names.len(), 2);
}

#[test]
fn test_qualified_and_variadic_params() {
    let file = parse("package p\nfunc f(ctx context.Context, xs ...int) {}\n");
    let func = file.find_function("f").expect("f");
    assert_eq!(
        func.params[0].ty.node,
        Type::Qualified("context".into(), "Context".into())
    );
    assert_eq!(
        func.params[1].ty.node,
        Type::Variadic(Box::new(Type::named("int")))
    );
}

#[test]
fn test_map_type_and_var_decl() {
    let stmts = body("var m map[string]int\nvar a, b = 1, 2");
    match &stmts[0].kind {
        StmtKind::Decl(GenDecl { specs, .. }) => match &specs[0] {
            Spec::Value(v) => {
                let ty = v.ty.as_ref().expect("type");
                assert_eq!(
                    ty.node,
                    Type::Map(Box::new(Type::named("string")), Box::new(Type::named("int")))
                );
            }
            other => panic!("unexpected spec {:?}", other),
        },
        other => panic!("unexpected stmt {:?}", other),
    }
    match &stmts[1].kind {
        StmtKind::Decl(GenDecl { specs, .. }) => match &specs[0] {
            Spec::Value(v) => {
                assert_eq!(v.names.len(), 2);
                assert_eq!(v.values.len(), 2);
            }
            other => panic!("unexpected spec {:?}", other),
        },
        other => panic!("unexpected stmt {:?}", other),
    }
}

#[test]
fn test_binary_precedence() {
    let stmts = body("x := a + b*c &^ d == e || f");
    match &stmts[0].kind {
        StmtKind::Assign { rhs, op, .. } => {
            assert_eq!(*op, AssignOp::Define);
            assert_eq!(format_expr(&rhs[0].node), "a + b * c &^ d == e || f");
            match &rhs[0].node {
                Expr::Binary { op, .. } => assert_eq!(*op, BinOp::LogOr),
                other => panic!("expected binary, got {:?}", other),
            }
        }
        other => panic!("unexpected stmt {:?}", other),
    }
}

#[test]
fn test_if_with_init_and_else_if() {
    let stmts = body("if v, ok := m[k]; ok {\n} else if x {\n} else {\n}");
    match &stmts[0].kind {
        StmtKind::If { init, els, .. } => {
            assert!(init.is_some());
            let els = els.as_ref().expect("else");
            assert!(matches!(els.kind, StmtKind::If { .. }));
        }
        other => panic!("unexpected stmt {:?}", other),
    }
}

#[test]
fn test_for_forms() {
    let stmts = body(
        "for i := 0; i < n; i++ {\n}\nfor x < 3 {\n}\nfor {\n}\nfor k, v := range m {\n}\nfor range ch {\n}",
    );
    assert!(matches!(
        &stmts[0].kind,
        StmtKind::For {
            init: Some(_),
            cond: Some(_),
            post: Some(_),
            ..
        }
    ));
    assert!(matches!(
        &stmts[1].kind,
        StmtKind::For {
            init: None,
            cond: Some(_),
            post: None,
            ..
        }
    ));
    assert!(matches!(&stmts[2].kind, StmtKind::For { cond: None, .. }));
    assert!(matches!(
        &stmts[3].kind,
        StmtKind::Range {
            key: Some(_),
            value: Some(_),
            define: true,
            ..
        }
    ));
    assert!(matches!(&stmts[4].kind, StmtKind::Range { key: None, .. }));
}

#[test]
fn test_composite_not_taken_in_header() {
    let stmts = body("for x := range items {\n    total += x\n}");
    match &stmts[0].kind {
        StmtKind::Range { expr, body, .. } => {
            assert_eq!(expr.node, Expr::ident("items"));
            assert_eq!(body.stmts.len(), 1);
        }
        other => panic!("unexpected stmt {:?}", other),
    }
}

#[test]
fn test_composite_literals() {
    let stmts = body("p := Point{X: 1, Y: 2}\nxs := []int{1, 2, 3}\nm := map[string][]int{\n    \"a\": {1},\n}");
    let rhs = |i: usize| match &stmts[i].kind {
        StmtKind::Assign { rhs, .. } => rhs[0].node.clone(),
        other => panic!("unexpected stmt {:?}", other),
    };
    assert_eq!(format_expr(&rhs(0)), "Point{X: 1, Y: 2}");
    assert_eq!(format_expr(&rhs(1)), "[]int{1, 2, 3}");
    assert_eq!(format_expr(&rhs(2)), "map[string][]int{\"a\": {1}}");
}

#[test]
fn test_switch_and_type_switch() {
    let stmts = body(
        "switch x {\ncase 1, 2:\n    y()\ndefault:\n}\nswitch v := i.(type) {\ncase int:\ncase string:\n}",
    );
    match &stmts[0].kind {
        StmtKind::Switch { tag, clauses, .. } => {
            assert!(tag.is_some());
            assert_eq!(clauses.len(), 2);
            assert_eq!(clauses[0].exprs.as_ref().map(Vec::len), Some(2));
            assert!(clauses[1].exprs.is_none());
        }
        other => panic!("unexpected stmt {:?}", other),
    }
    assert!(matches!(&stmts[1].kind, StmtKind::TypeSwitch { clauses, .. } if clauses.len() == 2));
}

#[test]
fn test_select_send_and_receive() {
    let stmts = body("select {\ncase v := <-ch:\n    use(v)\ncase out <- 1:\ndefault:\n}");
    match &stmts[0].kind {
        StmtKind::Select { clauses } => {
            assert_eq!(clauses.len(), 3);
            assert!(matches!(
                clauses[1].comm.as_deref().map(|s| &s.kind),
                Some(StmtKind::Send { .. })
            ));
            assert!(clauses[2].comm.is_none());
        }
        other => panic!("unexpected stmt {:?}", other),
    }
}

#[test]
fn test_labels_goto_defer_go() {
    let stmts = body("outer:\nfor {\n    break outer\n}\ngoto outer\ndefer close(f)\ngo run()");
    assert!(matches!(&stmts[0].kind, StmtKind::Labeled { label, .. } if label.node == "outer"));
    assert!(matches!(
        &stmts[1].kind,
        StmtKind::Branch {
            kind: BranchKind::Goto,
            label: Some(_)
        }
    ));
    assert!(matches!(&stmts[2].kind, StmtKind::Defer(_)));
    assert!(matches!(&stmts[3].kind, StmtKind::Go(_)));
}

#[test]
fn test_slices_and_assertions() {
    let stmts = body("a := b[1:n]\nc := d[:]\ne := i.(T)");
    let rhs = |i: usize| match &stmts[i].kind {
        StmtKind::Assign { rhs, .. } => rhs[0].node.clone(),
        other => panic!("unexpected stmt {:?}", other),
    };
    assert!(matches!(rhs(0), Expr::Slice { low: Some(_), high: Some(_), .. }));
    assert!(matches!(rhs(1), Expr::Slice { low: None, high: None, .. }));
    assert!(matches!(rhs(2), Expr::TypeAssert { ty: Some(_), .. }));
}

#[test]
fn test_statement_ids_are_unique() {
    let stmts = body("x := 1\nif x > 0 {\n    x++\n} else {\n    x--\n}\nfor {\n    x++\n}");
    let mut ids = Vec::new();
    collect_ids(&stmts, &mut ids);
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len());
}

#[test]
fn test_terminators_carry_file_id() {
    let tokens = tokenize("package p\nfunc f() {\n    x := 1\n    x++\n}", 3, ScanOptions::default())
        .expect("scan failed");
    let tokens = insert_terminators(tokens, 3);
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Semicolon));
    assert!(tokens.iter().all(|t| t.span.file_id == 3));

    let file = Parser::new(tokenize("package p\nfunc f() {\n    x := 1\n}", 3, ScanOptions::default())
        .expect("scan failed"), 3)
        .parse_file()
        .unwrap_or_else(|errs| panic!("parse failed: {:?}", errs));
    let Some(Decl::Func(func)) = file.decls.first() else {
        panic!("expected function");
    };
    assert_eq!(func.name.span.file_id, 3);
}

#[test]
fn test_round_trip_canonical_source() {
    let source = "package main\n\nimport \"fmt\"\n\nfunc add(a, b int) int {\n    return a + b\n}\n\nfunc pair() (int, error) {\n    x := 1\n    if x > 0 {\n        x++\n    } else {\n        x--\n    }\n    return x, nil\n}\n";
    assert_eq!(format_file(&parse(source)), source);
}

#[test]
fn test_missing_brace_is_error() {
    let errs = parse_errors("package p\nfunc f() {\n    x := 1\n");
    assert!(!errs.is_empty());
    assert!(errs.iter().all(|d| d.kind == crate::diagnostic::ErrorKind::Parse));
}

#[test]
fn test_mixed_params_is_error() {
    let errs = parse_errors("package p\nfunc f(a int, string) {}\n");
    assert!(errs[0].message.contains("mixed named and unnamed"));
}

#[test]
fn test_range_outside_for_is_error() {
    let errs = parse_errors("package p\nfunc f() {\n    x := range y\n}\n");
    assert!(errs.iter().any(|d| d.message.contains("expected expression")));
}
