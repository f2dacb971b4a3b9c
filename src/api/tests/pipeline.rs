use crate::api::*;
use crate::config::Config;
use crate::diagnostic::ErrorKind;
use crate::lexeme::TokenKind;
use crate::lower::Construct;

#[test]
fn test_tokenize_scanner_scenario() {
    let tokens = tokenize("// note\nfunc f(x int) int { return x }", ScanOptions::default())
        .expect("tokens");
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        [
            TokenKind::Func,
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::Ident,
            TokenKind::IntTy,
            TokenKind::RParen,
            TokenKind::IntTy,
            TokenKind::LBrace,
            TokenKind::Return,
            TokenKind::Ident,
            TokenKind::RBrace,
        ]
    );
}

#[test]
fn test_transpile_plugin() {
    let source = r#"package arena

type Scores map[string]int

func (s Scores) Best(name string) (int, bool) {
    v, ok := s[name]
    return v, ok
}

func bump(s Scores, name string) {
    s[name] = 1
}
"#;
    let out = transpile(source, "arena.go", &Config::default()).expect("transpile");
    assert!(out.contains("func Best(s Scores, name string, _1 *bool) int {"), "{}", out);
    assert!(out.contains("ok = containerGet(s, name, &v)"), "{}", out);
    assert!(out.contains("containerSet(s, name, 1)"), "{}", out);
}

#[test]
fn test_lower_source_lowers_compound_update() {
    let source = "package p\n\nfunc f(m map[string]int) {\n    m[\"a\"] += 2\n}\n";
    let lowered = lower_source(source, &Config::default()).expect("lowered");
    assert!(lowered.warnings.is_empty());
    let out = lowered.print();
    assert!(out.contains("containerGet(m, \"a\", &_unused0)"), "{}", out);
    assert!(out.contains("containerSet(m, \"a\", _unused0 + 2)"), "{}", out);
    assert!(!out.contains("+="), "{}", out);
}

#[test]
fn test_lower_source_reports_warnings() {
    let source = "package p\n\nfunc f(m map[string]int, on bool) bool {\n    return on || m[\"a\"] > 0\n}\n";
    let lowered = lower_source(source, &Config::default()).expect("lowered");
    assert_eq!(lowered.warnings.len(), 1);
    assert!(!lowered.warnings[0].is_error());
    assert!(lowered.print().contains("return on || _unused0 > 0"));
}

#[test]
fn test_scan_errors_stop_the_pipeline() {
    let errors = lower_source("package p\n\nvar z = 2i\n", &Config::default()).unwrap_err();
    assert_eq!(errors[0].kind, ErrorKind::Scan);
}

#[test]
fn test_parse_errors_are_collected() {
    let errors = parse_source_silent("package p\n\nfunc f( {\n", ScanOptions::default()).unwrap_err();
    assert!(errors.iter().all(|e| e.kind == ErrorKind::Parse));
}

#[test]
fn test_check_runs_only_the_sieve() {
    let config = Config::default();
    assert!(check("package p\n\nfunc f() (int, error)\n", &config).is_ok());
    let errors = check("package p\n\nfunc f() {\n    defer g()\n}\n", &config).unwrap_err();
    assert_eq!(
        errors[0].kind,
        ErrorKind::IllegalConstruct(Construct::DeferredCall)
    );
}

#[test]
fn test_relaxed_literals_from_config() {
    let source = "package p\n\nvar url = \"http://host\"\n";
    assert!(lower_source(source, &Config::default()).is_err());

    let mut config = Config::default();
    config.scan.strict_literals = false;
    let lowered = lower_source(source, &config).expect("relaxed");
    assert!(lowered.print().contains("\"http://host\""));
}
