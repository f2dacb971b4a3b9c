//! Whole-file lowering of plugin-shaped sources through the public API.

use std::fs;

use gopawn::config::{Config, CONFIG_FILE};
use gopawn::diagnostic::ErrorKind;
use gopawn::lower::Construct;

const INVENTORY: &str = r#"package inventory

import "fmt"

type Stock map[string]int

type Shelf struct {
    items Stock
    cap   int
}

func (s *Shelf) Take(name string, n int) (int, bool) {
    have, ok := s.items[name]
    if !ok {
        return 0, false
    }
    if have < n {
        return have, false
    }
    s.items[name] = have - n
    return n, true
}

func peek(s *Shelf, name string) (int, bool) {
    n, ok := s.items[name]
    return n, ok
}

func describe(s *Shelf, name string) (string, error) {
    left, _ := peek(s, name)
    return fmt.Sprint(left), nil
}

func restock(stock Stock, name string, flags int) int {
    stock[name] = 10
    flags &^= 4
    return flags
}
"#;

fn lower(source: &str) -> String {
    gopawn::lower_source(source, &Config::default())
        .unwrap_or_else(|errs| {
            panic!(
                "lowering failed: {:?}",
                errs.iter().map(|e| &e.message).collect::<Vec<_>>()
            )
        })
        .print()
}

#[test]
fn test_methods_become_plain_functions() {
    let out = lower(INVENTORY);
    assert!(
        out.contains("func Take(s *Shelf, name string, n int, _1 *bool) int {"),
        "{}",
        out
    );
    assert!(out.contains("func describe(s *Shelf, name string, _1 *error) string {"), "{}", out);
    assert!(!out.contains("func (s *Shelf)"), "{}", out);
}

#[test]
fn test_discarded_results_get_temporaries() {
    let out = lower(INVENTORY);
    assert!(out.contains("left = peek(s, name, &_unused"), "{}", out);
    assert!(!out.contains("left, _"), "{}", out);
}

#[test]
fn test_returns_write_output_parameters() {
    let out = lower(INVENTORY);
    assert!(out.contains("*_1 = false\n        return 0\n"), "{}", out);
    assert!(out.contains("*_1 = true\n    return n\n"), "{}", out);
}

#[test]
fn test_map_access_uses_container_calls() {
    let out = lower(INVENTORY);
    assert!(out.contains("ok = containerGet(s.items, name, &have)"), "{}", out);
    assert!(out.contains("containerSet(s.items, name, have - n)"), "{}", out);
    assert!(out.contains("containerSet(stock, name, 10)"), "{}", out);
    assert!(!out.contains("s.items[name]"), "{}", out);
}

const TALLY: &str = r#"package tally

type Counts map[string]int

func (c Counts) Hit(name string) (total int, first bool) {
    c[name]++
    first = c[name] == 1
    total = c[name] + c["*"]
    return
}
"#;

#[test]
fn test_counter_updates_and_named_results() {
    let out = lower(TALLY);
    assert!(out.contains("func Hit(c Counts, name string, _1 *bool) (total int) {\n    var first bool\n"), "{}", out);
    assert!(out.contains("containerGet(c, name, &_unused0)\n    containerSet(c, name, _unused0 + 1)\n"), "{}", out);
    assert!(out.contains("first = _unused1 == 1\n"), "{}", out);
    assert!(out.contains("containerGet(c, \"*\", &_unused3)\n    total = _unused2 + _unused3\n"), "{}", out);
    assert!(out.contains("*_1 = first\n    return\n"), "{}", out);
    assert!(!out.contains("c[name]"), "{}", out);
    assert_eq!(lower(&out), out);
}

#[test]
fn test_and_not_is_expanded() {
    let out = lower(INVENTORY);
    assert!(out.contains("flags &= (^(4))"), "{}", out);
    assert!(!out.contains("&^"), "{}", out);
}

#[test]
fn test_imports_survive() {
    let out = lower(INVENTORY);
    assert!(out.starts_with("package inventory\n"), "{}", out);
    assert!(out.contains("import \"fmt\""), "{}", out);
}

#[test]
fn test_lowered_output_is_stable() {
    let once = lower(INVENTORY);
    let twice = lower(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_rejected_constructs_are_named() {
    let cases = [
        ("go tick()", Construct::ConcurrentLaunch, "go statement"),
        ("defer tick()", Construct::DeferredCall, "defer statement"),
        ("goto done", Construct::LabeledJump, "goto statement"),
        ("select {}", Construct::Select, "select statement"),
    ];
    for (stmt, construct, name) in cases {
        let source = format!("package p\n\nfunc f() {{\n    {}\n}}\n", stmt);
        let errors = gopawn::check(&source, &Config::default()).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::IllegalConstruct(construct), "{}", stmt);
        assert!(errors[0].message.contains(name), "{}", errors[0].message);
    }
}

#[test]
fn test_settings_file_renames_container_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    fs::write(
        &path,
        "[lower]\ncontainer_get = \"MapGet\"\ncontainer_set = \"MapSet\"\n",
    )
    .unwrap();
    let config = Config::discover(dir.path()).unwrap();

    let out = gopawn::lower_source(INVENTORY, &config).unwrap().print();
    assert!(out.contains("ok = MapGet(s.items, name, &have)"), "{}", out);
    assert!(out.contains("MapSet(stock, name, 10)"), "{}", out);
}
