//! Pretty-printing for trees.
//!
//! Output uses the source grammar's surface syntax with four-space
//! indentation. Binary operands are parenthesized only where precedence
//! requires it, so a lowered tree prints the way it evaluates.

use super::*;

const INDENT: &str = "    ";

/// Print a whole file.
pub fn format_file(file: &File) -> String {
    let mut p = Printer::new();
    p.file(file);
    let mut out = p.out;
    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Print one top-level declaration, newline-terminated.
pub fn format_decl(decl: &Decl) -> String {
    let mut p = Printer::new();
    p.decl(decl);
    p.out
}

/// Print one statement without indentation or trailing newline.
pub fn format_stmt(stmt: &Stmt) -> String {
    let mut p = Printer::new();
    p.stmt_body(stmt);
    p.out
}

pub fn format_expr(expr: &Expr) -> String {
    let mut p = Printer::new();
    p.expr(expr);
    p.out
}

pub fn format_type(ty: &Type) -> String {
    let mut p = Printer::new();
    p.ty(ty);
    p.out
}

/// Print a field list as it appears between parentheses.
pub fn format_fields(fields: &[Field]) -> String {
    let mut p = Printer::new();
    p.fields(fields);
    p.out
}

struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn list<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            each(self, item);
        }
    }

    // ─── Declarations ──────────────────────────────────────────────

    fn file(&mut self, file: &File) {
        if let Some(pkg) = &file.package {
            self.push("package ");
            self.push(&pkg.node);
            self.push("\n\n");
        }
        match file.imports.as_slice() {
            [] => {}
            [single] => {
                self.push("import ");
                self.import(single);
                self.push("\n\n");
            }
            many => {
                self.push("import (\n");
                for import in many {
                    self.push(INDENT);
                    self.import(import);
                    self.push("\n");
                }
                self.push(")\n\n");
            }
        }
        for decl in &file.decls {
            self.decl(decl);
            self.push("\n");
        }
    }

    fn import(&mut self, import: &Import) {
        if let Some(alias) = &import.alias {
            self.push(alias);
            self.push(" ");
        }
        self.push(&import.path);
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Func(func) => self.func_decl(func),
            Decl::Gen(gen) => self.gen_decl(gen),
        }
        self.push("\n");
    }

    fn gen_decl(&mut self, gen: &GenDecl) {
        self.push(gen.keyword.as_str());
        self.push(" ");
        match gen.specs.as_slice() {
            [single] => self.spec(single),
            specs => {
                self.push("(\n");
                self.depth += 1;
                for spec in specs {
                    self.indent();
                    self.spec(spec);
                    self.push("\n");
                }
                self.depth -= 1;
                self.indent();
                self.push(")");
            }
        }
    }

    fn spec(&mut self, spec: &Spec) {
        match spec {
            Spec::Value(v) => {
                self.list(&v.names, |p, n| p.push(&n.node));
                if let Some(ty) = &v.ty {
                    self.push(" ");
                    self.ty(&ty.node);
                }
                if !v.values.is_empty() {
                    self.push(" = ");
                    self.list(&v.values, |p, e| p.expr(&e.node));
                }
            }
            Spec::Type(t) => {
                self.push(&t.name.node);
                self.push(if t.alias { " = " } else { " " });
                self.ty(&t.ty.node);
            }
        }
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        self.push("func ");
        if let Some(recv) = &func.recv {
            self.push("(");
            self.fields(recv);
            self.push(") ");
        }
        self.push(&func.name.node);
        self.signature(&func.params, &func.results);
        if let Some(body) = &func.body {
            self.push(" ");
            self.block(body);
        }
    }

    fn signature(&mut self, params: &[Field], results: &[Field]) {
        self.push("(");
        self.fields(params);
        self.push(")");
        match results {
            [] => {}
            [single] if single.names.is_empty() => {
                self.push(" ");
                self.ty(&single.ty.node);
            }
            _ => {
                self.push(" (");
                self.fields(results);
                self.push(")");
            }
        }
    }

    fn fields(&mut self, fields: &[Field]) {
        self.list(fields, |p, f| p.field(f, " "));
    }

    fn field(&mut self, field: &Field, sep: &str) {
        if !field.names.is_empty() {
            self.list(&field.names, |p, n| p.push(&n.node));
            self.push(sep);
        }
        self.ty(&field.ty.node);
    }

    // ─── Statements ────────────────────────────────────────────────

    fn block(&mut self, block: &Block) {
        self.stmt_list_braced(&block.stmts);
    }

    fn stmt_list_braced(&mut self, stmts: &[Stmt]) {
        self.push("{\n");
        self.depth += 1;
        self.stmts(stmts);
        self.depth -= 1;
        self.indent();
        self.push("}");
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if matches!(stmt.kind, StmtKind::Empty) {
                continue;
            }
            self.indent();
            self.stmt_body(stmt);
            self.push("\n");
        }
    }

    fn stmt_body(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(gen) => self.gen_decl(gen),
            StmtKind::Empty => {}
            StmtKind::Labeled { label, stmt } => {
                self.push(&label.node);
                self.push(":\n");
                self.indent();
                self.stmt_body(stmt);
            }
            StmtKind::Expr(e) => self.expr(&e.node),
            StmtKind::Send { chan, value } => {
                self.expr(&chan.node);
                self.push(" <- ");
                self.expr(&value.node);
            }
            StmtKind::IncDec { expr, inc } => {
                self.expr(&expr.node);
                self.push(if *inc { "++" } else { "--" });
            }
            StmtKind::Assign { lhs, op, rhs } => {
                self.list(lhs, |p, e| p.expr(&e.node));
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.list(rhs, |p, e| p.expr(&e.node));
            }
            StmtKind::Go(call) => {
                self.push("go ");
                self.expr(&call.node);
            }
            StmtKind::Defer(call) => {
                self.push("defer ");
                self.expr(&call.node);
            }
            StmtKind::Return(values) => {
                self.push("return");
                if !values.is_empty() {
                    self.push(" ");
                    self.list(values, |p, e| p.expr(&e.node));
                }
            }
            StmtKind::Branch { kind, label } => {
                self.push(kind.as_str());
                if let Some(label) = label {
                    self.push(" ");
                    self.push(&label.node);
                }
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                self.push("if ");
                self.init_clause(init);
                self.expr(&cond.node);
                self.push(" ");
                self.block(then);
                if let Some(els) = els {
                    self.push(" else ");
                    self.stmt_body(els);
                }
            }
            StmtKind::Switch { init, tag, clauses } => {
                self.push("switch ");
                self.init_clause(init);
                if let Some(tag) = tag {
                    self.expr(&tag.node);
                    self.push(" ");
                }
                self.push("{\n");
                for clause in clauses {
                    self.case_clause(clause);
                }
                self.indent();
                self.push("}");
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                clauses,
            } => {
                self.push("switch ");
                self.init_clause(init);
                self.stmt_body(assign);
                self.push(" {\n");
                for clause in clauses {
                    self.case_clause(clause);
                }
                self.indent();
                self.push("}");
            }
            StmtKind::Select { clauses } => {
                self.push("select {\n");
                for clause in clauses {
                    self.indent();
                    match &clause.comm {
                        Some(comm) => {
                            self.push("case ");
                            self.stmt_body(comm);
                            self.push(":\n");
                        }
                        None => self.push("default:\n"),
                    }
                    self.depth += 1;
                    self.stmts(&clause.body);
                    self.depth -= 1;
                }
                self.indent();
                self.push("}");
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.push("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.stmt_body(init);
                    }
                    self.push("; ");
                    if let Some(cond) = cond {
                        self.expr(&cond.node);
                    }
                    self.push(";");
                    if let Some(post) = post {
                        self.push(" ");
                        self.stmt_body(post);
                    }
                    self.push(" ");
                } else if let Some(cond) = cond {
                    self.expr(&cond.node);
                    self.push(" ");
                }
                self.block(body);
            }
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => {
                self.push("for ");
                if let Some(key) = key {
                    self.expr(&key.node);
                    if let Some(value) = value {
                        self.push(", ");
                        self.expr(&value.node);
                    }
                    self.push(if *define { " := " } else { " = " });
                }
                self.push("range ");
                self.expr(&expr.node);
                self.push(" ");
                self.block(body);
            }
        }
    }

    fn init_clause(&mut self, init: &Option<Box<Stmt>>) {
        if let Some(init) = init {
            self.stmt_body(init);
            self.push("; ");
        }
    }

    fn case_clause(&mut self, clause: &CaseClause) {
        self.indent();
        match &clause.exprs {
            Some(exprs) => {
                self.push("case ");
                self.list(exprs, |p, e| p.expr(&e.node));
                self.push(":\n");
            }
            None => self.push("default:\n"),
        }
        self.depth += 1;
        self.stmts(&clause.body);
        self.depth -= 1;
    }

    // ─── Expressions ───────────────────────────────────────────────

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.push(name),
            Expr::Lit(lit) => self.push(lit.text()),
            Expr::Composite { ty, elts } => {
                if let Some(ty) = ty {
                    self.ty(ty);
                }
                self.push("{");
                self.list(elts, |p, e| p.expr(&e.node));
                self.push("}");
            }
            Expr::KeyValue { key, value } => {
                self.expr(&key.node);
                self.push(": ");
                self.expr(&value.node);
            }
            Expr::FuncLit { ty, body } => {
                self.push("func");
                self.signature(&ty.params, &ty.results);
                self.push(" ");
                self.block(body);
            }
            Expr::Paren(inner) => {
                self.push("(");
                self.expr(&inner.node);
                self.push(")");
            }
            Expr::Selector { expr, sel } => {
                self.operand(&expr.node);
                self.push(".");
                self.push(&sel.node);
            }
            Expr::Index { expr, index } => {
                self.operand(&expr.node);
                self.push("[");
                self.expr(&index.node);
                self.push("]");
            }
            Expr::Slice {
                expr,
                low,
                high,
                max,
            } => {
                self.operand(&expr.node);
                self.push("[");
                if let Some(low) = low {
                    self.expr(&low.node);
                }
                self.push(":");
                if let Some(high) = high {
                    self.expr(&high.node);
                }
                if let Some(max) = max {
                    self.push(":");
                    self.expr(&max.node);
                }
                self.push("]");
            }
            Expr::TypeAssert { expr, ty } => {
                self.operand(&expr.node);
                self.push(".(");
                match ty {
                    Some(ty) => self.ty(ty),
                    None => self.push("type"),
                }
                self.push(")");
            }
            Expr::Call {
                func,
                args,
                ellipsis,
            } => {
                self.operand(&func.node);
                self.push("(");
                self.list(args, |p, e| p.expr(&e.node));
                if *ellipsis {
                    self.push("...");
                }
                self.push(")");
            }
            Expr::Unary { op, expr } => {
                self.push(op.as_str());
                match &expr.node {
                    Expr::Binary { .. } => self.parenthesized(&expr.node),
                    // `- -x` must not print as `--x`
                    Expr::Unary { op: inner, .. } if inner == op => self.parenthesized(&expr.node),
                    other => self.expr(other),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                self.binary_operand(&lhs.node, op.precedence(), false);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.binary_operand(&rhs.node, op.precedence(), true);
            }
            Expr::Type(ty) => self.ty(ty),
        }
    }

    fn parenthesized(&mut self, expr: &Expr) {
        self.push("(");
        self.expr(expr);
        self.push(")");
    }

    /// Operand of a postfix form (selector, index, call).
    fn operand(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary { .. } | Expr::Unary { .. } => self.parenthesized(expr),
            Expr::Type(Type::Pointer(_)) | Expr::Type(Type::Func(_)) => self.parenthesized(expr),
            _ => self.expr(expr),
        }
    }

    fn binary_operand(&mut self, expr: &Expr, parent: u8, right: bool) {
        match expr {
            Expr::Binary { op, .. }
                if op.precedence() < parent || (right && op.precedence() == parent) =>
            {
                self.parenthesized(expr)
            }
            _ => self.expr(expr),
        }
    }

    // ─── Types ─────────────────────────────────────────────────────

    fn ty(&mut self, ty: &Type) {
        match ty {
            Type::Named(name) => self.push(name),
            Type::Qualified(pkg, name) => {
                self.push(pkg);
                self.push(".");
                self.push(name);
            }
            Type::Pointer(inner) => {
                self.push("*");
                self.ty(inner);
            }
            Type::Array(len, elem) => {
                self.push("[");
                if let Some(len) = len {
                    self.expr(&len.node);
                }
                self.push("]");
                self.ty(elem);
            }
            Type::Map(key, value) => {
                self.push("map[");
                self.ty(key);
                self.push("]");
                self.ty(value);
            }
            Type::Chan(dir, elem) => {
                self.push(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.ty(elem);
            }
            Type::Func(func) => {
                self.push("func");
                self.signature(&func.params, &func.results);
            }
            Type::Struct(fields) => {
                if fields.is_empty() {
                    self.push("struct{}");
                    return;
                }
                self.push("struct { ");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        self.push("; ");
                    }
                    self.field(f, " ");
                }
                self.push(" }");
            }
            Type::Interface(methods) => {
                if methods.is_empty() {
                    self.push("interface{}");
                    return;
                }
                self.push("interface { ");
                for (i, m) in methods.iter().enumerate() {
                    if i > 0 {
                        self.push("; ");
                    }
                    match (&m.names.first(), &m.ty.node) {
                        (Some(name), Type::Func(sig)) => {
                            self.push(&name.node);
                            self.signature(&sig.params, &sig.results);
                        }
                        _ => self.field(m, " "),
                    }
                }
                self.push(" }");
            }
            Type::Variadic(elem) => {
                self.push("...");
                self.ty(elem);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Spanned;

    fn ident(name: &str) -> Spanned<Expr> {
        Spanned::dummy(Expr::ident(name))
    }

    fn binary(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
        Spanned::dummy(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    #[test]
    fn test_binary_precedence_parens() {
        let sum = binary(BinOp::Add, ident("a"), ident("b"));
        let product = binary(BinOp::Mul, sum, ident("c"));
        assert_eq!(format_expr(&product.node), "(a + b) * c");

        let product = binary(BinOp::Mul, ident("a"), ident("b"));
        let sum = binary(BinOp::Add, product, ident("c"));
        assert_eq!(format_expr(&sum.node), "a * b + c");
    }

    #[test]
    fn test_right_operand_same_precedence() {
        let inner = binary(BinOp::Sub, ident("b"), ident("c"));
        let outer = binary(BinOp::Sub, ident("a"), inner);
        assert_eq!(format_expr(&outer.node), "a - (b - c)");
    }

    #[test]
    fn test_format_types() {
        let m = Type::Map(Box::new(Type::named("string")), Box::new(Type::named("int")));
        assert_eq!(format_type(&m), "map[string]int");
        let p = Type::named("T").pointer_to();
        assert_eq!(format_type(&p), "*T");
        let s = Type::Array(None, Box::new(Type::named("byte")));
        assert_eq!(format_type(&s), "[]byte");
        let c = Type::Chan(ChanDir::Recv, Box::new(Type::named("int")));
        assert_eq!(format_type(&c), "<-chan int");
    }

    #[test]
    fn test_format_unary_of_binary() {
        let inner = binary(BinOp::Add, ident("a"), ident("b"));
        let neg = Expr::Unary {
            op: UnaryOp::BitNot,
            expr: Box::new(inner),
        };
        assert_eq!(format_expr(&neg), "^(a + b)");
    }
}
