//! Deterministic source printer
//!
//! Renders an AST back to source text with fixed formatting: four-space
//! indentation, one annotation per line, one blank line between members.
//! The output reparses to a tree structurally equivalent to the input.

use crate::ast::*;

const INDENT: &str = "    ";

/// Render a program as source text
pub fn print(program: &Program) -> String {
    let mut out = String::new();
    for (i, class) in program.classes.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        print_class(&mut out, class);
    }
    out
}

fn print_class(out: &mut String, class: &ClassDecl) {
    for annotation in &class.annotations {
        print_annotation(out, annotation);
        out.push('\n');
    }
    for modifier in &class.modifiers {
        out.push_str(modifier.keyword());
        out.push(' ');
    }
    out.push_str("class ");
    out.push_str(&class.name);
    if let Some(superclass) = &class.superclass {
        out.push_str(" extends ");
        out.push_str(superclass);
    }
    if !class.interfaces.is_empty() {
        out.push_str(" implements ");
        out.push_str(&class.interfaces.join(", "));
    }

    if class.members.is_empty() {
        out.push_str(" {}\n");
        return;
    }

    out.push_str(" {\n");
    for (i, member) in class.members.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match member {
            Member::Field(field) => print_field(out, field),
            Member::Method(method) => print_method(out, method),
        }
    }
    out.push_str("}\n");
}

fn print_annotation(out: &mut String, annotation: &Annotation) {
    out.push('@');
    out.push_str(&annotation.name);
    if !annotation.values.is_empty() {
        out.push('(');
        for (i, (key, value)) in annotation.values.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&render_literal(value));
        }
        out.push(')');
    }
}

fn print_field(out: &mut String, field: &FieldDecl) {
    for annotation in &field.annotations {
        out.push_str(INDENT);
        print_annotation(out, annotation);
        out.push('\n');
    }
    out.push_str(INDENT);
    for modifier in &field.modifiers {
        out.push_str(modifier.keyword());
        out.push(' ');
    }
    out.push_str(&field.name);
    out.push_str(": ");
    out.push_str(&field.ty.render());
    if let Some(initializer) = &field.initializer {
        out.push_str(" = ");
        out.push_str(&render_literal(initializer));
    }
    out.push_str(";\n");
}

fn print_method(out: &mut String, method: &MethodDecl) {
    for annotation in &method.annotations {
        out.push_str(INDENT);
        print_annotation(out, annotation);
        out.push('\n');
    }
    out.push_str(INDENT);
    for modifier in &method.modifiers {
        out.push_str(modifier.keyword());
        out.push(' ');
    }
    out.push_str("function ");
    out.push_str(&method.name);
    out.push('(');
    for (i, param) in method.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&param.name);
        out.push_str(": ");
        out.push_str(&param.ty.render());
    }
    out.push(')');
    if let Some(return_type) = &method.return_type {
        out.push_str(": ");
        out.push_str(&return_type.render());
    }

    match &method.body {
        None => out.push_str(";\n"),
        Some(body) => {
            out.push_str(" {\n");
            for statement in body {
                print_statement(out, statement, 2);
            }
            out.push_str(INDENT);
            out.push_str("}\n");
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn print_statement(out: &mut String, statement: &Statement, depth: usize) {
    push_indent(out, depth);
    match statement {
        Statement::Let { name, ty, init } => {
            out.push_str("let ");
            out.push_str(name);
            if let Some(ty) = ty {
                out.push_str(": ");
                out.push_str(&ty.render());
            }
            out.push_str(" = ");
            out.push_str(&render_expr(init, 0));
            out.push_str(";\n");
        }
        Statement::Expression(expr) => {
            out.push_str(&render_expr(expr, 0));
            out.push_str(";\n");
        }
        Statement::Return(value) => {
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                out.push_str(&render_expr(value, 0));
            }
            out.push_str(";\n");
        }
        Statement::If {
            condition,
            then_block,
            else_block,
        } => {
            out.push_str("if (");
            out.push_str(&render_expr(condition, 0));
            out.push_str(") {\n");
            for statement in then_block {
                print_statement(out, statement, depth + 1);
            }
            push_indent(out, depth);
            out.push('}');
            if let Some(else_block) = else_block {
                out.push_str(" else {\n");
                for statement in else_block {
                    print_statement(out, statement, depth + 1);
                }
                push_indent(out, depth);
                out.push('}');
            }
            out.push('\n');
        }
        Statement::While { condition, body } => {
            out.push_str("while (");
            out.push_str(&render_expr(condition, 0));
            out.push_str(") {\n");
            for statement in body {
                print_statement(out, statement, depth + 1);
            }
            push_indent(out, depth);
            out.push_str("}\n");
        }
    }
}

/// Precedence of postfix expressions (calls, member access)
const POSTFIX_PREC: u8 = 8;
/// Precedence of unary expressions
const UNARY_PREC: u8 = 7;

fn render_expr(expr: &Expression, parent_prec: u8) -> String {
    match expr {
        Expression::Literal(literal) => render_literal(literal),
        Expression::Ident(name) => name.clone(),
        Expression::This => "this".to_string(),
        Expression::Field { object, name } => {
            format!("{}.{}", render_expr(object, POSTFIX_PREC), name)
        }
        Expression::Call { callee, args } => {
            let rendered: Vec<String> = args.iter().map(|a| render_expr(a, 0)).collect();
            format!(
                "{}({})",
                render_expr(callee, POSTFIX_PREC),
                rendered.join(", ")
            )
        }
        Expression::New { class, args } => {
            let rendered: Vec<String> = args.iter().map(|a| render_expr(a, 0)).collect();
            format!("new {}({})", class, rendered.join(", "))
        }
        Expression::Unary { op, operand } => {
            let text = format!("{}{}", op.symbol(), render_expr(operand, UNARY_PREC));
            maybe_paren(text, UNARY_PREC, parent_prec)
        }
        Expression::Binary { op, lhs, rhs } => {
            let prec = op.precedence();
            let text = format!(
                "{} {} {}",
                render_expr(lhs, prec),
                op.symbol(),
                render_expr(rhs, prec + 1)
            );
            maybe_paren(text, prec, parent_prec)
        }
        Expression::Assign { target, value } => {
            let text = format!(
                "{} = {}",
                render_expr(target, POSTFIX_PREC),
                render_expr(value, 0)
            );
            maybe_paren(text, 0, parent_prec)
        }
    }
}

fn maybe_paren(text: String, prec: u8, parent_prec: u8) -> String {
    if prec < parent_prec {
        format!("({text})")
    } else {
        text
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Bool(v) => v.to_string(),
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => render_float(*v),
        Literal::Str(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    _ => out.push(c),
                }
            }
            out.push('"');
            out
        }
    }
}

fn render_float(v: f64) -> String {
    let s = format!("{v:?}");
    // The grammar has no exponent form; fall back to plain decimal notation
    if s.contains('.') && !s.contains('e') && !s.contains('E') {
        s
    } else {
        format!("{v:.1}")
    }
}
