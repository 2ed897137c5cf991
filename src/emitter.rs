use crate::ast::{Expr, Fun};
use crate::printer::{expr_to_node, fun_decl_to_node, macro_push_node, node_to_string_indent};
use sise::Node;
use std::io::Write;

pub(crate) struct Emitter {
    /// log file
    log: Option<Box<dyn std::io::Write>>,
    /// string of space characters representing current indentation level
    current_indent: String,
}

impl Emitter {
    pub fn new(writer: Option<Box<dyn std::io::Write>>) -> Self {
        Emitter { log: writer, current_indent: "".to_string() }
    }

    pub fn set_log(&mut self, writer: Option<Box<dyn std::io::Write>>) {
        self.log = writer;
    }

    pub fn is_none(&self) -> bool {
        self.log.is_none()
    }

    pub fn indent(&mut self) {
        if let Some(_) = self.log {
            self.current_indent = self.current_indent.clone() + " ";
        }
    }

    pub fn unindent(&mut self) {
        if let Some(_) = self.log {
            self.current_indent = self.current_indent[1..].to_string();
        }
    }

    pub fn blank_line(&mut self) {
        if let Some(w) = &mut self.log {
            writeln!(w, "").unwrap();
            w.flush().unwrap();
        }
    }

    pub fn comment(&mut self, s: &str) {
        if let Some(w) = &mut self.log {
            writeln!(w, "{};; {}", self.current_indent, s).unwrap();
            w.flush().unwrap();
        }
    }

    pub fn log_node(&mut self, node: &Node) {
        if let Some(w) = &mut self.log {
            writeln!(
                w,
                "{}{}",
                self.current_indent,
                node_to_string_indent(&self.current_indent, &node)
            )
            .unwrap();
            w.flush().unwrap();
        }
    }

    pub fn log_fun_decl(&mut self, fun: &Fun) {
        if !self.is_none() {
            self.log_node(&fun_decl_to_node(fun));
        }
    }

    pub fn log_axiom(&mut self, expr: &Expr) {
        if !self.is_none() {
            self.log_node(&nodes!(axiom {expr_to_node(expr)}));
        }
    }

    pub fn log_erased(&mut self, label: &str, expr: &Expr) {
        if !self.is_none() {
            self.indent();
            self.comment(label);
            self.log_node(&nodes!(assert {expr_to_node(expr)}));
            self.unindent();
        }
    }
}
