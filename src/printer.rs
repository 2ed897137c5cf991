use crate::ast::{
    BindX, Binders, BvOp, Constant, Expr, ExprX, Fun, Op, Quant, QuantInfo, Triggers, TypX, Typs,
    Vars,
};
use crate::util::vec_map;
use num_traits::Signed;
use sise::{Node, Writer};

pub fn str_to_node(s: &str) -> Node {
    Node::Atom(s.to_string())
}

pub fn macro_push_node(nodes: &mut Vec<Node>, node: Node) {
    // turn a - b into a-b
    let len = nodes.len();
    if len != 0 {
        if let Node::Atom(cur) = &node {
            if let Node::Atom(prev) = &nodes[len - 1] {
                if node == "-" || prev == ":" || (prev != "-" && prev.ends_with("-")) {
                    nodes[len - 1] = Node::Atom(prev.to_owned() + cur);
                    return;
                }
            }
        }
    }
    nodes.push(node);
}

/*
examples:
  node!(my_atom)
  node!((atom1 atom2 atom-3))
  node!((atom1 (10 20 30) atom-3))
  let x = node!((10 20 30));
  node!((atom1 {x} atom-3))
There's some limited support for atoms containing hyphens, at least for atoms inside a list.
*/
#[macro_export]
macro_rules! node {
    ( - ) => { Node::Atom("-".to_string()) };
    ( { $x:expr } ) => { $x };
    ( [ $x:expr ] ) => { $x.clone() };
    ( $x:literal ) => { Node::Atom($x.to_string()) };
    ( ( $( $x:tt )* ) ) => {
        {
            #[allow(unused_mut)]
            let mut v = Vec::new();
            $(macro_push_node(&mut v, node!($x));)*
            Node::List(v)
        }
    };
    ( $x:tt ) => { Node::Atom(stringify!($x).to_string()) };
}
#[macro_export]
macro_rules! nodes {
   ( $( $x:tt )* ) => {
       {
           let mut v = Vec::new();
           $(macro_push_node(&mut v, node!($x));)*
           Node::List(v)
       }
   };
}

pub fn typ_to_node(typ: &TypX) -> Node {
    match typ {
        TypX::Bool => str_to_node("Bool"),
        TypX::Int => str_to_node("Int"),
        TypX::BitVec(size) => {
            Node::List(vec![str_to_node("_"), str_to_node("BitVec"), str_to_node(&size.to_string())])
        }
        TypX::Var(x) => str_to_node(&x.name),
        TypX::Ctor(c, args) if args.len() == 0 => str_to_node(&c.name),
        TypX::Ctor(c, args) => {
            let mut nodes = vec![str_to_node(&c.name)];
            nodes.extend(args.iter().map(|t| typ_to_node(t)));
            Node::List(nodes)
        }
        TypX::Map(m) => {
            let mut nodes = vec![str_to_node("Map")];
            if m.typ_params.len() > 0 {
                let mut params = vec![str_to_node("typ")];
                params.extend(m.typ_params.iter().map(|x| str_to_node(&x.name)));
                nodes.push(Node::List(params));
            }
            nodes.push(typs_to_node(&m.args));
            nodes.push(typ_to_node(&m.result));
            Node::List(nodes)
        }
    }
}

pub fn typs_to_node(typs: &Typs) -> Node {
    Node::List(vec_map(typs, |t| typ_to_node(t)))
}

fn constant_to_node(c: &Constant) -> Node {
    match c {
        Constant::Bool(b) => Node::Atom(b.to_string()),
        Constant::Int(i) if i.is_negative() => nodes!(- {Node::Atom((-i).to_string())}),
        Constant::Int(i) => Node::Atom(i.to_string()),
        Constant::BitVec(i, width) => Node::List(vec![
            str_to_node("_"),
            Node::Atom(format!("bv{}", i)),
            Node::Atom(width.to_string()),
        ]),
    }
}

fn bv_op_name(op: &BvOp) -> &'static str {
    match op {
        BvOp::Add => "bvadd",
        BvOp::Sub => "bvsub",
        BvOp::Mul => "bvmul",
        BvOp::And => "bvand",
        BvOp::Or => "bvor",
        BvOp::Xor => "bvxor",
        BvOp::Shl => "bvshl",
        BvOp::LShr => "bvlshr",
        BvOp::ULt => "bvult",
        BvOp::ULe => "bvule",
        BvOp::UGt => "bvugt",
        BvOp::UGe => "bvuge",
    }
}

pub(crate) fn op_to_node(op: &Op) -> Node {
    let s = match op {
        Op::Not => "not",
        Op::Eq => "=",
        Op::Neq => "!=",
        Op::And => "and",
        Op::Or => "or",
        Op::Implies => "=>",
        Op::Distinct(_) => "distinct",
        Op::Label(true, _) => "lblpos",
        Op::Label(false, _) => "lblneg",
        Op::IfThenElse => "ite",
        Op::Add => "+",
        Op::Sub => "-",
        Op::Mul => "*",
        Op::Div => "div",
        Op::Mod => "mod",
        Op::Lt => "<",
        Op::Le => "<=",
        Op::Gt => ">",
        Op::Ge => ">=",
        Op::Subtype => "<:",
        Op::BvNot => "bvnot",
        Op::Bv(bv) => bv_op_name(bv),
        Op::BvExtract(start, end) => {
            // ( (_ extract high low) e )
            return Node::List(vec![
                str_to_node("_"),
                str_to_node("extract"),
                Node::Atom((end - 1).to_string()),
                Node::Atom(start.to_string()),
            ]);
        }
        Op::BvConcat => "concat",
        Op::Select { .. } => "select",
        Op::Store { .. } => "store",
        Op::Fun(fun) => return str_to_node(&fun.name),
    };
    str_to_node(s)
}

fn vars_to_node(vars: &Vars) -> Node {
    Node::List(vec_map(vars, |x| Node::List(vec![str_to_node(&x.name), typ_to_node(&x.typ)])))
}

fn let_binders_to_node(binders: &Binders<Expr>) -> Node {
    Node::List(vec_map(binders, |b| Node::List(vec![str_to_node(&b.var.name), expr_to_node(&b.a)])))
}

fn body_with_triggers(body: Node, triggers: &Triggers, info: &QuantInfo) -> Node {
    let mut nodes: Vec<Node> = Vec::new();
    for trigger in triggers.iter() {
        nodes.push(str_to_node(if trigger.pos { ":pattern" } else { ":no-pattern" }));
        nodes.push(Node::List(vec_map(&trigger.exprs, |e| expr_to_node(e))));
    }
    if let Some(qid) = &info.qid {
        nodes.push(str_to_node(":qid"));
        nodes.push(str_to_node(qid));
    }
    if info.weight != 1 {
        nodes.push(str_to_node(":weight"));
        nodes.push(Node::Atom(info.weight.to_string()));
    }
    for (name, value) in info.attributes.iter() {
        nodes.push(Node::Atom(format!(":{}", name)));
        nodes.push(str_to_node(value));
    }
    if nodes.len() == 0 {
        body
    } else {
        nodes.insert(0, body);
        nodes.insert(0, str_to_node("!"));
        Node::List(nodes)
    }
}

pub fn expr_to_node(expr: &ExprX) -> Node {
    match expr {
        ExprX::Const(c) => constant_to_node(c),
        ExprX::Var(x) => str_to_node(&x.name),
        ExprX::Apply { op: Op::Fun(fun), args, typ_args, .. }
            if args.len() == 0 && typ_args.len() == 0 =>
        {
            str_to_node(&fun.name)
        }
        ExprX::Apply { op, args, typ_args, .. } => {
            let mut nodes: Vec<Node> = Vec::new();
            nodes.push(op_to_node(op));
            if let Op::Label(_, label) = op {
                nodes.push(str_to_node(label));
            }
            if typ_args.len() > 0 {
                let mut typs = vec![str_to_node("typ")];
                typs.extend(typ_args.iter().map(|t| typ_to_node(t)));
                nodes.push(Node::List(typs));
            }
            for arg in args.iter() {
                nodes.push(expr_to_node(arg));
            }
            Node::List(nodes)
        }
        ExprX::Bind(bind, body) => match &**bind {
            BindX::Let(binders) => {
                nodes!(let {let_binders_to_node(binders)} {expr_to_node(body)})
            }
            BindX::Quant(quant, typ_params, vars, triggers, info) => {
                let s_quant = match quant {
                    Quant::Forall => "forall",
                    Quant::Exists => "exists",
                };
                let mut nodes = vec![str_to_node(s_quant)];
                if typ_params.len() > 0 {
                    let mut params = vec![str_to_node("typ")];
                    params.extend(typ_params.iter().map(|x| str_to_node(&x.name)));
                    nodes.push(Node::List(params));
                }
                nodes.push(vars_to_node(vars));
                nodes.push(body_with_triggers(expr_to_node(body), triggers, info));
                Node::List(nodes)
            }
        },
    }
}

pub fn fun_decl_to_node(fun: &Fun) -> Node {
    let mut nodes = vec![str_to_node("declare-fun"), str_to_node(&fun.name)];
    if fun.typ_params.len() > 0 {
        let mut params = vec![str_to_node("typ")];
        params.extend(fun.typ_params.iter().map(|x| str_to_node(&x.name)));
        nodes.push(Node::List(params));
    }
    nodes.push(typs_to_node(&fun.params));
    nodes.push(typ_to_node(&fun.ret));
    Node::List(nodes)
}

/// Single-line rendering, convenient for comparing expressions in tests and log messages
pub fn node_to_compact_string(node: &Node) -> String {
    match node {
        Node::Atom(a) => a.clone(),
        Node::List(l) => format!("({})", vec_map(l, node_to_compact_string).join(" ")),
    }
}

pub fn expr_to_compact_string(expr: &Expr) -> String {
    node_to_compact_string(&expr_to_node(expr))
}

pub struct NodeWriter {}

impl NodeWriter {
    pub(crate) fn new() -> Self {
        NodeWriter {}
    }

    pub(crate) fn write_node(
        &mut self,
        writer: &mut sise::SpacedStringWriter,
        node: &Node,
        break_len: usize,
        brk: bool,
    ) {
        let opts =
            sise::SpacedStringWriterNodeOptions { break_line_len: if brk { 0 } else { break_len } };
        match node {
            Node::Atom(a) => {
                writer.write_atom(a, opts).unwrap();
            }
            Node::List(l) => {
                writer.begin_list(opts).unwrap();
                let mut brk = false;
                let mut was_pattern = false;
                for n in l {
                    self.write_node(writer, n, break_len + 1, brk && !was_pattern);
                    was_pattern = false;
                    match n {
                        Node::Atom(a)
                            if a == "=>"
                                || a == "and"
                                || a == "or"
                                || a == "ite"
                                || a == "let"
                                || a == "axiom"
                                || a == "assert"
                                || a == "!" =>
                        {
                            brk = true;
                        }
                        Node::Atom(a) if a == ":pattern" || a == ":no-pattern" => {
                            was_pattern = true;
                        }
                        _ => {}
                    }
                }
                writer.end_list(()).unwrap();
            }
        }
    }

    pub(crate) fn node_to_string_indent(&mut self, indent: &String, node: &Node) -> String {
        let indentation = " ";
        let style = sise::SpacedStringWriterStyle {
            line_break: &("\n".to_string() + &indent),
            indentation,
        };
        let mut result = String::new();
        let mut string_writer = sise::SpacedStringWriter::new(style, &mut result);
        self.write_node(&mut string_writer, &node, 80, false);
        string_writer.finish(()).unwrap();
        // Clean up result:
        let lines: Vec<&str> = result.lines().collect();
        let mut result: String = "".to_string();
        let mut i = 0;
        while i < lines.len() {
            let mut line = lines[i].to_owned();
            // Consolidate closing ) lines:
            if line.trim() == ")" {
                while i + 1 < lines.len() && lines[i + 1].trim() == ")" {
                    line = lines[i + 1].to_string() + &indentation[1..] + line.trim();
                    i += 1;
                }
            }
            result.push_str(&line);
            i += 1;
            if i < lines.len() {
                result.push_str("\n");
            }
        }
        result
    }
}

pub(crate) fn node_to_string_indent(indent: &String, node: &Node) -> String {
    NodeWriter::new().node_to_string_indent(indent, node)
}

pub(crate) fn node_to_string(node: &Node) -> String {
    node_to_string_indent(&"".to_string(), node)
}
