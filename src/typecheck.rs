// Operator typing contracts, plus a checker for whole expressions (used for diagnostics and tests)

use crate::ast::{BindX, BvOp, Expr, ExprX, Op, Typ, TypVar, TypX, TypeError, Var};
use crate::ast_util::{bool_typ, bv_typ, int_typ, subst_typ};
use crate::printer::{node_to_compact_string, op_to_node, typ_to_node};
use crate::scope_map::ScopeMap;
use std::collections::HashMap;

impl Op {
    pub fn arity(&self) -> usize {
        match self {
            Op::Not | Op::BvNot | Op::Label(..) | Op::BvExtract(..) => 1,
            Op::Eq | Op::Neq | Op::And | Op::Or | Op::Implies => 2,
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => 2,
            Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::Subtype => 2,
            Op::Bv(_) | Op::BvConcat => 2,
            Op::IfThenElse => 3,
            Op::Distinct(n) => *n,
            Op::Select { arity, .. } | Op::Store { arity, .. } => *arity,
            Op::Fun(fun) => fun.params.len(),
        }
    }

    pub fn typ_arity(&self) -> usize {
        match self {
            Op::Select { typ_arity, .. } | Op::Store { typ_arity, .. } => *typ_arity,
            Op::Fun(fun) => fun.typ_params.len(),
            _ => 0,
        }
    }
}

fn op_name(op: &Op) -> String {
    node_to_compact_string(&op_to_node(op))
}

fn typ_name(typ: &Typ) -> String {
    node_to_compact_string(&typ_to_node(typ))
}

fn expect_typ(op: &Op, i: usize, found: &Typ, expected: &Typ) -> Result<(), TypeError> {
    if found == expected {
        Ok(())
    } else {
        Err(format!(
            "in call to {}, argument #{} has type {} when it should have type {}",
            op_name(op),
            i + 1,
            typ_name(found),
            typ_name(expected)
        ))
    }
}

fn get_bv_width(op: &Op, typ: &Typ) -> Result<u32, TypeError> {
    match &**typ {
        TypX::BitVec(width) => Ok(*width),
        _ => Err(format!("in call to {}, expected a bit vector, found {}", op_name(op), typ_name(typ))),
    }
}

fn instantiate(params: &[TypVar], typ_args: &[Typ]) -> HashMap<TypVar, Typ> {
    params.iter().cloned().zip(typ_args.iter().cloned()).collect()
}

/// Result type of applying op, or an error if the arguments violate op's contract
pub fn infer_typ(op: &Op, arg_typs: &[Typ], typ_args: &[Typ]) -> Result<Typ, TypeError> {
    if arg_typs.len() != op.arity() {
        return Err(format!(
            "in call to {}, expected {} arguments, found {} arguments",
            op_name(op),
            op.arity(),
            arg_typs.len()
        ));
    }
    if typ_args.len() != op.typ_arity() {
        return Err(format!(
            "in call to {}, expected {} type arguments, found {} type arguments",
            op_name(op),
            op.typ_arity(),
            typ_args.len()
        ));
    }
    let bt = bool_typ();
    let it = int_typ();
    match op {
        Op::Not | Op::Label(..) => {
            expect_typ(op, 0, &arg_typs[0], &bt)?;
            Ok(bt)
        }
        Op::And | Op::Or | Op::Implies => {
            expect_typ(op, 0, &arg_typs[0], &bt)?;
            expect_typ(op, 1, &arg_typs[1], &bt)?;
            Ok(bt)
        }
        Op::Eq | Op::Neq | Op::Subtype | Op::Distinct(_) => {
            for (i, typ) in arg_typs.iter().enumerate().skip(1) {
                expect_typ(op, i, typ, &arg_typs[0])?;
            }
            Ok(bt)
        }
        Op::IfThenElse => {
            expect_typ(op, 0, &arg_typs[0], &bt)?;
            expect_typ(op, 2, &arg_typs[2], &arg_typs[1])?;
            Ok(arg_typs[1].clone())
        }
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => {
            expect_typ(op, 0, &arg_typs[0], &it)?;
            expect_typ(op, 1, &arg_typs[1], &it)?;
            Ok(it)
        }
        Op::Lt | Op::Le | Op::Gt | Op::Ge => {
            expect_typ(op, 0, &arg_typs[0], &it)?;
            expect_typ(op, 1, &arg_typs[1], &it)?;
            Ok(bt)
        }
        Op::BvNot => {
            let width = get_bv_width(op, &arg_typs[0])?;
            Ok(bv_typ(width))
        }
        Op::Bv(bv) => {
            let width = get_bv_width(op, &arg_typs[0])?;
            expect_typ(op, 1, &arg_typs[1], &arg_typs[0])?;
            match bv {
                BvOp::ULt | BvOp::ULe | BvOp::UGt | BvOp::UGe => Ok(bt),
                _ => Ok(bv_typ(width)),
            }
        }
        Op::BvExtract(start, end) => {
            let width = get_bv_width(op, &arg_typs[0])?;
            if start >= end || *end > width {
                return Err(format!(
                    "cannot extract bits [{}, {}) from a bit vector of width {}",
                    start, end, width
                ));
            }
            Ok(bv_typ(end - start))
        }
        Op::BvConcat => {
            let w1 = get_bv_width(op, &arg_typs[0])?;
            let w2 = get_bv_width(op, &arg_typs[1])?;
            Ok(bv_typ(w1 + w2))
        }
        Op::Select { arity, typ_arity } | Op::Store { arity, typ_arity } => {
            let is_store = matches!(op, Op::Store { .. });
            let min_arity = if is_store { 2 } else { 1 };
            if *arity < min_arity {
                return Err(format!("{} has too few arguments", op_name(op)));
            }
            let m = match &*arg_typs[0] {
                TypX::Map(m) => m.clone(),
                _ => {
                    return Err(format!(
                        "in call to {}, expected a map, found {}",
                        op_name(op),
                        typ_name(&arg_typs[0])
                    ));
                }
            };
            let n_indices = if is_store { arity - 2 } else { arity - 1 };
            if m.args.len() != n_indices || m.typ_params.len() != *typ_arity {
                return Err(format!(
                    "in call to {}, map of type {} does not match operator arity",
                    op_name(op),
                    typ_name(&arg_typs[0])
                ));
            }
            let subst = instantiate(&m.typ_params, typ_args);
            for (i, index_typ) in m.args.iter().enumerate() {
                expect_typ(op, i + 1, &arg_typs[i + 1], &subst_typ(index_typ, &subst))?;
            }
            let result = subst_typ(&m.result, &subst);
            if is_store {
                expect_typ(op, arity - 1, &arg_typs[arity - 1], &result)?;
                Ok(arg_typs[0].clone())
            } else {
                Ok(result)
            }
        }
        Op::Fun(fun) => {
            let subst = instantiate(&fun.typ_params, typ_args);
            for (i, param) in fun.params.iter().enumerate() {
                expect_typ(op, i, &arg_typs[i], &subst_typ(param, &subst))?;
            }
            Ok(subst_typ(&fun.ret, &subst))
        }
    }
}

fn check_expr_in(bound: &mut ScopeMap<Var, ()>, expr: &Expr) -> Result<Typ, TypeError> {
    match &**expr {
        ExprX::Const(_) | ExprX::Var(_) => Ok(expr.typ()),
        ExprX::Apply { op, args, typ_args, typ } => {
            let mut arg_typs: Vec<Typ> = Vec::new();
            for arg in args.iter() {
                arg_typs.push(check_expr_in(bound, arg)?);
            }
            let t = infer_typ(op, &arg_typs, typ_args)?;
            if &t != typ {
                return Err(format!(
                    "in call to {}, cached type {} differs from inferred type {}",
                    op_name(op),
                    typ_name(typ),
                    typ_name(&t)
                ));
            }
            Ok(t)
        }
        ExprX::Bind(bind, body) => {
            bound.push_scope();
            let result = check_bind(bound, bind, body);
            bound.pop_scope();
            result
        }
    }
}

fn check_bind(bound: &mut ScopeMap<Var, ()>, bind: &BindX, body: &Expr) -> Result<Typ, TypeError> {
    match bind {
        BindX::Let(binders) => {
            for binder in binders.iter() {
                bound
                    .insert(binder.var.clone(), ())
                    .map_err(|_| format!("variable {} is already bound", binder.var.name))?;
            }
            for binder in binders.iter() {
                let t = check_expr_in(bound, &binder.a)?;
                if t != binder.var.typ {
                    return Err(format!(
                        "let-bound variable {} has type {} but is bound to an expression of type {}",
                        binder.var.name,
                        typ_name(&binder.var.typ),
                        typ_name(&t)
                    ));
                }
            }
            check_expr_in(bound, body)
        }
        BindX::Quant(_, _, vars, triggers, _) => {
            for x in vars.iter() {
                bound
                    .insert(x.clone(), ())
                    .map_err(|_| format!("variable {} is already bound", x.name))?;
            }
            for trigger in triggers.iter() {
                if trigger.exprs.len() == 0 {
                    return Err("empty trigger".to_string());
                }
                for e in trigger.exprs.iter() {
                    check_expr_in(bound, e)?;
                }
            }
            let t = check_expr_in(bound, body)?;
            if *t != TypX::Bool {
                return Err(format!("quantifier body has type {}, expected Bool", typ_name(&t)));
            }
            Ok(t)
        }
    }
}

/// Check every node of expr against its operator's contract, and check that no variable
/// is bound twice along a path from the root
pub fn check_expr(expr: &Expr) -> Result<Typ, TypeError> {
    let mut bound: ScopeMap<Var, ()> = ScopeMap::new();
    check_expr_in(&mut bound, expr)
}
