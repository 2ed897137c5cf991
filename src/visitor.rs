use crate::ast::{BindX, Binder, BinderX, Expr, ExprX, Fun, Op, Trigger, TriggerX, Var};
use crate::generator::Generator;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

enum Visit<'a> {
    Expr(&'a Expr),
    PopBound(usize),
}

fn collect_free_vars<'a>(expr: &'a Expr, free: &mut IndexSet<Var>) {
    let mut bound: Vec<Var> = Vec::new();
    let mut stack: Vec<Visit<'a>> = vec![Visit::Expr(expr)];
    while let Some(visit) = stack.pop() {
        let e = match visit {
            Visit::PopBound(depth) => {
                bound.truncate(depth);
                continue;
            }
            Visit::Expr(e) => e,
        };
        match &**e {
            ExprX::Const(_) => {}
            ExprX::Var(x) => {
                if !bound.contains(x) {
                    free.insert(x.clone());
                }
            }
            ExprX::Apply { args, .. } => {
                for arg in args.iter().rev() {
                    stack.push(Visit::Expr(arg));
                }
            }
            ExprX::Bind(bind, body) => {
                stack.push(Visit::PopBound(bound.len()));
                stack.push(Visit::Expr(body));
                match &**bind {
                    BindX::Let(binders) => {
                        for b in binders.iter() {
                            bound.push(b.var.clone());
                            stack.push(Visit::Expr(&b.a));
                        }
                    }
                    BindX::Quant(_, _, vars, triggers, _) => {
                        bound.extend(vars.iter().cloned());
                        for trigger in triggers.iter() {
                            for t in trigger.exprs.iter() {
                                stack.push(Visit::Expr(t));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Free term variables, in order of first occurrence
pub fn free_vars(expr: &Expr) -> IndexSet<Var> {
    let mut free = IndexSet::new();
    collect_free_vars(expr, &mut free);
    free
}

pub fn free_vars_of_all(exprs: &[Expr]) -> IndexSet<Var> {
    let mut free = IndexSet::new();
    for expr in exprs {
        collect_free_vars(expr, &mut free);
    }
    free
}

/// Number of nodes, counting trigger expressions and let right-hand sides
pub fn expr_size(expr: &Expr) -> usize {
    let mut size = 0;
    let mut stack: Vec<&Expr> = vec![expr];
    while let Some(e) = stack.pop() {
        size += 1;
        match &**e {
            ExprX::Const(_) | ExprX::Var(_) => {}
            ExprX::Apply { args, .. } => stack.extend(args.iter()),
            ExprX::Bind(bind, body) => {
                stack.push(body);
                match &**bind {
                    BindX::Let(binders) => stack.extend(binders.iter().map(|b| &b.a)),
                    BindX::Quant(_, _, _, triggers, _) => {
                        for trigger in triggers.iter() {
                            stack.extend(trigger.exprs.iter());
                        }
                    }
                }
            }
        }
    }
    size
}

struct Substituter<'a> {
    gen: &'a Generator,
    // free variables of the replacement expressions; binders of these get renamed
    range_vars: IndexSet<Var>,
}

impl<'a> Substituter<'a> {
    fn enter_binder(&self, x: &Var, subst: &mut HashMap<Var, Expr>) -> Var {
        subst.remove(x);
        if self.range_vars.contains(x) {
            let fresh = self.gen.rename_var(x, &x.typ);
            subst.insert(x.clone(), self.gen.var(&fresh));
            fresh
        } else {
            x.clone()
        }
    }

    fn subst_expr(&self, expr: &Expr, subst: &HashMap<Var, Expr>) -> Expr {
        if subst.is_empty() {
            return expr.clone();
        }
        match &**expr {
            ExprX::Const(_) => expr.clone(),
            ExprX::Var(x) => match subst.get(x) {
                Some(e) => e.clone(),
                None => expr.clone(),
            },
            ExprX::Apply { op, args, typ_args, typ } => {
                let args = args.iter().map(|e| self.subst_expr(e, subst)).collect();
                let typ_args = (**typ_args).clone();
                self.gen.mk_apply(op.clone(), args, typ_args, typ.clone())
            }
            ExprX::Bind(bind, body) => {
                let mut inner = subst.clone();
                let bind = match &**bind {
                    BindX::Let(binders) => {
                        let vars: Vec<Var> =
                            binders.iter().map(|b| self.enter_binder(&b.var, &mut inner)).collect();
                        let mut new_binders: Vec<Binder<Expr>> = Vec::new();
                        for (x, b) in vars.into_iter().zip(binders.iter()) {
                            let a = self.subst_expr(&b.a, &inner);
                            new_binders.push(Arc::new(BinderX { var: x, a }));
                        }
                        BindX::Let(Arc::new(new_binders))
                    }
                    BindX::Quant(quant, typ_params, vars, triggers, info) => {
                        let vars: Vec<Var> =
                            vars.iter().map(|x| self.enter_binder(x, &mut inner)).collect();
                        let mut new_triggers: Vec<Trigger> = Vec::new();
                        for trigger in triggers.iter() {
                            let exprs =
                                trigger.exprs.iter().map(|e| self.subst_expr(e, &inner)).collect();
                            new_triggers
                                .push(Arc::new(TriggerX { pos: trigger.pos, exprs: Arc::new(exprs) }));
                        }
                        BindX::Quant(
                            *quant,
                            typ_params.clone(),
                            Arc::new(vars),
                            Arc::new(new_triggers),
                            info.clone(),
                        )
                    }
                };
                let body = self.subst_expr(body, &inner);
                Arc::new(ExprX::Bind(Arc::new(bind), body))
            }
        }
    }
}

/// Capture-avoiding substitution of expressions for free variables
pub fn substitute(gen: &Generator, expr: &Expr, subst: &HashMap<Var, Expr>) -> Expr {
    let range: Vec<Expr> = subst.values().cloned().collect();
    let substituter = Substituter { gen, range_vars: free_vars_of_all(&range) };
    substituter.subst_expr(expr, subst)
}

/// Among candidates, the variables that occur in exprs only as the direct argument of a cast
/// into the universal sort.
/// Direct variable arguments of the logical connectives, equalities and integer comparisons
/// are not counted as occurrences.
pub fn cast_only_vars<F: Fn(&Fun) -> bool>(
    exprs: &[Expr],
    candidates: &[Var],
    is_cast: F,
) -> Vec<Var> {
    let mut in_cast: HashSet<Var> = HashSet::new();
    let mut outside: HashSet<Var> = HashSet::new();
    let mut stack: Vec<&Expr> = exprs.iter().collect();
    while let Some(e) = stack.pop() {
        match &**e {
            ExprX::Const(_) => {}
            ExprX::Var(x) => {
                outside.insert(x.clone());
            }
            ExprX::Apply { op: Op::Fun(fun), args, .. } if args.len() == 1 && is_cast(fun) => {
                match &*args[0] {
                    ExprX::Var(x) => {
                        in_cast.insert(x.clone());
                    }
                    _ => stack.push(&args[0]),
                }
            }
            ExprX::Apply { op, args, .. } => {
                let skip_direct_vars = matches!(
                    op,
                    Op::Not
                        | Op::Eq
                        | Op::Neq
                        | Op::And
                        | Op::Or
                        | Op::Implies
                        | Op::Lt
                        | Op::Le
                        | Op::Gt
                        | Op::Ge
                );
                for arg in args.iter() {
                    if skip_direct_vars && matches!(&**arg, ExprX::Var(_)) {
                        continue;
                    }
                    stack.push(arg);
                }
            }
            ExprX::Bind(bind, body) => {
                stack.push(body);
                match &**bind {
                    BindX::Let(binders) => stack.extend(binders.iter().map(|b| &b.a)),
                    BindX::Quant(_, _, _, triggers, _) => {
                        for trigger in triggers.iter() {
                            stack.extend(trigger.exprs.iter());
                        }
                    }
                }
            }
        }
    }
    candidates.iter().filter(|x| in_cast.contains(*x) && !outside.contains(*x)).cloned().collect()
}
