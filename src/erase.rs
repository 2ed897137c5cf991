//! Rewrites typed expressions into expressions over {int, bool, bitvector, U, T}.
//! This module holds the parts that do not depend on how type information is encoded:
//! variable bindings, casting of operator arguments, lets, and the quantifier redo.
//! Functions, maps and quantifier bodies are handled in premises.

use crate::ast::{
    BindX, Binder, Binders, Expr, ExprX, Op, Polarity, Quant, QuantInfo, Triggers, Typ, TypVar,
    TypVars, TypX, Var, Vars,
};
use crate::ast_util::{bool_typ, int_typ};
use crate::axioms::AxiomBuilder;
use crate::generator::Generator;
use crate::visitor::{cast_only_vars, free_vars_of_all};

pub type TypVarBindings = im::HashMap<TypVar, Var>;

/// Scoped mapping from typed variables to their untyped counterparts, and from type
/// variables to the variables of sort T that stand for them.
/// Entering a binder clones the bindings; the enclosing scope is never affected.
#[derive(Clone, Default)]
pub struct VariableBindings {
    pub vars: im::HashMap<Var, Var>,
    pub typ_vars: TypVarBindings,
}

pub(crate) struct QuantParts<'e> {
    pub(crate) quant: Quant,
    pub(crate) typ_params: &'e TypVars,
    pub(crate) vars: &'e Vars,
    pub(crate) triggers: &'e Triggers,
    pub(crate) info: &'e QuantInfo,
    pub(crate) body: &'e Expr,
}

pub struct Eraser<'a> {
    pub(crate) gen: Generator,
    pub(crate) axioms: &'a mut AxiomBuilder,
    pub(crate) polarity: Polarity,
}

enum AndOr<'e> {
    Visit(&'e Expr),
    Build(&'e Op),
}

impl<'a> Eraser<'a> {
    pub fn new(axioms: &'a mut AxiomBuilder) -> Self {
        Eraser { gen: axioms.gen.clone(), axioms, polarity: Polarity::Neutral }
    }

    /// Erase a closed formula. Negative polarity for formulas that are assumed,
    /// positive for formulas that are to be proven.
    pub fn erase(&mut self, expr: &Expr, polarity: Polarity) -> Expr {
        self.polarity = polarity;
        let erased = self.erase_expr(expr, &VariableBindings::default());
        if *expr.typ() == TypX::Bool { self.axioms.cast(&erased, &bool_typ()) } else { erased }
    }

    pub(crate) fn erase_with_polarity(
        &mut self,
        expr: &Expr,
        bindings: &VariableBindings,
        polarity: Polarity,
    ) -> Expr {
        let saved = self.polarity;
        self.polarity = polarity;
        let erased = self.erase_expr(expr, bindings);
        self.polarity = saved;
        erased
    }

    pub(crate) fn erase_expr(&mut self, expr: &Expr, bindings: &VariableBindings) -> Expr {
        match &**expr {
            ExprX::Const(_) => expr.clone(),
            ExprX::Var(x) => match bindings.vars.get(x) {
                Some(v) => self.gen.var(v),
                None => {
                    let v = self.axioms.untyped_var(x);
                    self.gen.var(&v)
                }
            },
            ExprX::Apply { op, args, typ_args, typ } => {
                self.erase_apply(expr, op, args, typ_args, typ, bindings)
            }
            ExprX::Bind(bind, body) => match &**bind {
                BindX::Let(binders) => self.erase_let(binders, body, bindings),
                BindX::Quant(quant, typ_params, vars, triggers, info) => {
                    let q = QuantParts { quant: *quant, typ_params, vars, triggers, info, body };
                    self.erase_quant(&q, bindings)
                }
            },
        }
    }

    // Operators

    fn cast_args(
        &mut self,
        args: &[Expr],
        typ: &Typ,
        bindings: &VariableBindings,
        polarity: Polarity,
    ) -> Vec<Expr> {
        let mut new_args: Vec<Expr> = Vec::new();
        for arg in args {
            let erased = self.erase_with_polarity(arg, bindings, polarity);
            new_args.push(self.axioms.cast(&erased, typ));
        }
        new_args
    }

    /// Cast to the common old type if it is kept by erasure, otherwise to U
    fn cast_args_to_old_typ(&mut self, args: &[Expr], bindings: &VariableBindings) -> Vec<Expr> {
        if args.len() == 0 {
            return vec![];
        }
        let old = args[0].typ();
        let target = if self.axioms.unchanged_typ(&old) && args.iter().all(|a| a.typ() == old) {
            old
        } else {
            self.axioms.u_typ().clone()
        };
        self.cast_args(args, &target, bindings, Polarity::Neutral)
    }

    /// Cast every argument back to its own old type (all of which must be kept by erasure)
    pub(crate) fn cast_args_to_own_old_typs(
        &mut self,
        args: &[Expr],
        bindings: &VariableBindings,
    ) -> Vec<Expr> {
        let mut new_args: Vec<Expr> = Vec::new();
        for arg in args {
            let erased = self.erase_with_polarity(arg, bindings, Polarity::Neutral);
            new_args.push(self.axioms.cast(&erased, &arg.typ()));
        }
        new_args
    }

    fn erase_apply(
        &mut self,
        expr: &Expr,
        op: &Op,
        args: &[Expr],
        typ_args: &[Typ],
        typ: &Typ,
        bindings: &VariableBindings,
    ) -> Expr {
        let new_args = match op {
            Op::And | Op::Or => return self.erase_and_or(expr, bindings),
            Op::Not => {
                let polarity = self.polarity.negate();
                self.cast_args(args, &bool_typ(), bindings, polarity)
            }
            Op::Implies => {
                let polarity = self.polarity;
                let lhs = self.erase_with_polarity(&args[0], bindings, polarity.negate());
                let rhs = self.erase_with_polarity(&args[1], bindings, polarity);
                vec![self.axioms.cast(&lhs, &bool_typ()), self.axioms.cast(&rhs, &bool_typ())]
            }
            Op::Label(..) => {
                let polarity = self.polarity;
                self.cast_args(args, &bool_typ(), bindings, polarity)
            }
            Op::Eq | Op::Neq | Op::Distinct(_) | Op::BvNot | Op::Bv(_) => {
                self.cast_args_to_old_typ(args, bindings)
            }
            Op::BvExtract(..) | Op::BvConcat => self.cast_args_to_own_old_typs(args, bindings),
            Op::IfThenElse => {
                let cond = self.erase_with_polarity(&args[0], bindings, Polarity::Neutral);
                let cond = self.axioms.cast(&cond, &bool_typ());
                let branch_typ = self.axioms.typ_after_erasure(typ);
                let mut new_args = vec![cond];
                new_args.extend(self.cast_args(&args[1..], &branch_typ, bindings, Polarity::Neutral));
                new_args
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => {
                self.cast_args(args, &int_typ(), bindings, Polarity::Neutral)
            }
            Op::Lt | Op::Le | Op::Gt | Op::Ge => {
                self.cast_args(args, &int_typ(), bindings, Polarity::Neutral)
            }
            Op::Subtype => {
                let u = self.axioms.u_typ().clone();
                self.cast_args(args, &u, bindings, Polarity::Neutral)
            }
            Op::Select { .. } | Op::Store { .. } => {
                return self.erase_select_store(op, args, typ_args, bindings);
            }
            Op::Fun(fun) => return self.erase_fun_app(fun, args, typ_args, bindings),
        };
        self.gen.function(op.clone(), new_args, vec![])
    }

    /// Nested and/or chains are erased with an explicit stack rather than by recursion
    fn erase_and_or(&mut self, expr: &Expr, bindings: &VariableBindings) -> Expr {
        let bt = bool_typ();
        let mut work: Vec<AndOr> = vec![AndOr::Visit(expr)];
        let mut done: Vec<Expr> = Vec::new();
        while let Some(w) = work.pop() {
            match w {
                AndOr::Visit(e) => match &**e {
                    ExprX::Apply { op: op @ (Op::And | Op::Or), args, .. } => {
                        work.push(AndOr::Build(op));
                        work.push(AndOr::Visit(&args[1]));
                        work.push(AndOr::Visit(&args[0]));
                    }
                    _ => {
                        let erased = self.erase_expr(e, bindings);
                        done.push(self.axioms.cast(&erased, &bt));
                    }
                },
                AndOr::Build(op) => {
                    let rhs = done.pop().expect("internal error: and/or operand");
                    let lhs = done.pop().expect("internal error: and/or operand");
                    done.push(self.gen.function(op.clone(), vec![lhs, rhs], vec![]));
                }
            }
        }
        done.pop().expect("internal error: and/or result")
    }

    fn erase_let(&mut self, binders: &Binders<Expr>, body: &Expr, bindings: &VariableBindings) -> Expr {
        let mut inner = bindings.clone();
        let mut new_vars: Vec<Var> = Vec::new();
        for binder in binders.iter() {
            let typ = self.axioms.typ_after_erasure(&binder.var.typ);
            let v = self.gen.rename_var(&binder.var, &typ);
            inner.vars.insert(binder.var.clone(), v.clone());
            new_vars.push(v);
        }
        let mut new_binders: Vec<Binder<Expr>> = Vec::new();
        for (binder, v) in binders.iter().zip(new_vars.iter()) {
            let rhs = self.erase_with_polarity(&binder.a, &inner, Polarity::Neutral);
            let rhs = self.axioms.cast(&rhs, &v.typ);
            new_binders.push(self.gen.let_binding(v, &rhs));
        }
        let body = self.erase_expr(body, &inner);
        self.gen.let_(new_binders, &body)
    }

    // Quantifiers

    /// Bound variables that occur in the body or in a trigger, in declaration order
    fn occurring_vars(&self, q: &QuantParts) -> Vec<Var> {
        let mut exprs: Vec<Expr> = vec![q.body.clone()];
        for trigger in q.triggers.iter() {
            exprs.extend(trigger.exprs.iter().cloned());
        }
        let free = free_vars_of_all(&exprs);
        q.vars.iter().filter(|x| free.contains(*x)).cloned().collect()
    }

    /// Fresh untyped variables for occurring, recorded in bindings; variables in retype_as_u
    /// get sort U regardless of their type
    fn bind_erased_vars(
        &mut self,
        occurring: &[Var],
        bindings: &mut VariableBindings,
        retype_as_u: &[Var],
    ) -> Vec<Var> {
        let mut new_vars: Vec<Var> = Vec::new();
        for x in occurring {
            let typ = if retype_as_u.contains(x) {
                self.axioms.u_typ().clone()
            } else {
                self.axioms.typ_after_erasure(&x.typ)
            };
            let v = self.gen.rename_var(x, &typ);
            bindings.vars.insert(x.clone(), v.clone());
            new_vars.push(v);
        }
        new_vars
    }

    /// The quantifier behaves universally once the polarity of its context is taken into account
    fn is_effectively_universal(&self, quant: Quant) -> bool {
        match (self.polarity, quant) {
            (Polarity::Positive, Quant::Exists) | (Polarity::Negative, Quant::Forall) => true,
            _ => false,
        }
    }

    /// Old variables whose erased counterparts are only used inside casts to U,
    /// in the positive triggers of erased or, if there are none, in its body
    fn cast_variables(&self, erased: &Expr, occurring: &[Var], new_vars: &[Var]) -> Vec<Var> {
        let (triggers, body) = match &**erased {
            ExprX::Bind(bind, body) => match &**bind {
                BindX::Quant(_, _, _, triggers, _) => (triggers, body),
                BindX::Let(_) => return vec![],
            },
            _ => return vec![],
        };
        let mut exprs: Vec<Expr> = Vec::new();
        for trigger in triggers.iter().filter(|t| t.pos) {
            exprs.extend(trigger.exprs.iter().cloned());
        }
        if exprs.len() == 0 {
            exprs.push(body.clone());
        }
        let found = cast_only_vars(&exprs, new_vars, |f| self.axioms.is_cast_to_u(f));
        occurring
            .iter()
            .zip(new_vars.iter())
            .filter(|(_, v)| found.contains(v))
            .map(|(x, _)| x.clone())
            .collect()
    }

    fn erase_quant(&mut self, q: &QuantParts, bindings: &VariableBindings) -> Expr {
        let occurring = self.occurring_vars(q);
        let mut inner = bindings.clone();
        let new_vars = self.bind_erased_vars(&occurring, &mut inner, &[]);
        let erased = self.handle_quantifier(q, &occurring, &new_vars, inner);
        if erased.as_quant().is_none() || !self.is_effectively_universal(q.quant) {
            return erased;
        }
        let cast_vars = self.cast_variables(&erased, &occurring, &new_vars);
        if cast_vars.len() == 0 {
            return erased;
        }
        log::debug!(
            "re-erasing quantifier {:?}: variables {:?} only occur under casts",
            q.info.qid,
            cast_vars.iter().map(|x| x.name.clone()).collect::<Vec<_>>()
        );
        let mut inner = bindings.clone();
        let new_vars = self.bind_erased_vars(&occurring, &mut inner, &cast_vars);
        let redone = self.handle_quantifier(q, &occurring, &new_vars, inner);
        if self.cast_variables(&redone, &occurring, &new_vars).len() > 0 {
            log::debug!("quantifier {:?} still has variables only under casts", q.info.qid);
        }
        redone
    }
}
