use crate::ast::{
    BindX, Binder, BvOp, Constant, Expr, ExprX, Fun, FunX, MapTypX, Op, Quant, QuantInfo, Trigger,
    TriggerX, Typ, TypCtor, TypCtorX, TypVar, TypVarX, TypX, TypeError, Uid, Var, VarX,
};
use crate::ast_util::{ident_binder, str_ident};
use crate::printer::{expr_to_compact_string, node_to_compact_string, typ_to_node};
use crate::typecheck::infer_typ;
use num_bigint::BigInt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Conjunct count beyond which implies_simp stops folding nested consequents into the antecedent
pub const IMPLIES_FOLD_LIMIT: usize = 64;

/// The one place where expressions, variables and symbols are created.
/// Shared by every producer of expressions so that true and false are interned once.
/// Clones share the uid counter, so objects made through a clone never collide with
/// objects made through the original.
#[derive(Clone)]
pub struct Generator {
    true_expr: Expr,
    false_expr: Expr,
    next_uid: Arc<AtomicU64>,
}

impl QuantInfo {
    pub fn anonymous() -> Self {
        QuantInfo { qid: None, weight: 1, attributes: Arc::new(vec![]) }
    }

    pub fn named(qid: &str) -> Self {
        QuantInfo { qid: Some(str_ident(qid)), weight: 1, attributes: Arc::new(vec![]) }
    }
}

fn approx_conjuncts(e: &Expr, limit: usize) -> usize {
    let mut count = 0;
    let mut stack: Vec<&Expr> = vec![e];
    while let Some(e) = stack.pop() {
        match &**e {
            ExprX::Apply { op: Op::And, args, .. } => {
                stack.push(&args[0]);
                stack.push(&args[1]);
            }
            _ => count += 1,
        }
        if count > limit {
            break;
        }
    }
    count
}

impl Generator {
    pub fn new() -> Self {
        Generator {
            true_expr: Arc::new(ExprX::Const(Constant::Bool(true))),
            false_expr: Arc::new(ExprX::Const(Constant::Bool(false))),
            next_uid: Arc::new(AtomicU64::new(1)),
        }
    }

    fn fresh_uid(&self) -> Uid {
        self.next_uid.fetch_add(1, Ordering::Relaxed)
    }

    pub fn mk_true(&self) -> Expr {
        self.true_expr.clone()
    }

    pub fn mk_false(&self) -> Expr {
        self.false_expr.clone()
    }

    pub fn mk_bool(&self, b: bool) -> Expr {
        if b { self.mk_true() } else { self.mk_false() }
    }

    pub fn mk_int(&self, i: i64) -> Expr {
        self.mk_big_int(BigInt::from(i))
    }

    pub fn mk_big_int(&self, i: BigInt) -> Expr {
        Arc::new(ExprX::Const(Constant::Int(i)))
    }

    pub fn mk_bitvec(&self, value: BigInt, width: u32) -> Expr {
        Arc::new(ExprX::Const(Constant::BitVec(value, width)))
    }

    // Named objects: each call creates a fresh identity

    pub fn new_typ_var(&self, name: &str) -> TypVar {
        Arc::new(TypVarX { name: str_ident(name), uid: self.fresh_uid() })
    }

    pub fn new_typ_ctor(&self, name: &str, arity: usize) -> TypCtor {
        Arc::new(TypCtorX { name: str_ident(name), arity, uid: self.fresh_uid() })
    }

    pub fn new_var(&self, name: &str, typ: &Typ) -> Var {
        Arc::new(VarX { name: str_ident(name), typ: typ.clone(), uid: self.fresh_uid() })
    }

    /// Fresh variable with the same name as x
    pub fn rename_var(&self, x: &Var, typ: &Typ) -> Var {
        Arc::new(VarX { name: x.name.clone(), typ: typ.clone(), uid: self.fresh_uid() })
    }

    pub fn new_fun(&self, name: &str, typ_params: Vec<TypVar>, params: Vec<Typ>, ret: &Typ) -> Fun {
        Arc::new(FunX {
            name: str_ident(name),
            typ_params: Arc::new(typ_params),
            params: Arc::new(params),
            ret: ret.clone(),
            uid: self.fresh_uid(),
        })
    }

    // Types

    pub fn ctor_typ(&self, ctor: &TypCtor, args: Vec<Typ>) -> Typ {
        if ctor.arity != args.len() {
            panic!(
                "internal error: type constructor {} expects {} arguments, found {}",
                ctor.name,
                ctor.arity,
                args.len()
            );
        }
        Arc::new(TypX::Ctor(ctor.clone(), Arc::new(args)))
    }

    pub fn map_typ(&self, typ_params: Vec<TypVar>, args: Vec<Typ>, result: &Typ) -> Typ {
        let m = MapTypX { typ_params: Arc::new(typ_params), args: Arc::new(args), result: result.clone() };
        Arc::new(TypX::Map(Arc::new(m)))
    }

    // Applications

    pub fn var(&self, x: &Var) -> Expr {
        Arc::new(ExprX::Var(x.clone()))
    }

    /// Build without checking; typ must be what infer_typ would return
    pub(crate) fn mk_apply(&self, op: Op, args: Vec<Expr>, typ_args: Vec<Typ>, typ: Typ) -> Expr {
        Arc::new(ExprX::Apply { op, args: Arc::new(args), typ_args: Arc::new(typ_args), typ })
    }

    pub fn try_function(
        &self,
        op: Op,
        args: Vec<Expr>,
        typ_args: Vec<Typ>,
    ) -> Result<Expr, TypeError> {
        let arg_typs: Vec<Typ> = args.iter().map(|e| e.typ()).collect();
        let typ = infer_typ(&op, &arg_typs, &typ_args)?;
        Ok(self.mk_apply(op, args, typ_args, typ))
    }

    /// Apply op; violating op's arity or typing contract is a programming error
    pub fn function(&self, op: Op, args: Vec<Expr>, typ_args: Vec<Typ>) -> Expr {
        match self.try_function(op, args, typ_args) {
            Ok(e) => e,
            Err(err) => panic!("internal error: ill-formed application: {}", err),
        }
    }

    pub fn apply(&self, fun: &Fun, args: Vec<Expr>) -> Expr {
        self.function(Op::Fun(fun.clone()), args, vec![])
    }

    pub fn apply_with_typs(&self, fun: &Fun, args: Vec<Expr>, typ_args: Vec<Typ>) -> Expr {
        self.function(Op::Fun(fun.clone()), args, typ_args)
    }

    pub fn not(&self, e: &Expr) -> Expr {
        self.function(Op::Not, vec![e.clone()], vec![])
    }

    pub fn and(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.function(Op::And, vec![e0.clone(), e1.clone()], vec![])
    }

    pub fn or(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.function(Op::Or, vec![e0.clone(), e1.clone()], vec![])
    }

    pub fn implies(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.function(Op::Implies, vec![e0.clone(), e1.clone()], vec![])
    }

    pub fn eq(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.function(Op::Eq, vec![e0.clone(), e1.clone()], vec![])
    }

    pub fn neq(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.function(Op::Neq, vec![e0.clone(), e1.clone()], vec![])
    }

    pub fn distinct(&self, args: Vec<Expr>) -> Expr {
        if args.len() <= 1 {
            return self.mk_true();
        }
        self.function(Op::Distinct(args.len()), args, vec![])
    }

    pub fn label(&self, pos: bool, name: &str, e: &Expr) -> Expr {
        self.function(Op::Label(pos, str_ident(name)), vec![e.clone()], vec![])
    }

    pub fn ite(&self, cond: &Expr, e_then: &Expr, e_else: &Expr) -> Expr {
        self.function(Op::IfThenElse, vec![cond.clone(), e_then.clone(), e_else.clone()], vec![])
    }

    pub fn binary(&self, op: Op, e0: &Expr, e1: &Expr) -> Expr {
        self.function(op, vec![e0.clone(), e1.clone()], vec![])
    }

    pub fn add(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.binary(Op::Add, e0, e1)
    }

    pub fn lt(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.binary(Op::Lt, e0, e1)
    }

    pub fn le(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.binary(Op::Le, e0, e1)
    }

    pub fn subtype(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.binary(Op::Subtype, e0, e1)
    }

    pub fn bv(&self, op: BvOp, e0: &Expr, e1: &Expr) -> Expr {
        self.binary(Op::Bv(op), e0, e1)
    }

    pub fn bv_not(&self, e: &Expr) -> Expr {
        self.function(Op::BvNot, vec![e.clone()], vec![])
    }

    pub fn bv_extract(&self, e: &Expr, start: u32, end: u32) -> Expr {
        self.function(Op::BvExtract(start, end), vec![e.clone()], vec![])
    }

    pub fn bv_concat(&self, e0: &Expr, e1: &Expr) -> Expr {
        self.binary(Op::BvConcat, e0, e1)
    }

    pub fn select(&self, map: &Expr, indices: Vec<Expr>, typ_args: Vec<Typ>) -> Expr {
        let op = Op::Select { arity: indices.len() + 1, typ_arity: typ_args.len() };
        let mut args = vec![map.clone()];
        args.extend(indices);
        self.function(op, args, typ_args)
    }

    pub fn store(&self, map: &Expr, indices: Vec<Expr>, val: &Expr, typ_args: Vec<Typ>) -> Expr {
        let op = Op::Store { arity: indices.len() + 2, typ_arity: typ_args.len() };
        let mut args = vec![map.clone()];
        args.extend(indices);
        args.push(val.clone());
        self.function(op, args, typ_args)
    }

    // Simplifying constructors

    pub fn not_simp(&self, e: &Expr) -> Expr {
        match &**e {
            ExprX::Const(Constant::Bool(b)) => self.mk_bool(!b),
            ExprX::Apply { op: Op::Not, args, .. } => args[0].clone(),
            _ => self.not(e),
        }
    }

    pub fn and_simp(&self, e0: &Expr, e1: &Expr) -> Expr {
        if e0.is_true() || e1.is_false() {
            e1.clone()
        } else if e1.is_true() || e0.is_false() {
            e0.clone()
        } else {
            self.and(e0, e1)
        }
    }

    pub fn or_simp(&self, e0: &Expr, e1: &Expr) -> Expr {
        if e0.is_false() || e1.is_true() {
            e1.clone()
        } else if e1.is_false() || e0.is_true() {
            e0.clone()
        } else {
            self.or(e0, e1)
        }
    }

    /// Simplifies trivial cases, and turns a => (b => c) into (a && b) => c while the
    /// antecedent stays under IMPLIES_FOLD_LIMIT conjuncts
    pub fn implies_simp(&self, e0: &Expr, e1: &Expr) -> Expr {
        let mut e0 = e0.clone();
        let mut e1 = e1.clone();
        loop {
            if e0.is_true() {
                return e1;
            }
            if e0.is_false() || e1.is_true() {
                return self.mk_true();
            }
            if e1.is_false() {
                return self.not_simp(&e0);
            }
            let next = match &*e1 {
                ExprX::Apply { op: Op::Implies, args, .. }
                    if approx_conjuncts(&e0, IMPLIES_FOLD_LIMIT)
                        + approx_conjuncts(&args[0], IMPLIES_FOLD_LIMIT)
                        <= IMPLIES_FOLD_LIMIT =>
                {
                    Some((self.and_simp(&e0, &args[0]), args[1].clone()))
                }
                _ => None,
            };
            match next {
                Some((a, b)) => {
                    e0 = a;
                    e1 = b;
                }
                None => return self.implies(&e0, &e1),
            }
        }
    }

    /// Left-nested conjunction; empty is true
    pub fn and_all(&self, es: Vec<Expr>) -> Expr {
        let mut iter = es.into_iter();
        match iter.next() {
            None => self.mk_true(),
            Some(first) => iter.fold(first, |acc, e| self.and(&acc, &e)),
        }
    }

    pub fn or_all(&self, es: Vec<Expr>) -> Expr {
        let mut iter = es.into_iter();
        match iter.next() {
            None => self.mk_false(),
            Some(first) => iter.fold(first, |acc, e| self.or(&acc, &e)),
        }
    }

    // Binders

    pub fn trigger(&self, pos: bool, exprs: Vec<Expr>) -> Trigger {
        Arc::new(TriggerX { pos, exprs: Arc::new(exprs) })
    }

    /// Quantifying over no variables and no type parameters is a programming error
    pub fn quantify(
        &self,
        quant: Quant,
        typ_params: Vec<TypVar>,
        vars: Vec<Var>,
        triggers: Vec<Trigger>,
        info: QuantInfo,
        body: &Expr,
    ) -> Expr {
        if typ_params.len() == 0 && vars.len() == 0 {
            panic!("internal error: quantifier binds nothing: {}", expr_to_compact_string(body));
        }
        let typ = body.typ();
        if *typ != TypX::Bool {
            panic!(
                "internal error: quantifier body has type {}",
                node_to_compact_string(&typ_to_node(&typ))
            );
        }
        let bind = BindX::Quant(
            quant,
            Arc::new(typ_params),
            Arc::new(vars),
            Arc::new(triggers),
            info,
        );
        Arc::new(ExprX::Bind(Arc::new(bind), body.clone()))
    }

    /// Collapses to body when vars is empty
    pub fn forall(&self, vars: Vec<Var>, triggers: Vec<Trigger>, info: QuantInfo, body: &Expr) -> Expr {
        if vars.len() == 0 {
            return body.clone();
        }
        self.quantify(Quant::Forall, vec![], vars, triggers, info, body)
    }

    /// Collapses to body when vars is empty
    pub fn exists(&self, vars: Vec<Var>, triggers: Vec<Trigger>, info: QuantInfo, body: &Expr) -> Expr {
        if vars.len() == 0 {
            return body.clone();
        }
        self.quantify(Quant::Exists, vec![], vars, triggers, info, body)
    }

    pub fn let_binding(&self, x: &Var, e: &Expr) -> Binder<Expr> {
        if x.typ != e.typ() {
            panic!("internal error: let-bound variable {} has the wrong type", x.name);
        }
        ident_binder(x, e)
    }

    pub fn let_(&self, binders: Vec<Binder<Expr>>, body: &Expr) -> Expr {
        if binders.len() == 0 {
            return body.clone();
        }
        Arc::new(ExprX::Bind(Arc::new(BindX::Let(Arc::new(binders))), body.clone()))
    }
}
