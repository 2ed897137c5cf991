use crate::ast::{
    BindX, Binder, BinderX, Constant, Expr, ExprX, FunX, Ident, MapTypX, Polarity, Quant,
    TriggerX, Typ, TypCtorX, TypVar, TypVarX, TypX, Var, VarX,
};
use crate::printer::{expr_to_node, node_to_string, typ_to_node};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub fn str_ident(x: &str) -> Ident {
    Arc::new(x.to_string())
}

pub fn bool_typ() -> Typ {
    Arc::new(TypX::Bool)
}

pub fn int_typ() -> Typ {
    Arc::new(TypX::Int)
}

pub fn bv_typ(width: u32) -> Typ {
    Arc::new(TypX::BitVec(width))
}

pub fn typ_var_typ(x: &TypVar) -> Typ {
    Arc::new(TypX::Var(x.clone()))
}

pub fn ident_binder<A: Clone>(x: &Var, a: &A) -> Binder<A> {
    Arc::new(BinderX { var: x.clone(), a: a.clone() })
}

impl Polarity {
    pub fn negate(self) -> Polarity {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
            Polarity::Neutral => Polarity::Neutral,
        }
    }
}

// Identity-based equality for named objects

macro_rules! uid_identity {
    ($t:ty) => {
        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                self.uid == other.uid
            }
        }
        impl Eq for $t {}
        impl Hash for $t {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.uid.hash(state);
            }
        }
    };
}

uid_identity!(TypVarX);
uid_identity!(TypCtorX);
uid_identity!(VarX);
uid_identity!(FunX);

// Types: structural, with map type parameters compared up to renaming

fn typ_eq_in(t1: &TypX, t2: &TypX, bound: &mut Vec<(TypVar, TypVar)>) -> bool {
    match (t1, t2) {
        (TypX::Bool, TypX::Bool) | (TypX::Int, TypX::Int) => true,
        (TypX::BitVec(w1), TypX::BitVec(w2)) => w1 == w2,
        (TypX::Var(x1), TypX::Var(x2)) => {
            match bound.iter().rev().find(|(b1, b2)| b1 == x1 || b2 == x2) {
                Some((b1, b2)) => b1 == x1 && b2 == x2,
                None => x1 == x2,
            }
        }
        (TypX::Ctor(c1, args1), TypX::Ctor(c2, args2)) => {
            c1 == c2
                && args1.len() == args2.len()
                && args1.iter().zip(args2.iter()).all(|(a1, a2)| typ_eq_in(a1, a2, bound))
        }
        (TypX::Map(m1), TypX::Map(m2)) => map_typ_eq_in(m1, m2, bound),
        _ => false,
    }
}

fn map_typ_eq_in(m1: &MapTypX, m2: &MapTypX, bound: &mut Vec<(TypVar, TypVar)>) -> bool {
    if m1.typ_params.len() != m2.typ_params.len() || m1.args.len() != m2.args.len() {
        return false;
    }
    let depth = bound.len();
    for (x1, x2) in m1.typ_params.iter().zip(m2.typ_params.iter()) {
        bound.push((x1.clone(), x2.clone()));
    }
    let eq = m1.args.iter().zip(m2.args.iter()).all(|(a1, a2)| typ_eq_in(a1, a2, bound))
        && typ_eq_in(&m1.result, &m2.result, bound);
    bound.truncate(depth);
    eq
}

fn typ_hash_in<H: Hasher>(t: &TypX, state: &mut H, bound: &mut Vec<TypVar>) {
    std::mem::discriminant(t).hash(state);
    match t {
        TypX::Bool | TypX::Int => {}
        TypX::BitVec(w) => w.hash(state),
        TypX::Var(x) => match bound.iter().rposition(|b| b == x) {
            Some(pos) => {
                true.hash(state);
                (bound.len() - pos).hash(state);
            }
            None => {
                false.hash(state);
                x.hash(state);
            }
        },
        TypX::Ctor(c, args) => {
            c.hash(state);
            args.len().hash(state);
            for arg in args.iter() {
                typ_hash_in(arg, state, bound);
            }
        }
        TypX::Map(m) => map_typ_hash_in(m, state, bound),
    }
}

fn map_typ_hash_in<H: Hasher>(m: &MapTypX, state: &mut H, bound: &mut Vec<TypVar>) {
    let depth = bound.len();
    m.typ_params.len().hash(state);
    bound.extend(m.typ_params.iter().cloned());
    m.args.len().hash(state);
    for arg in m.args.iter() {
        typ_hash_in(arg, state, bound);
    }
    typ_hash_in(&m.result, state, bound);
    bound.truncate(depth);
}

impl PartialEq for TypX {
    fn eq(&self, other: &Self) -> bool {
        typ_eq_in(self, other, &mut Vec::new())
    }
}
impl Eq for TypX {}
impl Hash for TypX {
    fn hash<H: Hasher>(&self, state: &mut H) {
        typ_hash_in(self, state, &mut Vec::new())
    }
}

impl PartialEq for MapTypX {
    fn eq(&self, other: &Self) -> bool {
        map_typ_eq_in(self, other, &mut Vec::new())
    }
}
impl Eq for MapTypX {}
impl Hash for MapTypX {
    fn hash<H: Hasher>(&self, state: &mut H) {
        map_typ_hash_in(self, state, &mut Vec::new())
    }
}

// Expressions: structural, iterative so that deep trees do not exhaust the stack

fn expr_eq(e1: &ExprX, e2: &ExprX) -> bool {
    let mut stack: Vec<(&ExprX, &ExprX)> = vec![(e1, e2)];
    while let Some((e1, e2)) = stack.pop() {
        if std::ptr::eq(e1, e2) {
            continue;
        }
        match (e1, e2) {
            (ExprX::Const(c1), ExprX::Const(c2)) => {
                if c1 != c2 {
                    return false;
                }
            }
            (ExprX::Var(x1), ExprX::Var(x2)) => {
                if x1 != x2 {
                    return false;
                }
            }
            (
                ExprX::Apply { op: op1, args: args1, typ_args: typs1, .. },
                ExprX::Apply { op: op2, args: args2, typ_args: typs2, .. },
            ) => {
                if op1 != op2 || typs1 != typs2 || args1.len() != args2.len() {
                    return false;
                }
                for (a1, a2) in args1.iter().zip(args2.iter()) {
                    stack.push((&**a1, &**a2));
                }
            }
            (ExprX::Bind(bind1, body1), ExprX::Bind(bind2, body2)) => {
                match (&**bind1, &**bind2) {
                    (BindX::Let(bs1), BindX::Let(bs2)) => {
                        if bs1.len() != bs2.len() {
                            return false;
                        }
                        for (b1, b2) in bs1.iter().zip(bs2.iter()) {
                            if b1.var != b2.var {
                                return false;
                            }
                            stack.push((&*b1.a, &*b2.a));
                        }
                    }
                    (
                        BindX::Quant(q1, typ_params1, vars1, trigs1, info1),
                        BindX::Quant(q2, typ_params2, vars2, trigs2, info2),
                    ) => {
                        if q1 != q2
                            || typ_params1 != typ_params2
                            || vars1 != vars2
                            || info1 != info2
                            || trigs1.len() != trigs2.len()
                        {
                            return false;
                        }
                        for (t1, t2) in trigs1.iter().zip(trigs2.iter()) {
                            if t1.pos != t2.pos || t1.exprs.len() != t2.exprs.len() {
                                return false;
                            }
                            for (a1, a2) in t1.exprs.iter().zip(t2.exprs.iter()) {
                                stack.push((&**a1, &**a2));
                            }
                        }
                    }
                    _ => return false,
                }
                stack.push((&**body1, &**body2));
            }
            _ => return false,
        }
    }
    true
}

impl PartialEq for ExprX {
    fn eq(&self, other: &Self) -> bool {
        expr_eq(self, other)
    }
}
impl Eq for ExprX {}

impl Hash for ExprX {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut stack: Vec<&ExprX> = vec![self];
        while let Some(e) = stack.pop() {
            std::mem::discriminant(e).hash(state);
            match e {
                ExprX::Const(c) => c.hash(state),
                ExprX::Var(x) => x.hash(state),
                ExprX::Apply { op, args, typ_args, .. } => {
                    op.hash(state);
                    typ_args.hash(state);
                    args.len().hash(state);
                    for arg in args.iter().rev() {
                        stack.push(&**arg);
                    }
                }
                ExprX::Bind(bind, body) => {
                    match &**bind {
                        BindX::Let(binders) => {
                            binders.len().hash(state);
                            for b in binders.iter() {
                                b.var.hash(state);
                                stack.push(&*b.a);
                            }
                        }
                        BindX::Quant(quant, typ_params, vars, triggers, info) => {
                            quant.hash(state);
                            typ_params.hash(state);
                            vars.hash(state);
                            info.hash(state);
                            triggers.len().hash(state);
                            for trigger in triggers.iter() {
                                trigger.pos.hash(state);
                                trigger.exprs.len().hash(state);
                                for arg in trigger.exprs.iter() {
                                    stack.push(&**arg);
                                }
                            }
                        }
                    }
                    stack.push(&**body);
                }
            }
        }
    }
}

// Move the uniquely owned children of e onto stack, leaving e without subexpressions
fn take_children(e: &mut ExprX, stack: &mut Vec<Expr>) {
    match e {
        ExprX::Const(_) | ExprX::Var(_) => {}
        ExprX::Apply { args, .. } => {
            if let Some(args) = Arc::get_mut(args) {
                stack.extend(args.drain(..));
            }
        }
        ExprX::Bind(bind, body) => {
            if let Some(bind) = Arc::get_mut(bind) {
                match bind {
                    BindX::Let(binders) => {
                        if let Some(binders) = Arc::get_mut(binders) {
                            for b in binders.drain(..) {
                                if let Ok(b) = Arc::try_unwrap(b) {
                                    stack.push(b.a);
                                }
                            }
                        }
                    }
                    BindX::Quant(_, _, _, triggers, _) => {
                        if let Some(triggers) = Arc::get_mut(triggers) {
                            for t in triggers.drain(..) {
                                if let Ok(mut t) = Arc::try_unwrap(t) {
                                    if let Some(exprs) = Arc::get_mut(&mut t.exprs) {
                                        stack.extend(exprs.drain(..));
                                    }
                                }
                            }
                        }
                    }
                }
            }
            if Arc::strong_count(body) == 1 {
                let leaf = Arc::new(ExprX::Const(Constant::Bool(true)));
                stack.push(std::mem::replace(body, leaf));
            }
        }
    }
}

// Dropping a deep tree recursively would exhaust the stack; unshared nodes are
// dismantled here instead, shared ones are left to their other owners.
impl Drop for ExprX {
    fn drop(&mut self) {
        let mut stack: Vec<Expr> = Vec::new();
        take_children(self, &mut stack);
        while let Some(e) = stack.pop() {
            if let Ok(mut e) = Arc::try_unwrap(e) {
                take_children(&mut e, &mut stack);
            }
        }
    }
}

impl ExprX {
    /// Result type of the expression; constant time except for chains of lets
    pub fn typ(&self) -> Typ {
        let mut e = self;
        loop {
            match e {
                ExprX::Const(Constant::Bool(_)) => return bool_typ(),
                ExprX::Const(Constant::Int(_)) => return int_typ(),
                ExprX::Const(Constant::BitVec(_, width)) => return bv_typ(*width),
                ExprX::Var(x) => return x.typ.clone(),
                ExprX::Apply { typ, .. } => return typ.clone(),
                ExprX::Bind(bind, body) => match &**bind {
                    BindX::Quant(..) => return bool_typ(),
                    BindX::Let(_) => e = body,
                },
            }
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, ExprX::Const(Constant::Bool(true)))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, ExprX::Const(Constant::Bool(false)))
    }

    pub fn as_quant(&self) -> Option<Quant> {
        match self {
            ExprX::Bind(bind, _) => match &**bind {
                BindX::Quant(quant, ..) => Some(*quant),
                BindX::Let(_) => None,
            },
            _ => None,
        }
    }
}

impl TypX {
    /// Natively representable without any constructed or variable parts
    pub fn is_basic(&self) -> bool {
        matches!(self, TypX::Bool | TypX::Int | TypX::BitVec(_))
    }
}

/// Free type variables in order of first occurrence
pub fn typ_free_vars(typ: &Typ) -> IndexSet<TypVar> {
    fn collect(typ: &Typ, bound: &mut Vec<TypVar>, free: &mut IndexSet<TypVar>) {
        match &**typ {
            TypX::Bool | TypX::Int | TypX::BitVec(_) => {}
            TypX::Var(x) => {
                if !bound.contains(x) {
                    free.insert(x.clone());
                }
            }
            TypX::Ctor(_, args) => {
                for arg in args.iter() {
                    collect(arg, bound, free);
                }
            }
            TypX::Map(m) => {
                let depth = bound.len();
                bound.extend(m.typ_params.iter().cloned());
                for arg in m.args.iter() {
                    collect(arg, bound, free);
                }
                collect(&m.result, bound, free);
                bound.truncate(depth);
            }
        }
    }
    let mut free = IndexSet::new();
    collect(typ, &mut Vec::new(), &mut free);
    free
}

pub fn typ_mentions_any(typ: &Typ, xs: &[TypVar]) -> bool {
    typ_free_vars(typ).iter().any(|x| xs.contains(x))
}

pub fn subst_typ(typ: &Typ, subst: &HashMap<TypVar, Typ>) -> Typ {
    if subst.is_empty() {
        return typ.clone();
    }
    match &**typ {
        TypX::Bool | TypX::Int | TypX::BitVec(_) => typ.clone(),
        TypX::Var(x) => match subst.get(x) {
            Some(t) => t.clone(),
            None => typ.clone(),
        },
        TypX::Ctor(c, args) => {
            let args = args.iter().map(|t| subst_typ(t, subst)).collect();
            Arc::new(TypX::Ctor(c.clone(), Arc::new(args)))
        }
        TypX::Map(m) => {
            let mut inner = subst.clone();
            for x in m.typ_params.iter() {
                inner.remove(x);
            }
            let args = m.args.iter().map(|t| subst_typ(t, &inner)).collect();
            let result = subst_typ(&m.result, &inner);
            let m = MapTypX { typ_params: m.typ_params.clone(), args: Arc::new(args), result };
            Arc::new(TypX::Map(Arc::new(m)))
        }
    }
}

impl Debug for TypX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", node_to_string(&typ_to_node(self)))
    }
}

impl Debug for MapTypX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        TypX::Map(Arc::new(self.clone())).fmt(f)
    }
}

impl Debug for TypVarX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name)
    }
}

impl Debug for TypCtorX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

impl Debug for VarX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}: {:?}", self.name, self.typ)
    }
}

impl Debug for FunX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name)
    }
}

impl Debug for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::BitVec(i, width) => write!(f, "{}bv{}", i, width),
        }
    }
}

impl<A: Clone + Debug> Debug for BinderX<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        self.var.name.fmt(f)?;
        f.write_str(" -> ")?;
        self.a.fmt(f)?;
        Ok(())
    }
}

impl Debug for TriggerX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        if !self.pos {
            f.write_str("!")?;
        }
        f.debug_list().entries(self.exprs.iter()).finish()
    }
}

impl Debug for BindX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            BindX::Let(binders) => f.debug_tuple("Let").field(binders).finish(),
            BindX::Quant(quant, typ_params, vars, triggers, info) => f
                .debug_tuple("Quant")
                .field(quant)
                .field(typ_params)
                .field(vars)
                .field(triggers)
                .field(&info.qid)
                .finish(),
        }
    }
}

impl Debug for ExprX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", node_to_string(&expr_to_node(self)))
    }
}
