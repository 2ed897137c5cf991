//! Representation of types as terms of sort T, casts between native sorts and the
//! universal sort U, and the axioms that make both sound.

use crate::ast::{Expr, Fun, QuantInfo, Typ, TypCtor, TypVar, TypX, Var};
use crate::ast_util::{bool_typ, int_typ};
use crate::context::{Config, TypeEncoding};
use crate::erase::TypVarBindings;
use crate::generator::Generator;
use crate::map_abstraction::MapAbstraction;
use crate::printer::{node_to_compact_string, typ_to_node};
use crate::premises::UntypedFun;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

pub const U_SORT: &str = "U";
pub const T_SORT: &str = "T";
pub const CTOR_FUN: &str = "Ctor";
pub const TYPE_OF_FUN: &str = "type";

/// Term-level representation of a type constructor: tag function and one destructor per argument
#[derive(Clone)]
pub struct TypCtorRepr {
    pub ctor: Fun,
    pub dtors: Arc<Vec<Fun>>,
}

#[derive(Clone)]
pub struct TypCasts {
    pub to_u: Fun,
    pub from_u: Fun,
}

/// All per-session registries. Every entry is created on first use and never changes
/// afterwards; cloning the builder forks the session.
#[derive(Clone)]
pub struct AxiomBuilder {
    pub(crate) gen: Generator,
    pub(crate) config: Config,
    u_typ: Typ,
    t_typ: Typ,
    ctor_fun: Fun,
    type_fun: Fun,
    basic_typ_reprs: IndexMap<Typ, Expr>,
    typ_ctor_reprs: IndexMap<TypCtor, TypCtorRepr>,
    typ_var_terms: IndexMap<TypVar, Var>,
    typ_casts: IndexMap<Typ, TypCasts>,
    to_u_casts: IndexSet<Fun>,
    untyped_vars: IndexMap<Var, Var>,
    pub(crate) untyped_funs: IndexMap<Fun, UntypedFun>,
    pub(crate) maps: MapAbstraction,
    all_axioms: Vec<Expr>,
    new_axioms: Vec<Expr>,
    next_ctor_id: i64,
    declared: Vec<Fun>,
}

/// Name fragment used for a type in tag and cast names
pub fn typ_name(typ: &Typ) -> String {
    match &**typ {
        TypX::Bool => "bool".to_string(),
        TypX::Int => "int".to_string(),
        TypX::BitVec(width) => format!("bv{}", width),
        TypX::Var(x) => x.name.to_string(),
        TypX::Ctor(c, args) if args.len() == 0 => c.name.to_string(),
        TypX::Ctor(c, args) => {
            let args: Vec<String> = args.iter().map(typ_name).collect();
            format!("{}_{}", c.name, args.join("_"))
        }
        TypX::Map(m) => {
            let mut parts: Vec<String> = m.args.iter().map(typ_name).collect();
            parts.push(typ_name(&m.result));
            format!("Map_{}", parts.join("_"))
        }
    }
}

impl AxiomBuilder {
    pub fn new(gen: &Generator, config: &Config) -> Self {
        let u_ctor = gen.new_typ_ctor(U_SORT, 0);
        let t_ctor = gen.new_typ_ctor(T_SORT, 0);
        let u_typ = gen.ctor_typ(&u_ctor, vec![]);
        let t_typ = gen.ctor_typ(&t_ctor, vec![]);
        let ctor_fun = gen.new_fun(CTOR_FUN, vec![], vec![t_typ.clone()], &int_typ());
        let type_fun = gen.new_fun(TYPE_OF_FUN, vec![], vec![u_typ.clone()], &t_typ);
        let mut builder = AxiomBuilder {
            gen: gen.clone(),
            config: config.clone(),
            u_typ,
            t_typ,
            ctor_fun: ctor_fun.clone(),
            type_fun: type_fun.clone(),
            basic_typ_reprs: IndexMap::new(),
            typ_ctor_reprs: IndexMap::new(),
            typ_var_terms: IndexMap::new(),
            typ_casts: IndexMap::new(),
            to_u_casts: IndexSet::new(),
            untyped_vars: IndexMap::new(),
            untyped_funs: IndexMap::new(),
            maps: MapAbstraction::new(),
            all_axioms: Vec::new(),
            new_axioms: Vec::new(),
            next_ctor_id: 0,
            declared: vec![ctor_fun, type_fun],
        };
        builder.basic_typ_repr(&int_typ());
        builder.basic_typ_repr(&bool_typ());
        builder
    }

    pub fn u_typ(&self) -> &Typ {
        &self.u_typ
    }

    pub fn t_typ(&self) -> &Typ {
        &self.t_typ
    }

    pub fn type_fun(&self) -> &Fun {
        &self.type_fun
    }

    pub fn ctor_fun(&self) -> &Fun {
        &self.ctor_fun
    }

    pub fn type_of(&self, e: &Expr) -> Expr {
        self.gen.apply(&self.type_fun, vec![e.clone()])
    }

    /// Every untyped symbol introduced so far, in creation order
    pub fn declared_funs(&self) -> &[Fun] {
        &self.declared
    }

    pub fn all_axioms(&self) -> &[Expr] {
        &self.all_axioms
    }

    /// Conjunction of the axioms added since the last call (true if none)
    pub fn drain_new_axioms(&mut self) -> Expr {
        let axioms = std::mem::take(&mut self.new_axioms);
        self.gen.and_all(axioms)
    }

    pub(crate) fn declare(&mut self, name: &str, params: Vec<Typ>, ret: &Typ) -> Fun {
        let fun = self.gen.new_fun(name, vec![], params, ret);
        log::trace!("declare {}", name);
        self.declared.push(fun.clone());
        fun
    }

    pub(crate) fn declare_existing(&mut self, fun: &Fun) {
        self.declared.push(fun.clone());
    }

    pub(crate) fn add_typ_axiom(&mut self, axiom: Expr) {
        if axiom.is_true() {
            return;
        }
        self.all_axioms.push(axiom.clone());
        self.new_axioms.push(axiom);
    }

    pub(crate) fn typing_enabled(&self) -> bool {
        self.config.type_encoding != TypeEncoding::None
    }

    // Type representations

    /// Ctor(repr(x0..xn)) = id for a fresh id
    pub(crate) fn gen_ctor_assignment(&mut self, repr: &Fun) -> Expr {
        if !self.typing_enabled() {
            return self.gen.mk_true();
        }
        let id = self.gen.mk_int(self.next_ctor_id);
        self.next_ctor_id += 1;
        let vars: Vec<Var> = (0..repr.params.len())
            .map(|i| self.gen.new_var(&format!("x{}", i), &self.t_typ))
            .collect();
        let app = self.gen.apply(repr, vars.iter().map(|x| self.gen.var(x)).collect());
        let eq = self.gen.eq(&self.gen.apply(&self.ctor_fun, vec![app.clone()]), &id);
        let trigger = self.gen.trigger(true, vec![app]);
        let info = QuantInfo::named(&format!("ctor:{}", repr.name));
        self.gen.forall(vars, vec![trigger], info, &eq)
    }

    /// inv(fun(x0..xn)) = xi, triggered on fun(x0..xn)
    pub(crate) fn gen_left_inverse_axiom(&self, fun: &Fun, inv: &Fun, i: usize, prefix: &str) -> Expr {
        let vars: Vec<Var> = fun
            .params
            .iter()
            .enumerate()
            .map(|(j, t)| self.gen.new_var(&format!("x{}", j), t))
            .collect();
        let app = self.gen.apply(fun, vars.iter().map(|x| self.gen.var(x)).collect());
        let eq = self.gen.eq(&self.gen.apply(inv, vec![app.clone()]), &self.gen.var(&vars[i]));
        let trigger = self.gen.trigger(true, vec![app]);
        let info = QuantInfo::named(&format!("{}:{}", prefix, inv.name));
        self.gen.forall(vars, vec![trigger], info, &eq)
    }

    /// Tag of a basic type (int, bool, bitvector)
    pub fn basic_typ_repr(&mut self, typ: &Typ) -> Expr {
        if let Some(repr) = self.basic_typ_reprs.get(typ) {
            return repr.clone();
        }
        if !typ.is_basic() {
            panic!("internal error: {} is not a basic type", node_to_compact_string(&typ_to_node(typ)));
        }
        let t = self.t_typ.clone();
        let fun = self.declare(&format!("{}Type", typ_name(typ)), vec![], &t);
        let repr = self.gen.apply(&fun, vec![]);
        self.basic_typ_reprs.insert(typ.clone(), repr.clone());
        let axiom = self.gen_ctor_assignment(&fun);
        self.add_typ_axiom(axiom);
        repr
    }

    pub fn typ_ctor_repr(&mut self, ctor: &TypCtor) -> TypCtorRepr {
        if let Some(repr) = self.typ_ctor_reprs.get(ctor) {
            return repr.clone();
        }
        log::debug!("new type constructor representation for {}", ctor.name);
        let t = self.t_typ.clone();
        let fun = self.declare(&format!("{}Type", ctor.name), vec![t.clone(); ctor.arity], &t);
        let axiom = self.gen_ctor_assignment(&fun);
        self.add_typ_axiom(axiom);
        let mut dtors: Vec<Fun> = Vec::new();
        for i in 0..ctor.arity {
            let inv = self.declare(&format!("{}TypeInv{}", ctor.name, i), vec![t.clone()], &t);
            let axiom = self.gen_left_inverse_axiom(&fun, &inv, i, "typeInv");
            self.add_typ_axiom(axiom);
            dtors.push(inv);
        }
        let repr = TypCtorRepr { ctor: fun, dtors: Arc::new(dtors) };
        self.typ_ctor_reprs.insert(ctor.clone(), repr.clone());
        repr
    }

    /// Global term standing for a type variable that is not bound by any enclosing binder
    pub fn typ_var_term(&mut self, x: &TypVar) -> Var {
        if let Some(v) = self.typ_var_terms.get(x) {
            return v.clone();
        }
        let v = self.gen.new_var(&x.name, &self.t_typ);
        self.typ_var_terms.insert(x.clone(), v.clone());
        v
    }

    /// Term of sort T denoting typ; type variables are looked up in bindings first
    pub fn typ_to_term(&mut self, typ: &Typ, bindings: &TypVarBindings) -> Expr {
        match &**typ {
            TypX::Bool | TypX::Int | TypX::BitVec(_) => self.basic_typ_repr(typ),
            TypX::Var(x) => match bindings.get(x) {
                Some(v) => self.gen.var(v),
                None => {
                    let v = self.typ_var_term(x);
                    self.gen.var(&v)
                }
            },
            TypX::Ctor(c, args) => {
                let repr = self.typ_ctor_repr(c);
                let args: Vec<Expr> = args.iter().map(|t| self.typ_to_term(t, bindings)).collect();
                self.gen.apply(&repr.ctor, args)
            }
            TypX::Map(m) => {
                let abstracted = self.abstract_map_typ(m);
                self.typ_to_term(&abstracted, bindings)
            }
        }
    }

    // Erased sorts

    /// Types that erasure leaves alone
    pub fn unchanged_typ(&self, typ: &Typ) -> bool {
        match &**typ {
            TypX::Bool | TypX::Int | TypX::BitVec(_) => true,
            TypX::Map(m) => {
                self.config.use_array_theory
                    && m.typ_params.len() == 0
                    && m.args.iter().all(|t| self.unchanged_typ(t))
                    && self.unchanged_typ(&m.result)
            }
            TypX::Var(_) | TypX::Ctor(..) => false,
        }
    }

    pub fn typ_after_erasure(&self, typ: &Typ) -> Typ {
        if self.unchanged_typ(typ) { typ.clone() } else { self.u_typ.clone() }
    }

    // Casts

    pub fn typ_casts(&mut self, typ: &Typ) -> TypCasts {
        if let Some(casts) = self.typ_casts.get(typ) {
            return casts.clone();
        }
        if !self.unchanged_typ(typ) {
            panic!(
                "internal error: no casts for type {}, which is not kept by erasure",
                node_to_compact_string(&typ_to_node(typ))
            );
        }
        let name = typ_name(typ);
        log::debug!("new casts for {}", name);
        let u = self.u_typ.clone();
        let to_u = self.declare(&format!("{}_2_U", name), vec![typ.clone()], &u);
        let from_u = self.declare(&format!("U_2_{}", name), vec![u.clone()], typ);
        let casts = TypCasts { to_u: to_u.clone(), from_u: from_u.clone() };
        self.typ_casts.insert(typ.clone(), casts.clone());
        self.to_u_casts.insert(to_u.clone());

        let left_inverse = self.gen_left_inverse_axiom(&to_u, &from_u, 0, "cast");
        self.add_typ_axiom(left_inverse);
        let reverse = self.gen_reverse_cast_axiom(&casts, typ);
        self.add_typ_axiom(reverse);
        let cast_typ = self.gen_cast_typ_axiom(&to_u, typ);
        self.add_typ_axiom(cast_typ);
        casts
    }

    /// forall x: U. type(x) = tag(typ) ==> toU(fromU(x)) = x
    fn gen_reverse_cast_axiom(&mut self, casts: &TypCasts, typ: &Typ) -> Expr {
        if !self.typing_enabled() {
            // without the premise, this would identify U with every native sort
            return self.gen.mk_true();
        }
        let x = self.gen.new_var("x", &self.u_typ);
        let premise = self.gen_var_typ_axiom(&x, typ, &TypVarBindings::new());
        let from_u = self.gen.apply(&casts.from_u, vec![self.gen.var(&x)]);
        let round_trip = self.gen.apply(&casts.to_u, vec![from_u.clone()]);
        let eq = self.gen.eq(&round_trip, &self.gen.var(&x));
        let body = self.gen.implies_simp(&premise, &eq);
        let trigger = self.gen.trigger(true, vec![from_u]);
        let info = QuantInfo::named(&format!("reverseCast:{}", casts.from_u.name));
        self.gen.forall(vec![x], vec![trigger], info, &body)
    }

    /// forall x: typ. type(toU(x)) = tag(typ)
    fn gen_cast_typ_axiom(&mut self, to_u: &Fun, typ: &Typ) -> Expr {
        if !self.typing_enabled() {
            return self.gen.mk_true();
        }
        let tag = self.typ_to_term(typ, &TypVarBindings::new());
        let x = self.gen.new_var("x", typ);
        let app = self.gen.apply(to_u, vec![self.gen.var(&x)]);
        let eq = self.gen.eq(&self.type_of(&app), &tag);
        let trigger = self.gen.trigger(true, vec![app]);
        let info = QuantInfo::named(&format!("funType:{}", to_u.name));
        self.gen.forall(vec![x], vec![trigger], info, &eq)
    }

    pub fn is_cast_to_u(&self, fun: &Fun) -> bool {
        self.to_u_casts.contains(fun)
    }

    /// Convert e to sort to; one of the two sorts must be U
    pub fn cast(&mut self, e: &Expr, to: &Typ) -> Expr {
        let from = e.typ();
        if &from == to {
            return e.clone();
        }
        if to == &self.u_typ {
            let casts = self.typ_casts(&from);
            self.gen.apply(&casts.to_u, vec![e.clone()])
        } else if from == self.u_typ {
            let casts = self.typ_casts(to);
            self.gen.apply(&casts.from_u, vec![e.clone()])
        } else {
            panic!(
                "internal error: cannot cast from {} to {}",
                node_to_compact_string(&typ_to_node(&from)),
                node_to_compact_string(&typ_to_node(to))
            );
        }
    }

    // Variables

    /// type(x) = term(original) when x's sort differs from original, otherwise true
    pub fn gen_var_typ_axiom(&mut self, x: &Var, original: &Typ, bindings: &TypVarBindings) -> Expr {
        if !self.typing_enabled() || &x.typ == original {
            return self.gen.mk_true();
        }
        let tag = self.typ_to_term(original, bindings);
        self.gen.eq(&self.type_of(&self.gen.var(x)), &tag)
    }

    /// Untyped counterpart of a free variable, created once
    pub fn untyped_var(&mut self, x: &Var) -> Var {
        if let Some(v) = self.untyped_vars.get(x) {
            return v.clone();
        }
        let typ = self.typ_after_erasure(&x.typ);
        let v = self.gen.rename_var(x, &typ);
        self.untyped_vars.insert(x.clone(), v.clone());
        let axiom = self.gen_var_typ_axiom(&v, &x.typ, &TypVarBindings::new());
        self.add_typ_axiom(axiom);
        v
    }
}
