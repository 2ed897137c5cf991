//! Type encoding through premises: every bound variable of sort U gets a premise
//! `type(x) = term(original type)`, type parameters are either recovered from such
//! variables (implicit) or passed as extra arguments of sort T (explicit).

use crate::ast::{
    Binder, Expr, ExprX, Fun, MapTyp, Op, Polarity, Quant, QuantInfo, Trigger, Typ, TypCtor,
    TypVar, TypVars, TypX, Var,
};
use crate::ast_util::{bool_typ, int_typ, typ_mentions_any, typ_var_typ};
use crate::axioms::AxiomBuilder;
use crate::erase::{Eraser, QuantParts, TypVarBindings, VariableBindings};
use crate::map_abstraction::MapClass;
use crate::printer::{node_to_compact_string, typ_to_node};
use crate::visitor::{expr_size, free_vars, substitute};
use std::collections::HashMap;
use std::sync::Arc;

/// A function symbol over erased sorts, with the split of the original type parameters.
/// The untyped function takes one argument of sort T per explicit parameter, followed by
/// the erased arguments of the original function.
#[derive(Clone)]
pub struct UntypedFun {
    pub fun: Fun,
    /// recoverable from the types of the arguments
    pub implicit: TypVars,
    /// mentioned only in the result type
    pub explicit: TypVars,
}

/// (implicit, explicit): implicit parameters occur in some argument type
pub fn split_typ_params(typ_params: &[TypVar], in_typs: &[Typ]) -> (Vec<TypVar>, Vec<TypVar>) {
    let mut implicit: Vec<TypVar> = Vec::new();
    let mut explicit: Vec<TypVar> = Vec::new();
    for x in typ_params {
        let xs = [x.clone()];
        if in_typs.iter().any(|t| typ_mentions_any(t, &xs)) {
            implicit.push(x.clone());
        } else {
            explicit.push(x.clone());
        }
    }
    (implicit, explicit)
}

/// Smallest candidate by node count; the first one wins ties
fn best_extractor(candidates: Vec<Expr>) -> Option<Expr> {
    let mut best: Option<(usize, Expr)> = None;
    for e in candidates {
        let size = expr_size(&e);
        match &best {
            Some((best_size, _)) if *best_size <= size => {}
            _ => best = Some((size, e)),
        }
    }
    best.map(|(_, e)| e)
}

fn is_trivial_premise(e: &Expr) -> bool {
    match &**e {
        ExprX::Apply { op: Op::Eq, args, .. } => args[0] == args[1],
        _ => e.is_true(),
    }
}

fn explicit_positions(thinned: &MapTyp, explicit: &TypVars) -> Arc<Vec<usize>> {
    let positions =
        explicit.iter().filter_map(|x| thinned.typ_params.iter().position(|p| p == x)).collect();
    Arc::new(positions)
}

/// Variables of one instance of the select/store axioms
struct MapFrame {
    typ_vars: Vec<Var>,
    bindings: TypVarBindings,
    lets: Vec<Binder<Expr>>,
    m: Var,
    xs: Vec<Var>,
    ys: Vec<Var>,
    val: Var,
}

impl AxiomBuilder {
    // Functions

    pub fn untyped_fun(&mut self, fun: &Fun) -> UntypedFun {
        if let Some(untyped) = self.untyped_funs.get(fun) {
            return untyped.clone();
        }
        let (implicit, explicit) = split_typ_params(&fun.typ_params, &fun.params);
        let unchanged = fun.typ_params.len() == 0
            && fun.params.iter().all(|t| self.unchanged_typ(t))
            && self.unchanged_typ(&fun.ret);
        let untyped = if unchanged {
            self.declare_existing(fun);
            UntypedFun { fun: fun.clone(), implicit: Arc::new(implicit), explicit: Arc::new(explicit) }
        } else {
            let mut params: Vec<Typ> = vec![self.t_typ().clone(); explicit.len()];
            params.extend(fun.params.iter().map(|t| self.typ_after_erasure(t)));
            let ret = self.typ_after_erasure(&fun.ret);
            let new_fun = self.declare(&fun.name, params, &ret);
            UntypedFun { fun: new_fun, implicit: Arc::new(implicit), explicit: Arc::new(explicit) }
        };
        self.untyped_funs.insert(fun.clone(), untyped.clone());
        if !unchanged && &untyped.fun.ret == self.u_typ() {
            let axiom = self.gen_function_axiom(&untyped, &fun.params, &fun.ret);
            self.add_typ_axiom(axiom);
        }
        untyped
    }

    /// forall explicit, args. let implicit = extractors in type(f(explicit, args)) = term(result)
    fn gen_function_axiom(&mut self, untyped: &UntypedFun, original_in: &[Typ], original_result: &Typ) -> Expr {
        if !self.typing_enabled() {
            return self.gen.mk_true();
        }
        let fun = &untyped.fun;
        let t = self.t_typ().clone();
        let mut bindings = TypVarBindings::new();
        let mut vars: Vec<Var> = Vec::new();
        for x in untyped.explicit.iter() {
            let v = self.gen.new_var(&x.name, &t);
            bindings.insert(x.clone(), v.clone());
            vars.push(v);
        }
        let args: Vec<Var> = fun
            .params
            .iter()
            .skip(untyped.explicit.len())
            .enumerate()
            .map(|(i, sort)| self.gen.new_var(&format!("arg{}", i), sort))
            .collect();
        vars.extend(args.iter().cloned());
        let witnesses: Vec<(Typ, Var)> =
            original_in.iter().cloned().zip(args.iter().cloned()).collect();
        let (lets, missing) = self.gen_typ_param_bindings(&untyped.implicit, &witnesses, &mut bindings);
        if let Some(x) = missing.first() {
            panic!("internal error: type parameter {} of {} cannot be recovered", x.name, fun.name);
        }
        let app = self.gen.apply(fun, vars.iter().map(|x| self.gen.var(x)).collect());
        let result = self.typ_to_term(original_result, &bindings);
        let eq = self.gen.eq(&self.type_of(&app), &result);
        let body = self.add_typ_premises(&lets, &self.gen.mk_true(), Quant::Forall, &eq);
        let trigger = self.gen.trigger(true, vec![app]);
        let info = QuantInfo::named(&format!("funType:{}", fun.name));
        self.gen.forall(vars, vec![trigger], info, &body)
    }

    // Type parameters

    /// All ways of reading the type variable x off term, a term of sort T denoting typ
    fn typ_var_extractors(&mut self, x: &TypVar, typ: &Typ, term: Expr, out: &mut Vec<Expr>) {
        match &**typ {
            TypX::Var(y) if y == x => out.push(term),
            TypX::Ctor(c, args) => {
                let xs = [x.clone()];
                if !args.iter().any(|a| typ_mentions_any(a, &xs)) {
                    return;
                }
                let repr = self.typ_ctor_repr(c);
                for (i, arg) in args.iter().enumerate() {
                    if typ_mentions_any(arg, &xs) {
                        let sub = self.gen.apply(&repr.dtors[i], vec![term.clone()]);
                        self.typ_var_extractors(x, arg, sub, out);
                    }
                }
            }
            TypX::Map(m) => {
                let abstracted = self.abstract_map_typ(m);
                self.typ_var_extractors(x, &abstracted, term, out);
            }
            TypX::Var(_) | TypX::Bool | TypX::Int | TypX::BitVec(_) => {}
        }
    }

    /// Let-bind a fresh variable of sort T for each type parameter that can be read off the
    /// type of a witness of sort U; returns the binders and the parameters with no extractor
    pub(crate) fn gen_typ_param_bindings(
        &mut self,
        typ_params: &[TypVar],
        witnesses: &[(Typ, Var)],
        bindings: &mut TypVarBindings,
    ) -> (Vec<Binder<Expr>>, Vec<TypVar>) {
        let mut lets: Vec<Binder<Expr>> = Vec::new();
        let mut missing: Vec<TypVar> = Vec::new();
        for x in typ_params {
            let mut candidates: Vec<Expr> = Vec::new();
            for (typ, v) in witnesses {
                if &v.typ != self.u_typ() {
                    continue;
                }
                let term = self.type_of(&self.gen.var(v));
                self.typ_var_extractors(x, typ, term, &mut candidates);
            }
            match best_extractor(candidates) {
                Some(e) => {
                    let tv = self.gen.new_var(&x.name, self.t_typ());
                    bindings.insert(x.clone(), tv.clone());
                    lets.push(self.gen.let_binding(&tv, &e));
                }
                None => missing.push(x.clone()),
            }
        }
        (lets, missing)
    }

    /// Conjunction of the typing premises of new_vars that do not become trivial once the
    /// let-bound type variables are replaced by their definitions, and a negative trigger
    /// on type(x) for each kept premise
    pub(crate) fn gen_typ_premises(
        &mut self,
        old_vars: &[Var],
        new_vars: &[Var],
        bindings: &TypVarBindings,
        lets: &[Binder<Expr>],
    ) -> (Expr, Vec<Trigger>) {
        let defs: HashMap<Var, Expr> = lets.iter().map(|b| (b.var.clone(), b.a.clone())).collect();
        let mut premises: Vec<Expr> = Vec::new();
        let mut triggers: Vec<Trigger> = Vec::new();
        for (x, v) in old_vars.iter().zip(new_vars.iter()) {
            let premise = self.gen_var_typ_axiom(v, &x.typ, bindings);
            if is_trivial_premise(&substitute(&self.gen, &premise, &defs)) {
                continue;
            }
            triggers.push(self.gen.trigger(false, vec![self.type_of(&self.gen.var(v))]));
            premises.push(premise);
        }
        (self.gen.and_all(premises), triggers)
    }

    /// Universal quantifiers assume their premises, existential ones assert them.
    /// Only the lets that body or premises refer to are kept.
    pub(crate) fn add_typ_premises(
        &self,
        lets: &[Binder<Expr>],
        premises: &Expr,
        quant: Quant,
        body: &Expr,
    ) -> Expr {
        let combined = match quant {
            Quant::Forall => self.gen.implies_simp(premises, body),
            Quant::Exists => self.gen.and_simp(premises, body),
        };
        let free = free_vars(&combined);
        let used: Vec<Binder<Expr>> = lets.iter().filter(|b| free.contains(&b.var)).cloned().collect();
        self.gen.let_(used, &combined)
    }

    /// Wrap each trigger expression in the lets for the type variables it mentions
    pub(crate) fn add_lets_to_triggers(&self, lets: &[Binder<Expr>], triggers: Vec<Trigger>) -> Vec<Trigger> {
        if lets.len() == 0 {
            return triggers;
        }
        let mut new_triggers: Vec<Trigger> = Vec::new();
        for trigger in triggers {
            let mut exprs: Vec<Expr> = Vec::new();
            for e in trigger.exprs.iter() {
                let free = free_vars(e);
                let needed: Vec<Binder<Expr>> =
                    lets.iter().filter(|b| free.contains(&b.var)).cloned().collect();
                exprs.push(self.gen.let_(needed, e));
            }
            new_triggers.push(self.gen.trigger(trigger.pos, exprs));
        }
        new_triggers
    }

    // Maps

    pub(crate) fn gen_select_store_funs(
        &mut self,
        thinned: &MapTyp,
        ctor: &TypCtor,
        free: &[TypVar],
    ) -> MapClass {
        let map_syn = self.gen.ctor_typ(ctor, free.iter().map(typ_var_typ).collect());
        let mut typ_params: Vec<TypVar> = thinned.typ_params.iter().cloned().collect();
        typ_params.extend(free.iter().cloned());

        let mut select_params: Vec<Typ> = vec![map_syn.clone()];
        select_params.extend(thinned.args.iter().cloned());
        let mut store_params = select_params.clone();
        store_params.push(thinned.result.clone());
        let typed_select = self.gen.new_fun(
            &format!("{}Select", ctor.name),
            typ_params.clone(),
            select_params,
            &thinned.result,
        );
        let typed_store =
            self.gen.new_fun(&format!("{}Store", ctor.name), typ_params, store_params, &map_syn);
        let select = self.untyped_fun(&typed_select);
        let store = self.untyped_fun(&typed_store);

        let axiom0 = self.gen_map_axiom0(&select, &store, &typed_select);
        self.add_typ_axiom(axiom0);
        for axiom in self.gen_map_axioms1(&select, &store, &typed_select) {
            self.add_typ_axiom(axiom);
        }

        MapClass {
            ctor: ctor.clone(),
            select_explicit: explicit_positions(thinned, &select.explicit),
            store_explicit: explicit_positions(thinned, &store.explicit),
            select,
            store,
        }
    }

    /// Fresh variables for one map axiom. Explicit type parameters are quantified directly,
    /// implicit ones are read off m and either xs or ys.
    fn map_frame(
        &mut self,
        select: &UntypedFun,
        store: &UntypedFun,
        typed_select: &Fun,
        extract_from_ys: bool,
    ) -> MapFrame {
        let t = self.t_typ().clone();
        let n_explicit = select.explicit.len();
        let mut bindings = TypVarBindings::new();
        let mut typ_vars: Vec<Var> = Vec::new();
        for x in select.explicit.iter().chain(store.explicit.iter()) {
            if !bindings.contains_key(x) {
                let v = self.gen.new_var(&x.name, &t);
                bindings.insert(x.clone(), v.clone());
                typ_vars.push(v);
            }
        }
        let m = self.gen.new_var("m", &select.fun.params[n_explicit]);
        let idx_sorts: Vec<Typ> = select.fun.params[n_explicit + 1..].to_vec();
        let xs: Vec<Var> = idx_sorts
            .iter()
            .enumerate()
            .map(|(i, sort)| self.gen.new_var(&format!("x{}", i), sort))
            .collect();
        let ys: Vec<Var> = idx_sorts
            .iter()
            .enumerate()
            .map(|(i, sort)| self.gen.new_var(&format!("y{}", i), sort))
            .collect();
        let val = self.gen.new_var("val", &select.fun.ret);

        let mut witnesses: Vec<(Typ, Var)> = vec![(typed_select.params[0].clone(), m.clone())];
        let idx = if extract_from_ys { &ys } else { &xs };
        witnesses.extend(typed_select.params[1..].iter().cloned().zip(idx.iter().cloned()));
        let (lets, missing) = self.gen_typ_param_bindings(&select.implicit, &witnesses, &mut bindings);
        for x in missing {
            let v = self.gen.new_var(&x.name, &t);
            bindings.insert(x, v.clone());
            typ_vars.push(v);
        }
        MapFrame { typ_vars, bindings, lets, m, xs, ys, val }
    }

    fn typ_var_args(&self, xs: &TypVars, bindings: &TypVarBindings) -> Vec<Expr> {
        xs.iter()
            .map(|x| match bindings.get(x) {
                Some(v) => self.gen.var(v),
                None => panic!("internal error: unbound type parameter {}", x.name),
            })
            .collect()
    }

    fn map_select(&self, select: &UntypedFun, frame: &MapFrame, map: Expr, idx: &[Var]) -> Expr {
        let mut args = self.typ_var_args(&select.explicit, &frame.bindings);
        args.push(map);
        args.extend(idx.iter().map(|x| self.gen.var(x)));
        self.gen.apply(&select.fun, args)
    }

    fn map_store(&self, store: &UntypedFun, frame: &MapFrame) -> Expr {
        let mut args = self.typ_var_args(&store.explicit, &frame.bindings);
        args.push(self.gen.var(&frame.m));
        args.extend(frame.xs.iter().map(|x| self.gen.var(x)));
        args.push(self.gen.var(&frame.val));
        self.gen.apply(&store.fun, args)
    }

    /// Reading what was just written returns the written value, if it has the right type
    fn gen_map_axiom0(&mut self, select: &UntypedFun, store: &UntypedFun, typed_select: &Fun) -> Expr {
        let frame = self.map_frame(select, store, typed_select, false);
        let stored = self.map_store(store, &frame);
        let read = self.map_select(select, &frame, stored, &frame.xs);
        let eq = self.gen.eq(&read, &self.gen.var(&frame.val));
        let premise = self.gen_var_typ_axiom(&frame.val, &typed_select.ret, &frame.bindings);
        let body = self.add_typ_premises(&frame.lets, &premise, Quant::Forall, &eq);
        let mut vars = frame.typ_vars.clone();
        vars.push(frame.m.clone());
        vars.extend(frame.xs.iter().cloned());
        vars.push(frame.val.clone());
        let trigger = self.gen.trigger(true, vec![read]);
        let info = QuantInfo::named(&format!("mapAx0:{}", select.fun.name));
        self.gen.forall(vars, vec![trigger], info, &body)
    }

    /// Writing at one index does not affect reads at a different index, or reads at a
    /// type the written value does not have; one axiom per index, plus one for the type
    fn gen_map_axioms1(&mut self, select: &UntypedFun, store: &UntypedFun, typed_select: &Fun) -> Vec<Expr> {
        let mut axioms: Vec<Expr> = Vec::new();
        let n_indices = typed_select.params.len() - 1;
        for i in 0..n_indices {
            let frame = self.map_frame(select, store, typed_select, true);
            let (read, unchanged) = self.read_after_write(select, store, &frame);
            let x = self.gen.var(&frame.xs[i]);
            let y = self.gen.var(&frame.ys[i]);
            let body = self.gen.implies(&self.gen.neq(&x, &y), &unchanged);
            let trigger = self.gen.trigger(true, vec![read]);
            let info = QuantInfo::named(&format!("mapAx1:{}:{}", select.fun.name, i));
            axioms.push(self.gen.forall(Self::read_after_write_vars(&frame), vec![trigger], info, &body));
        }
        if select.explicit.len() > 0 && self.typing_enabled() && &select.fun.ret == self.u_typ() {
            let frame = self.map_frame(select, store, typed_select, true);
            let (read, unchanged) = self.read_after_write(select, store, &frame);
            let premise = self.gen_var_typ_axiom(&frame.val, &typed_select.ret, &frame.bindings);
            let mismatch = self.gen.not(&premise);
            let body = self.add_typ_premises(&frame.lets, &mismatch, Quant::Forall, &unchanged);
            let trigger = self.gen.trigger(true, vec![read]);
            let info = QuantInfo::named(&format!("mapAx2:{}", select.fun.name));
            axioms.push(self.gen.forall(Self::read_after_write_vars(&frame), vec![trigger], info, &body));
        }
        axioms
    }

    /// select(store(m, xs, val), ys) and the equation saying it equals select(m, ys)
    fn read_after_write(&self, select: &UntypedFun, store: &UntypedFun, frame: &MapFrame) -> (Expr, Expr) {
        let stored = self.map_store(store, frame);
        let read = self.map_select(select, frame, stored, &frame.ys);
        let old = self.map_select(select, frame, self.gen.var(&frame.m), &frame.ys);
        let eq = self.gen.eq(&read, &old);
        (read, eq)
    }

    fn read_after_write_vars(frame: &MapFrame) -> Vec<Var> {
        let mut vars = frame.typ_vars.clone();
        vars.push(frame.m.clone());
        vars.extend(frame.xs.iter().cloned());
        vars.extend(frame.ys.iter().cloned());
        vars.push(frame.val.clone());
        vars
    }
}

impl<'a> Eraser<'a> {
    /// Apply an untyped function to explicit type arguments followed by the erased args,
    /// each cast to the corresponding parameter sort
    fn apply_untyped(
        &mut self,
        fun: &Fun,
        mut new_args: Vec<Expr>,
        args: &[Expr],
        bindings: &VariableBindings,
    ) -> Expr {
        let n_explicit = new_args.len();
        for (arg, sort) in args.iter().zip(fun.params.iter().skip(n_explicit)) {
            let erased = self.erase_with_polarity(arg, bindings, Polarity::Neutral);
            new_args.push(self.axioms.cast(&erased, sort));
        }
        self.gen.apply(fun, new_args)
    }

    pub(crate) fn erase_fun_app(
        &mut self,
        fun: &Fun,
        args: &[Expr],
        typ_args: &[Typ],
        bindings: &VariableBindings,
    ) -> Expr {
        let untyped = self.axioms.untyped_fun(fun);
        let mut explicit: Vec<Expr> = Vec::new();
        for x in untyped.explicit.iter() {
            let i = match fun.typ_params.iter().position(|p| p == x) {
                Some(i) => i,
                None => panic!("internal error: {} is not a type parameter of {}", x.name, fun.name),
            };
            explicit.push(self.axioms.typ_to_term(&typ_args[i], &bindings.typ_vars));
        }
        self.apply_untyped(&untyped.fun, explicit, args, bindings)
    }

    pub(crate) fn erase_select_store(
        &mut self,
        op: &Op,
        args: &[Expr],
        typ_args: &[Typ],
        bindings: &VariableBindings,
    ) -> Expr {
        let map_typ = args[0].typ();
        if self.axioms.unchanged_typ(&map_typ) {
            let new_args = self.cast_args_to_own_old_typs(args, bindings);
            return self.gen.function(op.clone(), new_args, vec![]);
        }
        let m = match &*map_typ {
            TypX::Map(m) => m.clone(),
            _ => panic!(
                "internal error: select/store on {}",
                node_to_compact_string(&typ_to_node(&map_typ))
            ),
        };
        let class = self.axioms.map_class(&m);
        let (fun, positions) = match op {
            Op::Select { .. } => (class.select.fun.clone(), class.select_explicit.clone()),
            _ => (class.store.fun.clone(), class.store_explicit.clone()),
        };
        let mut explicit: Vec<Expr> = Vec::new();
        for i in positions.iter() {
            explicit.push(self.axioms.typ_to_term(&typ_args[*i], &bindings.typ_vars));
        }
        self.apply_untyped(&fun, explicit, args, bindings)
    }

    fn anti_triggers(&mut self, new_vars: &[Var]) -> Vec<Trigger> {
        let mut triggers: Vec<Trigger> = Vec::new();
        for v in new_vars {
            if &v.typ != self.axioms.u_typ() {
                continue;
            }
            for native in [int_typ(), bool_typ()].iter() {
                let cast = self.axioms.cast(&self.gen.var(v), native);
                triggers.push(self.gen.trigger(false, vec![cast]));
            }
        }
        triggers
    }

    pub(crate) fn handle_quantifier(
        &mut self,
        q: &QuantParts,
        occurring: &[Var],
        new_vars: &[Var],
        mut bindings: VariableBindings,
    ) -> Expr {
        let old_typs: Vec<Typ> = occurring.iter().map(|x| x.typ.clone()).collect();
        let (implicit, explicit) = split_typ_params(q.typ_params, &old_typs);
        let witnesses: Vec<(Typ, Var)> =
            old_typs.iter().cloned().zip(new_vars.iter().cloned()).collect();
        let (lets, missing) =
            self.axioms.gen_typ_param_bindings(&implicit, &witnesses, &mut bindings.typ_vars);
        for x in missing.iter() {
            log::debug!("no extractor for type parameter {}, quantifying it explicitly", x.name);
        }

        let mut quantified: Vec<Var> = Vec::new();
        for x in explicit.iter().chain(missing.iter()) {
            let t = self.gen.new_var(&x.name, self.axioms.t_typ());
            bindings.typ_vars.insert(x.clone(), t.clone());
            quantified.push(t);
        }
        quantified.extend(new_vars.iter().cloned());

        let (premises, premise_triggers) =
            self.axioms.gen_typ_premises(occurring, new_vars, &bindings.typ_vars, &lets);

        let mut triggers: Vec<Trigger> = Vec::new();
        for trigger in q.triggers.iter() {
            let mut exprs: Vec<Expr> = Vec::new();
            for e in trigger.exprs.iter() {
                exprs.push(self.erase_with_polarity(e, &bindings, Polarity::Neutral));
            }
            triggers.push(self.gen.trigger(trigger.pos, exprs));
        }
        triggers.extend(premise_triggers);
        triggers.extend(self.anti_triggers(new_vars));
        let triggers = self.axioms.add_lets_to_triggers(&lets, triggers);

        let body = self.erase_expr(q.body, &bindings);
        let body = self.axioms.cast(&body, &bool_typ());
        let body = self.axioms.add_typ_premises(&lets, &premises, q.quant, &body);
        if quantified.len() == 0 {
            return body;
        }
        self.gen.quantify(q.quant, vec![], quantified, triggers, q.info.clone(), &body)
    }
}
