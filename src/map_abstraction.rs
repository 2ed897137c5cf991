//! Map types are abstracted into constructed types: the parts of a map type that do not
//! mention its bound type parameters are replaced by abstraction variables ("thinning"),
//! and every thinned map type gets one constructor `MapType<n>` whose arguments are
//! those abstraction variables.

use crate::ast::{MapTyp, MapTypX, Typ, TypCtor, TypVar, TypX};
use crate::ast_util::{typ_free_vars, typ_mentions_any, typ_var_typ};
use crate::axioms::AxiomBuilder;
use crate::premises::UntypedFun;
use indexmap::IndexMap;
use std::sync::Arc;

/// Everything generated for one class of map types
#[derive(Clone)]
pub struct MapClass {
    pub ctor: TypCtor,
    pub select: UntypedFun,
    pub store: UntypedFun,
    /// positions, among the map's own type parameters, of select's explicit type arguments
    pub select_explicit: Arc<Vec<usize>>,
    pub store_explicit: Arc<Vec<usize>>,
}

#[derive(Clone)]
pub(crate) struct MapAbstraction {
    // keyed by the thinned map type, compared up to renaming of bound type parameters
    classes: IndexMap<MapTyp, MapClass>,
    abstraction_vars: Vec<TypVar>,
    next_class_id: usize,
}

impl MapAbstraction {
    pub(crate) fn new() -> Self {
        MapAbstraction { classes: IndexMap::new(), abstraction_vars: Vec::new(), next_class_id: 0 }
    }

    pub(crate) fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

impl AxiomBuilder {
    fn abstraction_var(&mut self, i: usize) -> TypVar {
        while self.maps.abstraction_vars.len() <= i {
            let n = self.maps.abstraction_vars.len();
            let x = self.gen.new_typ_var(&format!("aVar{}", n));
            self.maps.abstraction_vars.push(x);
        }
        self.maps.abstraction_vars[i].clone()
    }

    /// The representative constructed type of m: its class constructor applied to the
    /// subtypes that thinning replaced
    pub fn abstract_map_typ(&mut self, m: &MapTyp) -> Typ {
        let mut instantiations: Vec<Typ> = Vec::new();
        let thinned = self.thin_out_map_typ(m, &mut instantiations);
        let class = self.map_class_of_thinned(&thinned);
        self.gen.ctor_typ(&class.ctor, instantiations)
    }

    pub fn map_class(&mut self, m: &MapTyp) -> MapClass {
        let mut instantiations: Vec<Typ> = Vec::new();
        let thinned = self.thin_out_map_typ(m, &mut instantiations);
        self.map_class_of_thinned(&thinned)
    }

    pub(crate) fn thin_out_map_typ(&mut self, m: &MapTyp, instantiations: &mut Vec<Typ>) -> MapTyp {
        let bound: Vec<TypVar> = m.typ_params.iter().cloned().collect();
        let mut args: Vec<Typ> = Vec::new();
        for arg in m.args.iter() {
            args.push(self.thin_out_typ(arg, &bound, instantiations));
        }
        let result = self.thin_out_typ(&m.result, &bound, instantiations);
        Arc::new(MapTypX { typ_params: m.typ_params.clone(), args: Arc::new(args), result })
    }

    fn thin_out_typ(&mut self, typ: &Typ, bound: &[TypVar], instantiations: &mut Vec<Typ>) -> Typ {
        if !typ_mentions_any(typ, bound) {
            if self.config.monomorphize && self.unchanged_typ(typ) {
                return typ.clone();
            }
            let x = self.abstraction_var(instantiations.len());
            instantiations.push(typ.clone());
            return typ_var_typ(&x);
        }
        match &**typ {
            TypX::Ctor(c, args) => {
                let mut new_args: Vec<Typ> = Vec::new();
                for arg in args.iter() {
                    new_args.push(self.thin_out_typ(arg, bound, instantiations));
                }
                self.gen.ctor_typ(c, new_args)
            }
            TypX::Map(m) => {
                let abstracted = self.abstract_map_typ(m);
                self.thin_out_typ(&abstracted, bound, instantiations)
            }
            // a bound parameter of the map being thinned
            TypX::Var(_) => typ.clone(),
            TypX::Bool | TypX::Int | TypX::BitVec(_) => typ.clone(),
        }
    }

    fn map_class_of_thinned(&mut self, thinned: &MapTyp) -> MapClass {
        if let Some(class) = self.maps.classes.get(thinned) {
            return class.clone();
        }
        let id = self.maps.next_class_id;
        self.maps.next_class_id += 1;
        let free: Vec<TypVar> =
            typ_free_vars(&Arc::new(TypX::Map(thinned.clone()))).into_iter().collect();
        log::debug!("new map class MapType{} for {:?}", id, thinned);
        let ctor = self.gen.new_typ_ctor(&format!("MapType{}", id), free.len());
        let class = self.gen_select_store_funs(thinned, &ctor, &free);
        self.maps.classes.insert(thinned.clone(), class.clone());
        class
    }
}
