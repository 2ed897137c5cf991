use crate::ast::{Expr, Fun, Polarity, Typ, TypVar};
use crate::axioms::AxiomBuilder;
use crate::emitter::Emitter;
use crate::erase::Eraser;
use crate::generator::Generator;
use serde::{Deserialize, Serialize};

pub type ConfigError = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeEncoding {
    /// types are dropped; only casts and select/store functions remain
    None,
    Premises,
    /// explicit type arguments everywhere (not supported)
    Arguments,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub type_encoding: TypeEncoding,
    /// keep maps over native sorts as solver arrays
    pub use_array_theory: bool,
    /// keep native sorts inside map types instead of abstracting them
    pub monomorphize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config { type_encoding: TypeEncoding::Premises, use_array_theory: false, monomorphize: true }
    }
}

/// One erasure session: the registries of every symbol and axiom created so far
pub struct Context {
    gen: Generator,
    axioms: AxiomBuilder,
    axiom_log: Emitter,
    erased_log: Emitter,
    // number of declared symbols already written to axiom_log
    logged_decls: usize,
    // number of axioms (in creation order, drained or not) already written to axiom_log
    logged_axioms: usize,
}

impl Context {
    pub fn new(config: Config) -> Result<Context, ConfigError> {
        if config.type_encoding == TypeEncoding::Arguments {
            return Err("type encoding by explicit arguments is not supported".to_string());
        }
        let gen = Generator::new();
        let axioms = AxiomBuilder::new(&gen, &config);
        Ok(Context {
            gen,
            axioms,
            axiom_log: Emitter::new(None),
            erased_log: Emitter::new(None),
            logged_decls: 0,
            logged_axioms: 0,
        })
    }

    pub fn generator(&self) -> &Generator {
        &self.gen
    }

    pub fn config(&self) -> &Config {
        &self.axioms.config
    }

    pub fn axiom_builder(&mut self) -> &mut AxiomBuilder {
        &mut self.axioms
    }

    pub fn set_axiom_log(&mut self, writer: Box<dyn std::io::Write>) {
        self.axiom_log.set_log(Some(writer));
    }

    pub fn set_erased_log(&mut self, writer: Box<dyn std::io::Write>) {
        self.erased_log.set_log(Some(writer));
    }

    /// Declare a (possibly polymorphic) user function; its untyped counterpart is
    /// created when it is first erased
    pub fn declare_function(
        &self,
        name: &str,
        typ_params: Vec<TypVar>,
        params: Vec<Typ>,
        ret: &Typ,
    ) -> Fun {
        self.gen.new_fun(name, typ_params, params, ret)
    }

    /// Erase a closed formula. Pass Polarity::Negative for assumptions and
    /// Polarity::Positive for the formula to be proven.
    pub fn erase(&mut self, expr: &Expr, polarity: Polarity) -> Expr {
        let erased = Eraser::new(&mut self.axioms).erase(expr, polarity);
        self.log_new_symbols();
        if !self.erased_log.is_none() {
            let label = match polarity {
                Polarity::Positive => "goal",
                Polarity::Negative => "assumption",
                Polarity::Neutral => "term",
            };
            self.erased_log.log_erased(label, &erased);
        }
        erased
    }

    fn log_new_symbols(&mut self) {
        if self.axiom_log.is_none() {
            return;
        }
        let decls = self.axioms.declared_funs();
        for fun in &decls[self.logged_decls..] {
            self.axiom_log.log_fun_decl(fun);
        }
        self.logged_decls = decls.len();
        let axioms = self.axioms.all_axioms();
        for axiom in &axioms[self.logged_axioms..] {
            self.axiom_log.log_axiom(axiom);
        }
        self.logged_axioms = axioms.len();
    }

    /// Conjunction of the axioms created since the previous call; true if there are none.
    /// The axioms mention symbols introduced by the erasures that caused them, so they
    /// must reach the solver together with those erased expressions.
    pub fn drain_new_axioms(&mut self) -> Expr {
        self.log_new_symbols();
        self.axiom_log.blank_line();
        self.axioms.drain_new_axioms()
    }

    pub fn all_axioms(&self) -> &[Expr] {
        self.axioms.all_axioms()
    }

    /// Every untyped symbol introduced so far, in creation order
    pub fn declared_functions(&self) -> &[Fun] {
        self.axioms.declared_funs()
    }

    /// Independent copy of the session; logs are not shared
    pub fn fork(&self) -> Context {
        Context {
            gen: self.gen.clone(),
            axioms: self.axioms.clone(),
            axiom_log: Emitter::new(None),
            erased_log: Emitter::new(None),
            logged_decls: self.axioms.declared_funs().len(),
            logged_axioms: self.axioms.all_axioms().len(),
        }
    }
}
