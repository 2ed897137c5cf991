#![cfg(test)]

use crate::ast::{Expr, ExprX, MapTyp, Op, Polarity, QuantInfo, Typ, TypX};
use crate::ast_util::{bool_typ, bv_typ, int_typ, typ_var_typ};
use crate::context::{Config, Context, TypeEncoding};
use crate::generator::Generator;
use crate::printer::{expr_to_compact_string, fun_decl_to_node, node_to_compact_string};
use crate::typecheck::check_expr;
use crate::visitor::{free_vars, substitute};
use num_bigint::BigInt;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};

fn new_context() -> Context {
    Context::new(Config::default()).expect("default config")
}

fn context_with(config: Config) -> Context {
    Context::new(config).expect("config")
}

fn s(e: &Expr) -> String {
    expr_to_compact_string(e)
}

fn as_map(t: &Typ) -> MapTyp {
    match &**t {
        TypX::Map(m) => m.clone(),
        _ => panic!("not a map type"),
    }
}

fn axiom_with_qid(ctx: &Context, qid: &str) -> String {
    let key = format!(":qid {}", qid);
    let found: Vec<String> =
        ctx.all_axioms().iter().map(s).filter(|a| a.contains(&key)).collect();
    assert_eq!(found.len(), 1, "expected exactly one axiom with qid {}, found {:?}", qid, found);
    found[0].clone()
}

fn declared_named(ctx: &Context, name: &str) -> usize {
    ctx.declared_functions().iter().filter(|f| f.name.as_str() == name).count()
}

fn check_all_axioms(ctx: &Context) {
    for axiom in ctx.all_axioms() {
        match check_expr(axiom) {
            Ok(t) => assert!(*t == TypX::Bool, "axiom is not boolean: {}", s(axiom)),
            Err(err) => panic!("ill-formed axiom {}: {}", s(axiom), err),
        }
    }
}

fn check_erased(e: &Expr) {
    if let Err(err) = check_expr(e) {
        panic!("ill-formed erased expression {}: {}", s(e), err);
    }
}

#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// Generator

#[test]
fn trivial_simplifications() {
    let gen = Generator::new();
    let p = gen.var(&gen.new_var("p", &bool_typ()));
    assert!(gen.and_simp(&gen.mk_true(), &p) == p);
    assert!(gen.and_simp(&gen.mk_false(), &p).is_false());
    assert!(gen.or_simp(&gen.mk_true(), &p).is_true());
    assert!(gen.or_simp(&gen.mk_false(), &p) == p);
    assert!(gen.not_simp(&gen.not(&p)) == p);
    assert!(gen.implies_simp(&p, &gen.mk_true()).is_true());
    assert!(gen.distinct(vec![gen.mk_int(1)]).is_true());
    assert!(gen.distinct(vec![]).is_true());
    assert_eq!(s(&gen.distinct(vec![gen.mk_int(1), gen.mk_int(2)])), "(distinct 1 2)");
    assert!(gen.let_(vec![], &p) == p);
    assert!(gen.and_all(vec![]).is_true());
}

#[test]
fn implies_simp_folds_consequent() {
    let gen = Generator::new();
    let a = gen.var(&gen.new_var("a", &bool_typ()));
    let b = gen.var(&gen.new_var("b", &bool_typ()));
    let c = gen.var(&gen.new_var("c", &bool_typ()));
    let e = gen.implies_simp(&a, &gen.implies(&b, &c));
    assert_eq!(s(&e), "(=> (and a b) c)");
}

#[test]
fn forall_over_nothing_is_body() {
    let gen = Generator::new();
    let p = gen.var(&gen.new_var("p", &bool_typ()));
    assert!(gen.forall(vec![], vec![], QuantInfo::anonymous(), &p) == p);
    assert!(gen.exists(vec![], vec![], QuantInfo::anonymous(), &p) == p);
}

#[test]
#[should_panic]
fn quantify_over_nothing_panics() {
    let gen = Generator::new();
    let body = gen.mk_true();
    gen.quantify(crate::ast::Quant::Forall, vec![], vec![], vec![], QuantInfo::anonymous(), &body);
}

#[test]
fn ill_typed_application_is_rejected() {
    let gen = Generator::new();
    let r = gen.try_function(Op::Add, vec![gen.mk_true(), gen.mk_int(1)], vec![]);
    assert!(r.is_err());
    let r = gen.try_function(Op::Not, vec![gen.mk_true(), gen.mk_true()], vec![]);
    assert!(r.is_err());
    let f = gen.new_fun("f", vec![], vec![int_typ()], &bool_typ());
    let r = gen.try_function(Op::Fun(f.clone()), vec![gen.mk_int(1)], vec![int_typ()]);
    assert!(r.is_err());
    assert!(gen.try_function(Op::Fun(f), vec![gen.mk_int(1)], vec![]).is_ok());
}

#[test]
#[should_panic]
fn function_with_wrong_arity_panics() {
    let gen = Generator::new();
    gen.function(Op::Eq, vec![gen.mk_int(1)], vec![]);
}

#[test]
fn bit_vector_typing() {
    let gen = Generator::new();
    let x = gen.var(&gen.new_var("x", &bv_typ(8)));
    let y = gen.var(&gen.new_var("y", &bv_typ(8)));
    assert!(*gen.bv_concat(&x, &y).typ() == TypX::BitVec(16));
    assert!(*gen.bv_extract(&x, 0, 4).typ() == TypX::BitVec(4));
    assert_eq!(s(&gen.bv_extract(&x, 0, 4)), "((_ extract 3 0) x)");
    assert!(gen.try_function(Op::BvExtract(4, 12), vec![x], vec![]).is_err());
    assert_eq!(s(&gen.mk_bitvec(BigInt::from(5), 8)), "(_ bv5 8)");
    assert_eq!(s(&gen.mk_int(-3)), "(- 3)");
}

#[test]
fn polymorphic_map_typing() {
    let gen = Generator::new();
    let a = gen.new_typ_var("a");
    let m_typ = gen.map_typ(vec![a.clone()], vec![typ_var_typ(&a)], &typ_var_typ(&a));
    let m = gen.var(&gen.new_var("m", &m_typ));
    let read = gen.select(&m, vec![gen.mk_int(0)], vec![int_typ()]);
    assert!(*read.typ() == TypX::Int);
    let written = gen.store(&m, vec![gen.mk_int(0)], &gen.mk_int(1), vec![int_typ()]);
    assert!(written.typ() == m_typ);
    let bad = gen.try_function(
        Op::Select { arity: 2, typ_arity: 1 },
        vec![m.clone(), gen.mk_true()],
        vec![int_typ()],
    );
    assert!(bad.is_err());
    let missing_value = gen.try_function(Op::Store { arity: 1, typ_arity: 1 }, vec![m], vec![int_typ()]);
    match missing_value {
        Err(err) => assert!(err.contains("too few arguments"), "{}", err),
        Ok(e) => panic!("accepted {}", s(&e)),
    }
}

// Structural equality, visitors

#[test]
fn map_types_equal_up_to_renaming() {
    let gen = Generator::new();
    let a = gen.new_typ_var("a");
    let b = gen.new_typ_var("b");
    let m1 = gen.map_typ(vec![a.clone()], vec![typ_var_typ(&a)], &int_typ());
    let m2 = gen.map_typ(vec![b.clone()], vec![typ_var_typ(&b)], &int_typ());
    let m3 = gen.map_typ(vec![a.clone()], vec![int_typ()], &typ_var_typ(&a));
    assert!(m1 == m2);
    assert!(m1 != m3);
    let mut set: HashSet<Typ> = HashSet::new();
    set.insert(m1);
    assert!(set.contains(&m2));
    // a free type variable is not renamed
    let c = gen.new_typ_var("a");
    assert!(typ_var_typ(&a) != typ_var_typ(&c));
}

#[test]
fn deep_expressions_compare_and_erase_without_recursion() {
    let gen = Generator::new();
    let depth = 100_000;
    let p = gen.new_var("p", &bool_typ());
    let build = || gen.and_all((0..depth).map(|_| gen.var(&p)).collect());
    let e1 = build();
    let e2 = build();
    assert!(e1 == e2);
    let mut set: HashSet<Expr> = HashSet::new();
    set.insert(e1.clone());
    assert!(set.contains(&e2));

    let mut ctx = new_context();
    let p = ctx.generator().new_var("p", &bool_typ());
    let e3 = ctx.generator().and_all((0..depth).map(|_| ctx.generator().var(&p)).collect());
    let erased = ctx.erase(&e3, Polarity::Positive);
    assert!(*erased.typ() == TypX::Bool);
    drop(set);
    drop(e1);
    drop(e2);
    drop(e3);
    drop(erased);
}

#[test]
fn deep_expressions_drop_without_recursion() {
    let gen = Generator::new();
    let depth = 100_000;
    let p = gen.new_var("p", &bool_typ());
    let x = gen.new_var("x", &int_typ());
    let chain = gen.and_all((0..depth).map(|_| gen.var(&p)).collect());
    drop(chain);

    let body = gen.or_all((0..depth).map(|_| gen.lt(&gen.mk_int(0), &gen.var(&x))).collect());
    let q = gen.forall(vec![x.clone()], vec![], QuantInfo::anonymous(), &body);
    let shared = gen.and(&q, &body);
    drop(q);
    drop(body);
    assert!(*shared.typ() == TypX::Bool);
    drop(shared);
}

#[test]
fn substitution_avoids_capture() {
    let gen = Generator::new();
    let x = gen.new_var("x", &int_typ());
    let y = gen.new_var("y", &int_typ());
    let body = gen.lt(&gen.var(&x), &gen.var(&y));
    let q = gen.forall(vec![y.clone()], vec![], QuantInfo::anonymous(), &body);
    let mut subst = HashMap::new();
    subst.insert(x.clone(), gen.var(&y));
    let r = substitute(&gen, &q, &subst);
    let free: Vec<_> = free_vars(&r).into_iter().collect();
    assert!(free == vec![y]);
    assert_eq!(s(&r), "(forall ((y Int)) (< y y))");
    check_erased(&r);
}

// Type axiom builder

#[test]
fn registration_is_idempotent() {
    let mut ctx = new_context();
    let list = ctx.generator().new_typ_ctor("List", 1);
    let list_int = ctx.generator().ctor_typ(&list, vec![int_typ()]);
    let ab = ctx.axiom_builder();
    let t1 = ab.basic_typ_repr(&int_typ());
    let n_axioms = ab.all_axioms().len();
    let t2 = ab.basic_typ_repr(&int_typ());
    assert!(t1 == t2);
    assert_eq!(ab.all_axioms().len(), n_axioms);

    let term1 = ab.typ_to_term(&list_int, &im::HashMap::new());
    let n_axioms = ab.all_axioms().len();
    let n_decls = ab.declared_funs().len();
    let term2 = ab.typ_to_term(&list_int, &im::HashMap::new());
    assert!(term1 == term2);
    assert_eq!(s(&term1), "(ListType intType)");
    assert_eq!(ab.all_axioms().len(), n_axioms);
    assert_eq!(ab.declared_funs().len(), n_decls);
    let r1 = ab.typ_ctor_repr(&list);
    let r2 = ab.typ_ctor_repr(&list);
    assert!(r1.ctor == r2.ctor);
    assert_eq!(r1.dtors.len(), 1);
    assert_eq!(r1.dtors[0].name.as_str(), "ListTypeInv0");
    check_all_axioms(&ctx);
}

#[test]
fn constructor_axioms() {
    let mut ctx = new_context();
    let pair = ctx.generator().new_typ_ctor("Pair", 2);
    ctx.axiom_builder().typ_ctor_repr(&pair);
    assert_eq!(
        axiom_with_qid(&ctx, "ctor:PairType"),
        "(forall ((x0 T) (x1 T)) (! (= (Ctor (PairType x0 x1)) 2) :pattern ((PairType x0 x1)) :qid ctor:PairType))"
    );
    assert_eq!(
        axiom_with_qid(&ctx, "typeInv:PairTypeInv1"),
        "(forall ((x0 T) (x1 T)) (! (= (PairTypeInv1 (PairType x0 x1)) x1) :pattern ((PairType x0 x1)) :qid typeInv:PairTypeInv1))"
    );
    let first: Vec<String> = ctx.all_axioms().iter().take(2).map(s).collect();
    assert_eq!(first, vec!["(= (Ctor intType) 0)", "(= (Ctor boolType) 1)"]);
}

#[test]
fn cast_axioms() {
    let mut ctx = new_context();
    let u = ctx.axiom_builder().u_typ().clone();
    let casts = ctx.axiom_builder().typ_casts(&int_typ());
    assert_eq!(casts.to_u.name.as_str(), "int_2_U");
    assert_eq!(casts.from_u.name.as_str(), "U_2_int");
    assert!(casts.to_u.ret == u);
    assert_eq!(
        axiom_with_qid(&ctx, "cast:U_2_int"),
        "(forall ((x0 Int)) (! (= (U_2_int (int_2_U x0)) x0) :pattern ((int_2_U x0)) :qid cast:U_2_int))"
    );
    assert_eq!(
        axiom_with_qid(&ctx, "reverseCast:U_2_int"),
        "(forall ((x U)) (! (=> (= (type x) intType) (= (int_2_U (U_2_int x)) x)) :pattern ((U_2_int x)) :qid reverseCast:U_2_int))"
    );
    assert_eq!(
        axiom_with_qid(&ctx, "funType:int_2_U"),
        "(forall ((x Int)) (! (= (type (int_2_U x)) intType) :pattern ((int_2_U x)) :qid funType:int_2_U))"
    );
    let x = ctx.generator().new_var("x", &int_typ());
    let xe = ctx.generator().var(&x);
    let up = ctx.axiom_builder().cast(&xe, &u);
    assert_eq!(s(&up), "(int_2_U x)");
    assert!(ctx.axiom_builder().cast(&xe, &int_typ()) == xe);
    let down = ctx.axiom_builder().cast(&up, &int_typ());
    assert_eq!(s(&down), "(U_2_int (int_2_U x))");
    check_all_axioms(&ctx);
}

#[test]
#[should_panic]
fn cast_between_native_sorts_panics() {
    let mut ctx = new_context();
    let one = ctx.generator().mk_int(1);
    ctx.axiom_builder().cast(&one, &bool_typ());
}

// Map abstraction

#[test]
fn alpha_equivalent_maps_share_a_class() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let b = gen.new_typ_var("b");
    let m1 = as_map(&gen.map_typ(vec![a.clone()], vec![typ_var_typ(&a)], &typ_var_typ(&a)));
    let m2 = as_map(&gen.map_typ(vec![b.clone()], vec![typ_var_typ(&b)], &typ_var_typ(&b)));
    let ab = ctx.axiom_builder();
    let t1 = ab.abstract_map_typ(&m1);
    let t2 = ab.abstract_map_typ(&m2);
    assert!(t1 == t2);
    assert_eq!(node_to_compact_string(&crate::printer::typ_to_node(&t1)), "MapType0");
    assert_eq!(ab.maps.num_classes(), 1);
    check_all_axioms(&ctx);
}

#[test]
fn instantiations_distinguish_thinned_maps() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let foo = gen.ctor_typ(&gen.new_typ_ctor("Foo", 0), vec![]);
    let bar = gen.ctor_typ(&gen.new_typ_ctor("Bar", 0), vec![]);
    let m1 = as_map(&gen.map_typ(vec![], vec![int_typ()], &foo));
    let m2 = as_map(&gen.map_typ(vec![], vec![int_typ()], &bar));
    let ab = ctx.axiom_builder();
    let t1 = ab.abstract_map_typ(&m1);
    let t2 = ab.abstract_map_typ(&m2);
    assert!(t1 != t2);
    assert_eq!(ab.maps.num_classes(), 1);
    match (&*t1, &*t2) {
        (TypX::Ctor(c1, args1), TypX::Ctor(c2, args2)) => {
            assert!(c1 == c2);
            assert!(args1[0] == foo);
            assert!(args2[0] == bar);
        }
        _ => panic!("expected constructed types"),
    }
    let term = ab.typ_to_term(&gen.map_typ(vec![], vec![int_typ()], &foo), &im::HashMap::new());
    assert_eq!(s(&term), "(MapType0Type FooType)");
    check_all_axioms(&ctx);
}

#[test]
fn monomorphize_off_thins_native_types() {
    let config = Config { monomorphize: false, ..Config::default() };
    let mut ctx = context_with(config);
    let gen = ctx.generator().clone();
    let m1 = as_map(&gen.map_typ(vec![], vec![int_typ()], &bool_typ()));
    let m2 = as_map(&gen.map_typ(vec![], vec![bool_typ()], &int_typ()));
    let ab = ctx.axiom_builder();
    let t1 = ab.abstract_map_typ(&m1);
    let t2 = ab.abstract_map_typ(&m2);
    assert_eq!(ab.maps.num_classes(), 1);
    assert_eq!(node_to_compact_string(&crate::printer::typ_to_node(&t1)), "(MapType0 Int Bool)");
    assert_eq!(node_to_compact_string(&crate::printer::typ_to_node(&t2)), "(MapType0 Bool Int)");
    let u = ab.u_typ().clone();
    let class = ab.map_class(&m1);
    assert!(class.select.fun.params.iter().all(|t| *t == u));
    assert!(class.select.fun.ret == u);
    check_all_axioms(&ctx);
}

#[test]
fn nested_maps_are_abstracted_first() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let inner = gen.map_typ(vec![], vec![typ_var_typ(&a)], &int_typ());
    let outer = as_map(&gen.map_typ(vec![a.clone()], vec![typ_var_typ(&a)], &inner));
    let ab = ctx.axiom_builder();
    let t = ab.abstract_map_typ(&outer);
    assert_eq!(ab.maps.num_classes(), 2);
    assert_eq!(node_to_compact_string(&crate::printer::typ_to_node(&t)), "MapType1");
    check_all_axioms(&ctx);
}

// End-to-end erasure

#[test]
fn native_function_is_unchanged() {
    let mut ctx = new_context();
    let f = ctx.declare_function("f", vec![], vec![int_typ()], &bool_typ());
    let three = ctx.generator().mk_int(3);
    let e = ctx.generator().apply(&f, vec![three]);
    let erased = ctx.erase(&e, Polarity::Positive);
    assert_eq!(s(&erased), "(f 3)");
    match &*erased {
        ExprX::Apply { op: Op::Fun(g), .. } => assert!(*g == f),
        _ => panic!("expected an application"),
    }
    assert_eq!(declared_named(&ctx, "int_2_U"), 0);
    assert_eq!(s(&ctx.drain_new_axioms()), "(and (= (Ctor intType) 0) (= (Ctor boolType) 1))");
    assert!(ctx.drain_new_axioms().is_true());
}

#[test]
fn generic_identity_function() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let g = ctx.declare_function("g", vec![a.clone()], vec![typ_var_typ(&a)], &typ_var_typ(&a));
    let x = gen.new_var("x", &int_typ());
    let app = gen.apply_with_typs(&g, vec![gen.var(&x)], vec![int_typ()]);
    let body = gen.eq(&app, &gen.var(&x));
    let q = gen.forall(vec![x], vec![], QuantInfo::anonymous(), &body);
    let erased = ctx.erase(&q, Polarity::Positive);
    assert_eq!(s(&erased), "(forall ((x Int)) (= (U_2_int (g (int_2_U x))) x))");
    assert_eq!(
        axiom_with_qid(&ctx, "funType:g"),
        "(forall ((arg0 U)) (! (let ((a (type arg0))) (= (type (g arg0)) a)) :pattern ((g arg0)) :qid funType:g))"
    );
    assert_eq!(declared_named(&ctx, "g"), 1);
    check_erased(&erased);
    check_all_axioms(&ctx);
}

#[test]
fn polymorphic_quantifier_uses_implicit_type_parameter() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let g = ctx.declare_function("g", vec![a.clone()], vec![typ_var_typ(&a)], &typ_var_typ(&a));
    let b = gen.new_typ_var("b");
    let x = gen.new_var("x", &typ_var_typ(&b));
    let app = gen.apply_with_typs(&g, vec![gen.var(&x)], vec![typ_var_typ(&b)]);
    let body = gen.eq(&app, &gen.var(&x));
    let q = gen.quantify(
        crate::ast::Quant::Forall,
        vec![b],
        vec![x],
        vec![],
        QuantInfo::named("id"),
        &body,
    );
    let erased = ctx.erase(&q, Polarity::Negative);
    assert_eq!(
        s(&erased),
        "(forall ((x U)) (! (= (g x) x) :no-pattern ((U_2_int x)) :no-pattern ((U_2_bool x)) :qid id))"
    );
    check_erased(&erased);
    check_all_axioms(&ctx);
}

#[test]
fn type_parameter_is_read_through_constructor() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let list = gen.new_typ_ctor("List", 1);
    let t = gen.new_typ_var("t");
    let list_t = gen.ctor_typ(&list, vec![typ_var_typ(&t)]);
    let hd = ctx.declare_function("hd", vec![t.clone()], vec![list_t], &typ_var_typ(&t));
    let d = ctx.declare_function("d", vec![t.clone()], vec![int_typ()], &typ_var_typ(&t));

    let a = gen.new_typ_var("a");
    let x = gen.new_var("x", &gen.ctor_typ(&list, vec![typ_var_typ(&a)]));
    let hd_x = gen.apply_with_typs(&hd, vec![gen.var(&x)], vec![typ_var_typ(&a)]);
    let d_0 = gen.apply_with_typs(&d, vec![gen.mk_int(0)], vec![typ_var_typ(&a)]);
    let trigger = gen.trigger(true, vec![d_0.clone(), hd_x.clone()]);
    let q = gen.quantify(
        crate::ast::Quant::Forall,
        vec![a],
        vec![x],
        vec![trigger],
        QuantInfo::anonymous(),
        &gen.eq(&hd_x, &d_0),
    );
    let erased = ctx.erase(&q, Polarity::Negative);
    assert_eq!(
        s(&erased),
        "(forall ((x U)) (! (let ((a (ListTypeInv0 (type x)))) (=> (= (type x) (ListType a)) (= (hd x) (d a 0)))) :pattern ((let ((a (ListTypeInv0 (type x)))) (d a 0)) (hd x)) :no-pattern ((type x)) :no-pattern ((U_2_int x)) :no-pattern ((U_2_bool x))))"
    );
    check_erased(&erased);
    check_all_axioms(&ctx);
}

#[test]
fn smallest_extractor_wins() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let list = gen.new_typ_ctor("List", 1);
    let t = gen.new_typ_var("t");
    let list_t = gen.ctor_typ(&list, vec![typ_var_typ(&t)]);
    let hd = ctx.declare_function("hd", vec![t.clone()], vec![list_t], &typ_var_typ(&t));

    let a = gen.new_typ_var("a");
    let x = gen.new_var("x", &gen.ctor_typ(&list, vec![typ_var_typ(&a)]));
    let y = gen.new_var("y", &typ_var_typ(&a));
    let hd_x = gen.apply_with_typs(&hd, vec![gen.var(&x)], vec![typ_var_typ(&a)]);
    let q = gen.quantify(
        crate::ast::Quant::Forall,
        vec![a],
        vec![x, y.clone()],
        vec![],
        QuantInfo::anonymous(),
        &gen.eq(&hd_x, &gen.var(&y)),
    );
    let erased = ctx.erase(&q, Polarity::Negative);
    // the premise on y becomes (= (type y) (type y)) and is dropped
    assert_eq!(
        s(&erased),
        "(forall ((x U) (y U)) (! (let ((a (type y))) (=> (= (type x) (ListType a)) (= (hd x) y))) :no-pattern ((type x)) :no-pattern ((U_2_int x)) :no-pattern ((U_2_bool x)) :no-pattern ((U_2_int y)) :no-pattern ((U_2_bool y))))"
    );
    check_erased(&erased);
    check_all_axioms(&ctx);
}

#[test]
fn explicit_type_arguments() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let default = ctx.declare_function("default", vec![a.clone()], vec![], &typ_var_typ(&a));
    let app = gen.apply_with_typs(&default, vec![], vec![int_typ()]);
    let e = gen.eq(&app, &gen.mk_int(0));
    let erased = ctx.erase(&e, Polarity::Positive);
    assert_eq!(s(&erased), "(= (U_2_int (default intType)) 0)");
    assert_eq!(
        axiom_with_qid(&ctx, "funType:default"),
        "(forall ((a T)) (! (= (type (default a)) a) :pattern ((default a)) :qid funType:default))"
    );
    check_erased(&erased);
    check_all_axioms(&ctx);
}

#[test]
fn existential_map_variable() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let m_typ = gen.map_typ(vec![], vec![int_typ()], &bool_typ());
    let m = gen.new_var("m", &m_typ);
    let read = gen.select(&gen.var(&m), vec![gen.mk_int(0)], vec![]);
    let q = gen.exists(vec![m], vec![], QuantInfo::anonymous(), &read);
    let erased = ctx.erase(&q, Polarity::Positive);
    assert_eq!(
        s(&erased),
        "(exists ((m U)) (! (and (= (type m) MapType0Type) (MapType0Select m 0)) :no-pattern ((type m)) :no-pattern ((U_2_int m)) :no-pattern ((U_2_bool m))))"
    );
    assert_eq!(declared_named(&ctx, "MapType0Select"), 1);
    assert_eq!(declared_named(&ctx, "MapType0Store"), 1);
    assert_eq!(
        axiom_with_qid(&ctx, "mapAx0:MapType0Select"),
        "(forall ((m U) (x0 Int) (val Bool)) (! (= (MapType0Select (MapType0Store m x0 val) x0) val) :pattern ((MapType0Select (MapType0Store m x0 val) x0)) :qid mapAx0:MapType0Select))"
    );
    assert_eq!(
        axiom_with_qid(&ctx, "mapAx1:MapType0Select:0"),
        "(forall ((m U) (x0 Int) (y0 Int) (val Bool)) (! (=> (!= x0 y0) (= (MapType0Select (MapType0Store m x0 val) y0) (MapType0Select m y0))) :pattern ((MapType0Select (MapType0Store m x0 val) y0)) :qid mapAx1:MapType0Select:0))"
    );
    assert_eq!(
        axiom_with_qid(&ctx, "funType:MapType0Store"),
        "(forall ((arg0 U) (arg1 Int) (arg2 Bool)) (! (= (type (MapType0Store arg0 arg1 arg2)) MapType0Type) :pattern ((MapType0Store arg0 arg1 arg2)) :qid funType:MapType0Store))"
    );

    // a structurally identical map type reuses the same select function
    let m2 = gen.new_var("n", &gen.map_typ(vec![], vec![int_typ()], &bool_typ()));
    let read2 = gen.select(&gen.var(&m2), vec![gen.mk_int(1)], vec![]);
    let q2 = gen.exists(vec![m2], vec![], QuantInfo::anonymous(), &read2);
    let erased2 = ctx.erase(&q2, Polarity::Positive);
    assert_eq!(declared_named(&ctx, "MapType0Select"), 1);
    assert_eq!(declared_named(&ctx, "MapType1Select"), 0);
    let select_fun = |e: &Expr| -> crate::ast::Fun {
        let mut stack = vec![e.clone()];
        while let Some(e) = stack.pop() {
            match &*e {
                ExprX::Apply { op: Op::Fun(f), .. } if f.name.as_str() == "MapType0Select" => {
                    return f.clone();
                }
                ExprX::Apply { args, .. } => stack.extend(args.iter().cloned()),
                ExprX::Bind(_, body) => stack.push(body.clone()),
                _ => {}
            }
        }
        panic!("no select in {}", s(e));
    };
    assert!(select_fun(&erased) == select_fun(&erased2));
    check_erased(&erased);
    check_erased(&erased2);
    check_all_axioms(&ctx);
}

#[test]
fn polymorphic_map_select() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let m_typ = gen.map_typ(vec![a.clone()], vec![typ_var_typ(&a)], &typ_var_typ(&a));
    let m = gen.new_var("m", &m_typ);
    let read = gen.select(&gen.var(&m), vec![gen.mk_int(5)], vec![int_typ()]);
    let e = gen.eq(&read, &gen.mk_int(5));
    let erased = ctx.erase(&e, Polarity::Positive);
    assert_eq!(s(&erased), "(= (U_2_int (MapType0Select m (int_2_U 5))) 5)");
    assert_eq!(
        axiom_with_qid(&ctx, "mapAx0:MapType0Select"),
        "(forall ((m U) (x0 U) (val U)) (! (let ((a (type x0))) (=> (= (type val) a) (= (MapType0Select (MapType0Store m x0 val) x0) val))) :pattern ((MapType0Select (MapType0Store m x0 val) x0)) :qid mapAx0:MapType0Select))"
    );
    // the free variable m gets a typing axiom
    assert!(ctx.all_axioms().iter().any(|ax| s(ax) == "(= (type m) MapType0Type)"));
    check_erased(&erased);
    check_all_axioms(&ctx);
}

#[test]
fn map_with_explicit_type_parameter() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let m_typ = gen.map_typ(vec![a.clone()], vec![int_typ()], &typ_var_typ(&a));
    let m = gen.new_var("m", &m_typ);
    let read = gen.select(&gen.var(&m), vec![gen.mk_int(0)], vec![bool_typ()]);
    let erased = ctx.erase(&read, Polarity::Positive);
    assert_eq!(s(&erased), "(U_2_bool (MapType0Select boolType m 0))");
    assert_eq!(
        axiom_with_qid(&ctx, "mapAx2:MapType0Select"),
        "(forall ((a T) (m U) (x0 Int) (y0 Int) (val U)) (! (=> (not (= (type val) a)) (= (MapType0Select a (MapType0Store m x0 val) y0) (MapType0Select a m y0))) :pattern ((MapType0Select a (MapType0Store m x0 val) y0)) :qid mapAx2:MapType0Select))"
    );
    assert_eq!(
        axiom_with_qid(&ctx, "funType:MapType0Select"),
        "(forall ((a T) (arg0 U) (arg1 Int)) (! (= (type (MapType0Select a arg0 arg1)) a) :pattern ((MapType0Select a arg0 arg1)) :qid funType:MapType0Select))"
    );
    check_erased(&erased);
    check_all_axioms(&ctx);
}

#[test]
fn array_theory_keeps_native_maps() {
    let config = Config { use_array_theory: true, ..Config::default() };
    let mut ctx = context_with(config);
    let gen = ctx.generator().clone();
    let m_typ = gen.map_typ(vec![], vec![int_typ()], &bool_typ());
    let m = gen.new_var("m", &m_typ);
    let read = gen.select(&gen.var(&m), vec![gen.mk_int(0)], vec![]);
    let q = gen.exists(vec![m], vec![], QuantInfo::anonymous(), &read);
    let erased = ctx.erase(&q, Polarity::Positive);
    assert_eq!(s(&erased), "(exists ((m (Map (Int) Bool))) (select m 0))");
    assert_eq!(ctx.axiom_builder().maps.num_classes(), 0);
    check_erased(&erased);
}

#[test]
fn cast_only_variable_is_retyped_once() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let h = ctx.declare_function("h", vec![a.clone()], vec![typ_var_typ(&a)], &int_typ());
    let x = gen.new_var("x", &int_typ());
    let app = gen.apply_with_typs(&h, vec![gen.var(&x)], vec![int_typ()]);
    let body = gen.binary(Op::Gt, &app, &gen.mk_int(0));
    let trigger = gen.trigger(true, vec![app.clone()]);
    let q = gen.forall(vec![x], vec![trigger], QuantInfo::anonymous(), &body);

    // as the goal, a forall is not universal, so x keeps its native sort
    let mut goal_ctx = ctx.fork();
    let goal = goal_ctx.erase(&q, Polarity::Positive);
    assert_eq!(s(&goal), "(forall ((x Int)) (! (> (h (int_2_U x)) 0) :pattern ((h (int_2_U x)))))");

    // as an assumption, x is only used under a cast in the trigger and is retyped to U
    let assumed = ctx.erase(&q, Polarity::Negative);
    assert_eq!(
        s(&assumed),
        "(forall ((x U)) (! (=> (= (type x) intType) (> (h x) 0)) :pattern ((h x)) :no-pattern ((type x)) :no-pattern ((U_2_int x)) :no-pattern ((U_2_bool x))))"
    );
    check_erased(&goal);
    check_erased(&assumed);
    check_all_axioms(&ctx);
    check_all_axioms(&goal_ctx);
}

#[test]
fn polarity_flips_under_negation() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let h = ctx.declare_function("h", vec![a.clone()], vec![typ_var_typ(&a)], &int_typ());
    let x = gen.new_var("x", &int_typ());
    let app = gen.apply_with_typs(&h, vec![gen.var(&x)], vec![int_typ()]);
    let body = gen.binary(Op::Gt, &app, &gen.mk_int(0));
    let trigger = gen.trigger(true, vec![app.clone()]);
    let q = gen.forall(vec![x], vec![trigger], QuantInfo::anonymous(), &body);
    // not (forall ..) proven: the forall is assumed
    let erased = ctx.erase(&gen.not(&q), Polarity::Positive);
    assert!(s(&erased).starts_with("(not (forall ((x U))"));
    // p ==> forall ..: the forall is proven
    let p = gen.var(&gen.new_var("p", &bool_typ()));
    let erased = ctx.erase(&gen.implies(&p, &q), Polarity::Positive);
    assert!(s(&erased).starts_with("(=> p (forall ((x Int))"));
}

#[test]
fn let_bindings_are_erased() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let foo = gen.ctor_typ(&gen.new_typ_ctor("Foo", 0), vec![]);
    let c = gen.new_var("c", &foo);
    let y = gen.new_var("y", &foo);
    let body = gen.eq(&gen.var(&y), &gen.var(&c));
    let e = gen.let_(vec![gen.let_binding(&y, &gen.var(&c))], &body);
    let erased = ctx.erase(&e, Polarity::Positive);
    assert_eq!(s(&erased), "(let ((y c)) (= y c))");
    assert!(ctx.all_axioms().iter().any(|ax| s(ax) == "(= (type c) FooType)"));
    check_erased(&erased);
}

#[test]
fn native_operators_keep_their_sorts() {
    let mut ctx = new_context();
    let gen = ctx.generator().clone();
    let x = gen.var(&gen.new_var("x", &bv_typ(8)));
    let y = gen.var(&gen.new_var("y", &bv_typ(8)));
    let z = gen.var(&gen.new_var("z", &bv_typ(8)));
    let e = gen.eq(&gen.bv(crate::ast::BvOp::Add, &x, &y), &z);
    let erased = ctx.erase(&e, Polarity::Positive);
    assert_eq!(s(&erased), "(= (bvadd x y) z)");
    let i = gen.var(&gen.new_var("i", &int_typ()));
    let e = gen.ite(&gen.lt(&i, &gen.mk_int(0)), &gen.mk_int(1), &i);
    let e = gen.le(&e, &gen.mk_int(2));
    let erased = ctx.erase(&e, Polarity::Positive);
    assert_eq!(s(&erased), "(<= (ite (< i 0) 1 i) 2)");
    assert!(ctx.declared_functions().iter().all(|f| f.name.as_str() != "bv8_2_U"));
}

#[test]
fn none_encoding_omits_typing() {
    let config = Config { type_encoding: TypeEncoding::None, ..Config::default() };
    let mut ctx = context_with(config);
    let gen = ctx.generator().clone();
    let m_typ = gen.map_typ(vec![], vec![int_typ()], &bool_typ());
    let m = gen.new_var("m", &m_typ);
    let read = gen.select(&gen.var(&m), vec![gen.mk_int(0)], vec![]);
    let q = gen.exists(vec![m], vec![], QuantInfo::anonymous(), &read);
    let erased = ctx.erase(&q, Polarity::Positive);
    assert_eq!(
        s(&erased),
        "(exists ((m U)) (! (MapType0Select m 0) :no-pattern ((U_2_int m)) :no-pattern ((U_2_bool m))))"
    );
    for axiom in ctx.all_axioms() {
        assert!(!s(axiom).contains("(type "), "typing axiom in mode none: {}", s(axiom));
        assert!(!s(axiom).contains("Ctor"), "constructor axiom in mode none: {}", s(axiom));
    }
    check_all_axioms(&ctx);
}

#[test]
fn arguments_encoding_is_rejected() {
    let config = Config { type_encoding: TypeEncoding::Arguments, ..Config::default() };
    assert!(Context::new(config).is_err());
    let config = Config::default();
    assert_eq!(config.type_encoding, TypeEncoding::Premises);
    assert!(!config.use_array_theory);
    assert!(config.monomorphize);
}

// Sessions

#[test]
fn fork_is_independent() {
    let mut ctx = new_context();
    let n_decls = ctx.declared_functions().len();
    let n_axioms = ctx.all_axioms().len();
    let mut forked = ctx.fork();
    let gen = forked.generator().clone();
    let foo = gen.ctor_typ(&gen.new_typ_ctor("Foo", 0), vec![]);
    let c = gen.var(&gen.new_var("c", &foo));
    let e = gen.eq(&c, &c);
    forked.erase(&e, Polarity::Positive);
    assert!(forked.declared_functions().len() > n_decls);
    assert!(forked.all_axioms().len() > n_axioms);
    assert_eq!(ctx.declared_functions().len(), n_decls);
    assert_eq!(ctx.all_axioms().len(), n_axioms);
    assert_eq!(s(&ctx.drain_new_axioms()), "(and (= (Ctor intType) 0) (= (Ctor boolType) 1))");
}

#[test]
fn axioms_and_declarations_are_logged() {
    let mut ctx = new_context();
    let buffer = SharedBuffer(Arc::new(Mutex::new(Vec::new())));
    ctx.set_axiom_log(Box::new(buffer.clone()));
    let gen = ctx.generator().clone();
    let a = gen.new_typ_var("a");
    let g = ctx.declare_function("g", vec![a.clone()], vec![typ_var_typ(&a)], &typ_var_typ(&a));
    let app = gen.apply_with_typs(&g, vec![gen.mk_int(1)], vec![int_typ()]);
    ctx.erase(&gen.eq(&app, &gen.mk_int(1)), Polarity::Positive);
    ctx.drain_new_axioms();
    let log = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(log.contains("(declare-fun int_2_U (Int) U)"));
    assert!(log.contains("(declare-fun g (U) U)"));
    assert!(log.contains("(axiom"));
    assert!(log.contains("funType:g"));
    assert_eq!(node_to_compact_string(&fun_decl_to_node(&g)), "(declare-fun g (typ a) (a) a)");
}

#[test]
fn logging_survives_draining_through_the_builder() {
    let mut ctx = new_context();
    let buffer = SharedBuffer(Arc::new(Mutex::new(Vec::new())));
    ctx.set_axiom_log(Box::new(buffer.clone()));
    let gen = ctx.generator().clone();
    let foo = gen.ctor_typ(&gen.new_typ_ctor("Foo", 0), vec![]);
    let bar = gen.ctor_typ(&gen.new_typ_ctor("Bar", 0), vec![]);
    let c = gen.var(&gen.new_var("c", &foo));
    let d = gen.var(&gen.new_var("d", &bar));
    ctx.erase(&gen.eq(&c, &c), Polarity::Positive);
    ctx.axiom_builder().drain_new_axioms();
    ctx.erase(&gen.eq(&d, &d), Polarity::Positive);
    let pending = s(&ctx.drain_new_axioms());
    assert!(pending.contains("(= (type d) BarType)"), "{}", pending);
    assert!(!pending.contains("(type c)"), "{}", pending);
    let log = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert_eq!(log.matches("(type c)").count(), 1, "{}", log);
    assert_eq!(log.matches("(type d)").count(), 1, "{}", log);
}

#[test]
fn forks_never_reuse_identities() {
    let ctx = new_context();
    let forked = ctx.fork();
    let x = ctx.generator().new_var("x", &int_typ());
    let y = forked.generator().new_var("x", &int_typ());
    assert!(x != y);
    let a = ctx.generator().new_typ_var("a");
    let b = forked.generator().new_typ_var("a");
    assert!(typ_var_typ(&a) != typ_var_typ(&b));
}
