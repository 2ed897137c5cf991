use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type TypeError = String;

pub type Ident = Arc<String>;

/// Identity of variables, type variables, type constructors and function symbols.
/// Two objects with the same name but different uids are different.
pub type Uid = u64;

pub type TypVar = Arc<TypVarX>;
pub type TypVars = Arc<Vec<TypVar>>;
#[derive(Clone, Serialize, Deserialize)] // for Debug, PartialEq, Hash, see ast_util
pub struct TypVarX {
    pub name: Ident,
    pub uid: Uid,
}

pub type TypCtor = Arc<TypCtorX>;
#[derive(Clone, Serialize, Deserialize)] // for Debug, PartialEq, Hash, see ast_util
pub struct TypCtorX {
    pub name: Ident,
    pub arity: usize,
    pub uid: Uid,
}

pub type MapTyp = Arc<MapTypX>;
#[derive(Clone, Serialize, Deserialize)] // for Debug, PartialEq, Hash, see ast_util
pub struct MapTypX {
    /// bound type parameters; maps equal up to renaming of these are equal
    pub typ_params: TypVars,
    pub args: Typs,
    pub result: Typ,
}

pub type Typ = Arc<TypX>;
pub type Typs = Arc<Vec<Typ>>;
#[derive(Serialize, Deserialize)] // for Debug, PartialEq, Hash, see ast_util
pub enum TypX {
    Bool,
    Int,
    BitVec(u32),
    Var(TypVar),
    Ctor(TypCtor, Typs),
    Map(MapTyp),
}

pub type Var = Arc<VarX>;
pub type Vars = Arc<Vec<Var>>;
#[derive(Clone, Serialize, Deserialize)] // for Debug, PartialEq, Hash, see ast_util
pub struct VarX {
    pub name: Ident,
    pub typ: Typ,
    pub uid: Uid,
}

/// A function symbol, possibly polymorphic.
pub type Fun = Arc<FunX>;
#[derive(Clone, Serialize, Deserialize)] // for Debug, PartialEq, Hash, see ast_util
pub struct FunX {
    pub name: Ident,
    pub typ_params: TypVars,
    pub params: Typs,
    pub ret: Typ,
    pub uid: Uid,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)] // for Debug, see ast_util
pub enum Constant {
    Bool(bool),
    Int(BigInt),
    BitVec(BigInt, u32),
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BvOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    ULt,
    ULe,
    UGt,
    UGe,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Op {
    Not,
    Eq,
    Neq,
    And,
    Or,
    Implies,
    Distinct(usize),
    // Label(positive, name)
    Label(bool, Ident),
    IfThenElse,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    // partial order on the universal sort
    Subtype,
    BvNot,
    Bv(BvOp),
    // bits [start, end) of the argument
    BvExtract(u32, u32),
    BvConcat,
    // arity counts the map argument; typ_arity is the number of bound type parameters of the map
    Select { arity: usize, typ_arity: usize },
    Store { arity: usize, typ_arity: usize },
    Fun(Fun),
}

pub type Binder<A> = Arc<BinderX<A>>;
pub type Binders<A> = Arc<Vec<Binder<A>>>;
#[derive(Clone, Serialize, Deserialize)] // for Debug, see ast_util
pub struct BinderX<A: Clone> {
    pub var: Var,
    pub a: A,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Quant {
    Forall,
    Exists,
}

pub type Trigger = Arc<TriggerX>;
pub type Triggers = Arc<Vec<Trigger>>;
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)] // for Debug, see ast_util
pub struct TriggerX {
    // negative triggers (no-patterns) have pos == false
    pub pos: bool,
    pub exprs: Exprs,
}

pub type Qid = Option<Ident>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct QuantInfo {
    pub qid: Qid,
    pub weight: u32,
    pub attributes: Arc<Vec<(Ident, Ident)>>,
}

pub type Bind = Arc<BindX>;
#[derive(Clone, Serialize, Deserialize)] // for Debug, see ast_util
pub enum BindX {
    // all bound variables are in scope in all right-hand sides and in the body
    Let(Binders<Expr>),
    Quant(Quant, TypVars, Vars, Triggers, QuantInfo),
}

pub type Expr = Arc<ExprX>;
pub type Exprs = Arc<Vec<Expr>>;
#[derive(Serialize, Deserialize)] // for Debug, PartialEq, Hash, Drop, see ast_util
pub enum ExprX {
    Const(Constant),
    Var(Var),
    // typ caches the result type inferred when the node was built
    Apply { op: Op, args: Exprs, typ_args: Typs, typ: Typ },
    Bind(Bind, Expr),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}
