#[macro_use]
pub mod printer;

pub mod ast;
pub mod ast_util;
pub mod axioms;
pub mod context;
pub mod erase;
pub mod generator;
pub mod map_abstraction;
pub mod premises;
pub mod typecheck;
pub mod visitor;

mod emitter;
mod scope_map;
mod tests;
mod util;
