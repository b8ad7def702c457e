#[macro_use]
mod macros;

pub mod codepage;
pub mod column;
pub mod database;
pub mod error;
pub mod expr;
pub mod idt;
pub mod merge;
pub mod propset;
pub mod query;
pub mod record;
pub mod storage;
pub mod streamname;
pub mod stringtable;
pub mod summary;
pub mod table;
pub mod time;
pub mod value;
pub mod view;
