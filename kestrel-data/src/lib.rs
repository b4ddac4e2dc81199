// kestrel-data - Data types for the Kestrel runtime
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # kestrel-data
//!
//! The value layer of the Kestrel runtime: interned symbols and keywords,
//! persistent collections, the sequence abstraction and var cells.
//!
//! Everything here is immutable or internally synchronised, so a [`Value`]
//! can be shared across threads and transformed independently by each
//! holder.

pub mod array_map;
pub mod coll;
pub mod error;
pub mod hash_map;
mod intern;
pub mod keyword;
pub mod lazy;
pub mod list;
pub mod map;
pub mod print;
pub mod reduce;
pub mod rt;
pub mod seq;
pub mod symbol;
pub mod value;
pub mod var;
pub mod vector;

pub use array_map::{ArrayMap, HASHTABLE_THRESHOLD};
pub use coll::{Associative, Counted, Seqable, Stack};
pub use error::{Error, Result};
pub use hash_map::HashMap;
pub use keyword::Keyword;
pub use lazy::LazySeq;
pub use list::List;
pub use map::{PersistentMap, make_map};
pub use print::{RenderOptions, print_string, render};
pub use reduce::{is_reduced, reduce, reduce_first, reduced, unreduced};
pub use seq::{
    Cons, Seq, SeqIter, cons, first, fourth, keys, lazy, length, list, list_star, more, next,
    second, seq, seq_iter, seq_to_array, seq_to_passed_array, third, vals,
};
pub use symbol::Symbol;
pub use value::{Opaque, Value};
pub use var::Var;
pub use vector::{SubVector, Vector};
