//! Stateful assembler that turns a stream of parser callbacks into a
//! single expression AST.
//!
//! A driver (lexer/parser pair) owns one [`Eab`] and feeds it leaf
//! pushes (`push_sym`, `push_literal`, ...), operator pushes
//! (`push_unary_op`, `push_binary_op`), and grouping brackets
//! (`enter_tree`/`collect_arg`/`leave_tree`) in the order tokens appear
//! in the source. The builder resolves precedence, unary chaining and
//! object-call/subscript absorption as it goes, so by the time the
//! driver has fed it the last token of an expression, [`Eab::root`]
//! names the finished tree. Call [`Eab::reset`] to recycle the builder's
//! internal node pool for the next expression -- it rewinds a cursor,
//! it never deallocates.
//!
//! The builder never parses and never validates a malformed call
//! sequence; see the crate's design notes for the full list of
//! driver-owned invariants. The only failure this crate reports is
//! memory exhaustion while growing the node pool or the save stack
//! ([`EabError::OutOfMemory`]).
//!
//! # Example
//!
//! ```
//! use expr_ast_builder::{BinaryOp, Eab, EabConfig, LineCounter, SymbolTable};
//!
//! let mut symbols = SymbolTable::new();
//! let a = symbols.intern("a");
//! let b = symbols.intern("b");
//!
//! let mut eab = Eab::new(EabConfig::default(), LineCounter::new(1));
//! eab.push_sym(a).unwrap();
//! eab.push_binary_op(BinaryOp::Add).unwrap();
//! eab.push_sym(b).unwrap();
//!
//! assert!(eab.root().is_some());
//! ```

mod builder;
mod error;
mod line;
mod node;
mod pool;
mod precedence;
mod symbols;

pub use crate::builder::{Eab, EabConfig};
pub use crate::error::{EabError, Result};
pub use crate::line::{LineCounter, LineSource};
pub use crate::node::{GroupKind, Node, NodeId, NodeKind};
pub use crate::precedence::{priority_for_binary_op, priority_for_unary_op, BinaryOp, Priority, UnaryOp};
pub use crate::symbols::{Literal, LiteralId, LiteralTable, SymbolId, SymbolTable, TypeId, TypeTable};
