//! 过滤表达式语言的抽象语法树及其结构化打印
//!
//! 解析器、求值器以及字面量的类型转换不在本库中，它们只通过 [`ast`] 中的节点与本库交互。

pub mod ast;
pub mod config;
pub mod dump;
pub mod error;

pub use ast::{
    BinaryExpression, BinaryOperator, CollectionBindMode, CollectionExpression,
    CollectionNameBinding, CollectionOperator, Expression, MatchExpression, MatchOperator,
    MatchValue, RewritableSelector, Selector, SelectorType, UnaryExpression, UnaryOperator,
};
pub use config::DumpConfig;
pub use dump::{dump, dump_to_string, ExpressionDump};
pub use error::{ConfigError, DumpError};
