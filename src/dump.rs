//! 表达式树的结构化打印
//!
//! 每个节点输出为一个带花括号的块，子节点按嵌套深度缩进：
//!
//! ```text
//! And {
//!   Equal {
//!     Selector: status
//!     Value: "active"
//!   }
//!   Is Empty {
//!     Selector: tags
//!   }
//! }
//! ```
//!
//! 集合表达式的内部表达式比集合节点深两层，而不是一层。

use crate::ast::{
    BinaryExpression, CollectionExpression, Expression, MatchExpression, RewritableSelector,
    UnaryExpression,
};
use crate::error::DumpError;
use std::fmt::Write as _;
use std::io;

/// 所有节点共有的能力：把自身及子树写入缓冲区
pub trait ExpressionDump {
    fn dump_into(&self, out: &mut String, indent: &str, level: usize) -> Result<(), DumpError>;
}

/// 将整棵树输出到 `w`
///
/// 先在内存中完成渲染，失败时 `w` 不会收到任何内容。
pub fn dump<W: io::Write>(
    expr: &Expression,
    w: &mut W,
    indent: &str,
    level: usize,
) -> Result<(), DumpError> {
    let rendered = dump_to_string(expr, indent, level)?;
    w.write_all(rendered.as_bytes())?;
    Ok(())
}

pub fn dump_to_string(expr: &Expression, indent: &str, level: usize) -> Result<String, DumpError> {
    let mut out = String::new();
    expr.dump_into(&mut out, indent, level)?;
    log::trace!("dumped expression tree into {} bytes", out.len());
    Ok(out)
}

impl Expression {
    pub fn dump<W: io::Write>(&self, w: &mut W, indent: &str, level: usize) -> Result<(), DumpError> {
        dump(self, w, indent, level)
    }

    pub fn dump_to_string(&self, indent: &str, level: usize) -> Result<String, DumpError> {
        dump_to_string(self, indent, level)
    }
}

impl ExpressionDump for Expression {
    fn dump_into(&self, out: &mut String, indent: &str, level: usize) -> Result<(), DumpError> {
        match self {
            Expression::Unary(expr) => expr.dump_into(out, indent, level),
            Expression::Binary(expr) => expr.dump_into(out, indent, level),
            Expression::Match(expr) => expr.dump_into(out, indent, level),
            Expression::Collection(expr) => expr.dump_into(out, indent, level),
        }
    }
}

impl ExpressionDump for UnaryExpression {
    fn dump_into(&self, out: &mut String, indent: &str, level: usize) -> Result<(), DumpError> {
        let local_indent = indent.repeat(level);
        writeln!(out, "{}{} {{", local_indent, self.operator())?;
        self.operand().dump_into(out, indent, level + 1)?;
        writeln!(out, "{}}}", local_indent)?;
        Ok(())
    }
}

impl ExpressionDump for BinaryExpression {
    fn dump_into(&self, out: &mut String, indent: &str, level: usize) -> Result<(), DumpError> {
        let local_indent = indent.repeat(level);
        writeln!(out, "{}{} {{", local_indent, self.operator())?;
        self.left().dump_into(out, indent, level + 1)?;
        self.right().dump_into(out, indent, level + 1)?;
        writeln!(out, "{}}}", local_indent)?;
        Ok(())
    }
}

impl ExpressionDump for MatchExpression {
    fn dump_into(&self, out: &mut String, indent: &str, level: usize) -> Result<(), DumpError> {
        let local_indent = indent.repeat(level);
        let body_indent = indent.repeat(level + 1);
        let operator = self.operator();

        // 先确认字面量存在，避免写出半个块
        let value = if operator.takes_value() {
            match self.value() {
                Some(value) => Some(value),
                None => {
                    return Err(DumpError::MissingValue {
                        selector: self.selector().to_string(),
                        operator,
                    })
                }
            }
        } else {
            None
        };

        writeln!(out, "{}{} {{", local_indent, operator)?;
        writeln!(out, "{}Selector: {}", body_indent, self.selector())?;
        if let Some(value) = value {
            writeln!(out, "{}Value: {}", body_indent, quote(&value.raw))?;
        }
        writeln!(out, "{}}}", local_indent)?;
        Ok(())
    }
}

impl ExpressionDump for CollectionExpression {
    fn dump_into(&self, out: &mut String, indent: &str, level: usize) -> Result<(), DumpError> {
        let local_indent = indent.repeat(level);
        writeln!(out, "{}{} {{", local_indent, self.operator())?;
        writeln!(out, "{}{}Selector: {}", indent, local_indent, self.selector())?;
        writeln!(out, "{}{}NameBinding: {}", indent, local_indent, self.name_binding())?;
        self.expression().dump_into(out, indent, level + 2)?;
        writeln!(out, "{}}}", local_indent)?;
        Ok(())
    }
}

/// 把原始字面量渲染为带双引号的转义字符串
fn quote(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\x07' => quoted.push_str("\\a"),
            '\x08' => quoted.push_str("\\b"),
            '\x0c' => quoted.push_str("\\f"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\x0b' => quoted.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                let _ = write!(quoted, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(quoted, "\\u{:04x}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
