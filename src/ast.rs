//! 过滤表达式语言的抽象语法树
//!
//! 树由外部解析器一次性构建，之后只读。唯一的例外是集合表达式的选择器，
//! 它可以通过 [`RewritableSelector`] 在原地改写。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 表达式树的节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// 一元运算 (NOT)
    Unary(UnaryExpression),
    /// 二元逻辑运算 (AND / OR)
    Binary(BinaryExpression),
    /// 字段匹配，这是表达式树的叶子节点
    Match(MatchExpression),
    /// 对集合元素的量化 (any / all)
    Collection(CollectionExpression),
}

impl Expression {
    pub fn not(operand: Expression) -> Self {
        Expression::Unary(UnaryExpression::new(UnaryOperator::Not, operand))
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::Binary(BinaryExpression::new(left, BinaryOperator::And, right))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Binary(BinaryExpression::new(left, BinaryOperator::Or, right))
    }

    /// 带字面量的匹配，例如 `status == "active"`
    pub fn matches(selector: Selector, operator: MatchOperator, raw: impl Into<String>) -> Self {
        Expression::Match(MatchExpression::new(
            selector,
            operator,
            Some(MatchValue::new(raw)),
        ))
    }

    /// 不带字面量的匹配，例如 `tags is empty`
    pub fn match_empty(selector: Selector, operator: MatchOperator) -> Self {
        Expression::Match(MatchExpression::new(selector, operator, None))
    }

    pub fn any(selector: Selector, binding: CollectionNameBinding, inner: Expression) -> Self {
        Expression::Collection(CollectionExpression::new(
            CollectionOperator::Any,
            selector,
            binding,
            inner,
        ))
    }

    pub fn all(selector: Selector, binding: CollectionNameBinding, inner: Expression) -> Self {
        Expression::Collection(CollectionExpression::new(
            CollectionOperator::All,
            selector,
            binding,
            inner,
        ))
    }

    /// 按先序遍历访问树中的每个集合表达式（左子树先于右子树），
    /// 只交出改写选择器的能力
    pub fn collections_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut dyn RewritableSelector),
    {
        match self {
            Expression::Unary(expr) => expr.operand.collections_mut(f),
            Expression::Binary(expr) => {
                expr.left.collections_mut(f);
                expr.right.collections_mut(f);
            }
            Expression::Match(_) => {}
            Expression::Collection(expr) => {
                f(&mut *expr);
                expr.expression.collections_mut(f);
            }
        }
    }
}

/// 只有集合表达式提供的能力：构建之后改写选择器
pub trait RewritableSelector {
    fn selector(&self) -> &Selector;
    fn set_selector(&mut self, selector: Selector);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    operator: UnaryOperator,
    operand: Box<Expression>,
}

impl UnaryExpression {
    pub fn new(operator: UnaryOperator, operand: Expression) -> Self {
        Self {
            operator,
            operand: Box::new(operand),
        }
    }

    pub fn operator(&self) -> UnaryOperator {
        self.operator
    }

    pub fn operand(&self) -> &Expression {
        &self.operand
    }
}

/// 二元表达式，左右子树的顺序与源文本一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    left: Box<Expression>,
    operator: BinaryOperator,
    right: Box<Expression>,
}

impl BinaryExpression {
    pub fn new(left: Expression, operator: BinaryOperator, right: Expression) -> Self {
        Self {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn operator(&self) -> BinaryOperator {
        self.operator
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }
}

/// 字段匹配
///
/// `value` 对于 `IsEmpty` / `IsNotEmpty` 为 `None`，其余运算符都需要一个字面量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExpression {
    selector: Selector,
    operator: MatchOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<MatchValue>,
}

impl MatchExpression {
    pub fn new(selector: Selector, operator: MatchOperator, value: Option<MatchValue>) -> Self {
        Self {
            selector,
            operator,
            value,
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn operator(&self) -> MatchOperator {
        self.operator
    }

    pub fn value(&self) -> Option<&MatchValue> {
        self.value.as_ref()
    }
}

/// 集合量化表达式
///
/// 内部表达式由外部求值器对每个元素求值一次，元素的下标/值按 `name_binding` 声明的名字绑定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionExpression {
    operator: CollectionOperator,
    selector: Selector,
    name_binding: CollectionNameBinding,
    expression: Box<Expression>,
}

impl CollectionExpression {
    pub fn new(
        operator: CollectionOperator,
        selector: Selector,
        name_binding: CollectionNameBinding,
        expression: Expression,
    ) -> Self {
        Self {
            operator,
            selector,
            name_binding,
            expression: Box::new(expression),
        }
    }

    pub fn operator(&self) -> CollectionOperator {
        self.operator
    }

    pub fn name_binding(&self) -> &CollectionNameBinding {
        &self.name_binding
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl RewritableSelector for CollectionExpression {
    fn selector(&self) -> &Selector {
        &self.selector
    }

    fn set_selector(&mut self, selector: Selector) {
        log::debug!("rewriting collection selector {} -> {}", self.selector, selector);
        self.selector = selector;
    }
}

/// 匹配字面量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchValue {
    /// 源文本中的原始字面量
    pub raw: String,
    /// 由外部转换步骤填充的类型化值，只用于求值，打印时从不读取
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted: Option<serde_json::Value>,
}

impl MatchValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            converted: None,
        }
    }

    pub fn with_converted(mut self, converted: serde_json::Value) -> Self {
        self.converted = Some(converted);
        self
    }
}

/// 定义一组以整数编码序列化的运算符枚举。
///
/// 超出声明范围的编码会落到 `Unknown`，显示为 `UNKNOWN`。
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $code:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "u32", into = "u32")]
        pub enum $name {
            $($variant,)+
            Unknown(u32),
        }

        impl $name {
            pub fn code(self) -> u32 {
                match self {
                    $($name::$variant => $code,)+
                    $name::Unknown(code) => code,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown(_) => "UNKNOWN",
                }
            }
        }

        impl From<u32> for $name {
            fn from(code: u32) -> Self {
                match code {
                    $($code => $name::$variant,)+
                    other => $name::Unknown(other),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.code()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

coded_enum! {
    /// 一元运算符
    pub enum UnaryOperator {
        Not = 0 => "Not",
    }
}

coded_enum! {
    /// 二元逻辑运算符
    pub enum BinaryOperator {
        And = 0 => "And",
        Or = 1 => "Or",
    }
}

coded_enum! {
    /// 匹配运算符
    pub enum MatchOperator {
        Equal = 0 => "Equal",
        NotEqual = 1 => "Not Equal",
        In = 2 => "In",
        NotIn = 3 => "Not In",
        IsEmpty = 4 => "Is Empty",
        IsNotEmpty = 5 => "Is Not Empty",
        Matches = 6 => "Matches",
        NotMatches = 7 => "Not Matches",
        GreaterOrEqualThan = 8 => "Greater or Equal Than",
        GreaterThan = 9 => "Greater Than",
        LesserOrEqualThan = 10 => "Lesser or Equal Than",
        LesserThan = 11 => "Lesser Than",
    }
}

impl MatchOperator {
    /// 该运算符是否与字面量比较
    pub fn takes_value(self) -> bool {
        !matches!(
            self,
            MatchOperator::IsEmpty | MatchOperator::IsNotEmpty | MatchOperator::Unknown(_)
        )
    }
}

coded_enum! {
    /// 集合量化运算符，标签为小写
    pub enum CollectionOperator {
        Any = 0 => "any",
        All = 1 => "all",
    }
}

coded_enum! {
    /// 集合迭代时绑定哪些名字
    pub enum CollectionBindMode {
        Default = 0 => "Default",
        Index = 1 => "Index",
        Value = 2 => "Value",
        IndexAndValue = 3 => "Index & Value",
    }
}

/// 集合表达式的名字绑定
///
/// 每种 `mode` 只读取对应的字段，其余字段被忽略。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNameBinding {
    pub mode: CollectionBindMode,
    pub default: String,
    pub index: String,
    pub value: String,
}

impl Default for CollectionBindMode {
    fn default() -> Self {
        CollectionBindMode::Default
    }
}

impl CollectionNameBinding {
    pub fn default_name(name: impl Into<String>) -> Self {
        Self {
            mode: CollectionBindMode::Default,
            default: name.into(),
            ..Self::default()
        }
    }

    pub fn index(name: impl Into<String>) -> Self {
        Self {
            mode: CollectionBindMode::Index,
            index: name.into(),
            ..Self::default()
        }
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self {
            mode: CollectionBindMode::Value,
            value: name.into(),
            ..Self::default()
        }
    }

    pub fn index_and_value(index: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            mode: CollectionBindMode::IndexAndValue,
            index: index.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for CollectionNameBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            CollectionBindMode::Default => write!(f, "Default ( {} )", self.default),
            CollectionBindMode::Index => write!(f, "Index ( {} )", self.index),
            CollectionBindMode::Value => write!(f, "Value ( {} )", self.value),
            CollectionBindMode::IndexAndValue => {
                write!(f, "Index & Value ( {}, {} )", self.index, self.value)
            }
            CollectionBindMode::Unknown(_) => f.write_str("UNKNOWN"),
        }
    }
}

/// 选择器的路径语法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum SelectorType {
    #[default]
    Unknown,
    /// 点分隔，例如 `a.b.c`
    Bexpr,
    /// 斜杠分隔，例如 `a/b/c`
    JsonPointer,
}

impl From<u32> for SelectorType {
    fn from(code: u32) -> Self {
        match code {
            1 => SelectorType::Bexpr,
            2 => SelectorType::JsonPointer,
            _ => SelectorType::Unknown,
        }
    }
}

impl From<SelectorType> for u32 {
    fn from(value: SelectorType) -> u32 {
        match value {
            SelectorType::Unknown => 0,
            SelectorType::Bexpr => 1,
            SelectorType::JsonPointer => 2,
        }
    }
}

/// 结构化数据中的一个位置，路径片段按遍历顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "type")]
    pub selector_type: SelectorType,
    pub path: Vec<String>,
}

impl Selector {
    pub fn new<I, S>(selector_type: SelectorType, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selector_type,
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn bexpr<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SelectorType::Bexpr, path)
    }

    pub fn json_pointer<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SelectorType::JsonPointer, path)
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return Ok(());
        }
        match self.selector_type {
            SelectorType::Bexpr => f.write_str(&self.path.join(".")),
            SelectorType::JsonPointer => f.write_str(&self.path.join("/")),
            SelectorType::Unknown => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_rendering() {
        assert_eq!(Selector::bexpr(["a", "b"]).to_string(), "a.b");
        assert_eq!(Selector::json_pointer(["a", "b"]).to_string(), "a/b");
        assert_eq!(Selector::new(SelectorType::Unknown, ["a", "b"]).to_string(), "");
        assert_eq!(Selector::bexpr(Vec::<String>::new()).to_string(), "");
        assert_eq!(Selector::json_pointer(Vec::<String>::new()).to_string(), "");
    }

    #[test]
    fn test_selector_keeps_segment_order() {
        let selector = Selector::bexpr(["z", "a", "m"]);
        assert_eq!(selector.to_string(), "z.a.m");
    }

    #[test]
    fn test_operator_labels() {
        assert_eq!(UnaryOperator::Not.to_string(), "Not");
        assert_eq!(BinaryOperator::And.to_string(), "And");
        assert_eq!(BinaryOperator::Or.to_string(), "Or");
        assert_eq!(MatchOperator::NotEqual.to_string(), "Not Equal");
        assert_eq!(MatchOperator::IsNotEmpty.to_string(), "Is Not Empty");
        assert_eq!(MatchOperator::GreaterOrEqualThan.to_string(), "Greater or Equal Than");
        assert_eq!(MatchOperator::LesserOrEqualThan.to_string(), "Lesser or Equal Than");
        assert_eq!(MatchOperator::LesserThan.to_string(), "Lesser Than");
        assert_eq!(CollectionOperator::Any.to_string(), "any");
        assert_eq!(CollectionOperator::All.to_string(), "all");
    }

    #[test]
    fn test_out_of_range_codes_render_unknown() {
        assert_eq!(MatchOperator::from(12).to_string(), "UNKNOWN");
        assert_eq!(MatchOperator::from(u32::MAX).to_string(), "UNKNOWN");
        assert_eq!(UnaryOperator::from(1).to_string(), "UNKNOWN");
        assert_eq!(BinaryOperator::from(7).to_string(), "UNKNOWN");
        assert_eq!(CollectionOperator::from(2).to_string(), "UNKNOWN");
        assert_eq!(MatchOperator::from(9), MatchOperator::GreaterThan);
        assert_eq!(MatchOperator::from(42).code(), 42);
    }

    #[test]
    fn test_takes_value() {
        assert!(MatchOperator::Equal.takes_value());
        assert!(MatchOperator::NotMatches.takes_value());
        assert!(MatchOperator::LesserThan.takes_value());
        assert!(!MatchOperator::IsEmpty.takes_value());
        assert!(!MatchOperator::IsNotEmpty.takes_value());
        assert!(!MatchOperator::Unknown(99).takes_value());
    }

    #[test]
    fn test_name_binding_rendering() {
        assert_eq!(CollectionNameBinding::default_name("e").to_string(), "Default ( e )");
        assert_eq!(CollectionNameBinding::index("i").to_string(), "Index ( i )");
        assert_eq!(CollectionNameBinding::value("v").to_string(), "Value ( v )");
        assert_eq!(
            CollectionNameBinding::index_and_value("i", "v").to_string(),
            "Index & Value ( i, v )"
        );

        let unknown = CollectionNameBinding {
            mode: CollectionBindMode::from(9),
            ..CollectionNameBinding::default()
        };
        assert_eq!(unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_name_binding_ignores_unused_fields() {
        let binding = CollectionNameBinding {
            mode: CollectionBindMode::Index,
            default: "d".to_string(),
            index: "i".to_string(),
            value: "v".to_string(),
        };
        assert_eq!(binding.to_string(), "Index ( i )");
    }

    #[test]
    fn test_collections_mut_rewrites_in_place() {
        let mut expr = Expression::and(
            Expression::any(
                Selector::bexpr(["items"]),
                CollectionNameBinding::value("v"),
                Expression::all(
                    Selector::bexpr(["v", "tags"]),
                    CollectionNameBinding::default_name("t"),
                    Expression::matches(Selector::bexpr(["t"]), MatchOperator::Equal, "x"),
                ),
            ),
            Expression::not(Expression::match_empty(
                Selector::bexpr(["name"]),
                MatchOperator::IsEmpty,
            )),
        );

        let mut seen = Vec::new();
        expr.collections_mut(&mut |node: &mut dyn RewritableSelector| {
            seen.push(node.selector().to_string());
            let path = node.selector().path.clone();
            node.set_selector(Selector::json_pointer(path));
        });
        assert_eq!(seen, vec!["items", "v.tags"]);

        let Expression::Binary(binary) = &expr else {
            panic!("Expected binary expression");
        };
        let Expression::Collection(outer) = binary.left() else {
            panic!("Expected collection on the left");
        };
        assert_eq!(outer.selector().to_string(), "items");
        assert_eq!(outer.selector().selector_type, SelectorType::JsonPointer);
        let Expression::Collection(inner) = outer.expression() else {
            panic!("Expected nested collection");
        };
        assert_eq!(inner.selector().to_string(), "v/tags");
    }

    #[test]
    fn test_json_uses_integer_codes() {
        let expr = Expression::matches(Selector::bexpr(["status"]), MatchOperator::In, "[1, 2]");
        let encoded = serde_json::to_value(&expr).unwrap();
        assert_eq!(
            encoded,
            json!({
                "Match": {
                    "selector": { "type": 1, "path": ["status"] },
                    "operator": 2,
                    "value": { "raw": "[1, 2]" }
                }
            })
        );
    }

    #[test]
    fn test_json_unknown_codes_survive_decoding() {
        let decoded: Expression = serde_json::from_value(json!({
            "Collection": {
                "operator": 5,
                "selector": { "type": 7, "path": ["items"] },
                "name_binding": { "mode": 3, "index": "i", "value": "v" },
                "expression": {
                    "Match": {
                        "selector": { "type": 1, "path": ["v"] },
                        "operator": 30
                    }
                }
            }
        }))
        .unwrap();

        let Expression::Collection(collection) = &decoded else {
            panic!("Expected collection expression");
        };
        assert_eq!(collection.operator(), CollectionOperator::Unknown(5));
        assert_eq!(collection.selector().selector_type, SelectorType::Unknown);
        assert_eq!(collection.name_binding().to_string(), "Index & Value ( i, v )");
        let Expression::Match(inner) = collection.expression() else {
            panic!("Expected match expression");
        };
        assert_eq!(inner.operator(), MatchOperator::Unknown(30));
        assert!(inner.value().is_none());
    }

    #[test]
    fn test_converted_value_is_carried() {
        let value = MatchValue::new("42").with_converted(json!(42));
        let expr = Expression::Match(MatchExpression::new(
            Selector::bexpr(["count"]),
            MatchOperator::GreaterThan,
            Some(value),
        ));
        let decoded: Expression =
            serde_json::from_str(&serde_json::to_string(&expr).unwrap()).unwrap();
        assert_eq!(decoded, expr);
    }
}
