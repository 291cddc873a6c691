//! Filter expression tree for `$filter` and `$orderby`.
//!
//! The transport layer parses the textual syntax; this module only holds
//! the parsed tree and a builder API for constructing it in code.

use chrono::{DateTime, Utc};

use crate::model::{EntityProperty, NavigationProperty, TimeInterval};

/// A property reached from the filtered entity, possibly across relations.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPath {
    pub navigation: Vec<NavigationProperty>,
    pub property: EntityProperty,
    /// Keys below the property: JSON keys, or a unit sub-field.
    pub sub_path: Vec<String>,
}

impl PropertyPath {
    pub fn new(property: EntityProperty) -> Self {
        Self {
            navigation: vec![],
            property,
            sub_path: vec![],
        }
    }

    /// Prefix a navigation hop.
    pub fn through(mut self, navigation: NavigationProperty) -> Self {
        self.navigation.insert(0, navigation);
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.sub_path.push(key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Text(String),
    Instant(DateTime<Utc>),
    Interval(TimeInterval),
    Duration(chrono::Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFunction {
    Before,
    After,
    Meets,
    During,
    Overlaps,
    Starts,
    Finishes,
    StartsWith,
    EndsWith,
    SubstringOf,
    Length,
    ToLower,
    ToUpper,
    Round,
}

impl FilterFunction {
    pub fn name(&self) -> &'static str {
        match self {
            FilterFunction::Before => "before",
            FilterFunction::After => "after",
            FilterFunction::Meets => "meets",
            FilterFunction::During => "during",
            FilterFunction::Overlaps => "overlaps",
            FilterFunction::Starts => "starts",
            FilterFunction::Finishes => "finishes",
            FilterFunction::StartsWith => "startswith",
            FilterFunction::EndsWith => "endswith",
            FilterFunction::SubstringOf => "substringof",
            FilterFunction::Length => "length",
            FilterFunction::ToLower => "tolower",
            FilterFunction::ToUpper => "toupper",
            FilterFunction::Round => "round",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            FilterFunction::Length
            | FilterFunction::ToLower
            | FilterFunction::ToUpper
            | FilterFunction::Round => 1,
            _ => 2,
        }
    }
}

/// A filter or ordering expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Property(PropertyPath),
    Constant(Constant),
    Compare {
        op: CompareOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    Arith {
        op: ArithOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Function {
        function: FilterFunction,
        args: Vec<FilterExpr>,
    },
}

/// Shorthand for a property of the filtered entity.
pub fn prop(property: EntityProperty) -> FilterExpr {
    FilterExpr::Property(PropertyPath::new(property))
}

/// Shorthand for a function call.
pub fn call(function: FilterFunction, args: Vec<FilterExpr>) -> FilterExpr {
    FilterExpr::Function { function, args }
}

impl FilterExpr {
    fn compare(self, op: CompareOp, other: impl Into<FilterExpr>) -> FilterExpr {
        FilterExpr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    fn arith(self, op: ArithOp, other: impl Into<FilterExpr>) -> FilterExpr {
        FilterExpr::Arith {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.compare(CompareOp::Eq, other)
    }

    pub fn ne(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.compare(CompareOp::Ne, other)
    }

    pub fn lt(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.compare(CompareOp::Lt, other)
    }

    pub fn le(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.compare(CompareOp::Le, other)
    }

    pub fn gt(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.compare(CompareOp::Gt, other)
    }

    pub fn ge(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.compare(CompareOp::Ge, other)
    }

    pub fn add(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.arith(ArithOp::Add, other)
    }

    pub fn sub(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.arith(ArithOp::Sub, other)
    }

    pub fn mul(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.arith(ArithOp::Mul, other)
    }

    pub fn div(self, other: impl Into<FilterExpr>) -> FilterExpr {
        self.arith(ArithOp::Div, other)
    }

    pub fn and(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> FilterExpr {
        FilterExpr::Not(Box::new(self))
    }
}

impl From<PropertyPath> for FilterExpr {
    fn from(path: PropertyPath) -> Self {
        FilterExpr::Property(path)
    }
}

impl From<Constant> for FilterExpr {
    fn from(c: Constant) -> Self {
        FilterExpr::Constant(c)
    }
}

impl From<i64> for FilterExpr {
    fn from(n: i64) -> Self {
        FilterExpr::Constant(Constant::Integer(n))
    }
}

impl From<f64> for FilterExpr {
    fn from(n: f64) -> Self {
        FilterExpr::Constant(Constant::Double(n))
    }
}

impl From<bool> for FilterExpr {
    fn from(b: bool) -> Self {
        FilterExpr::Constant(Constant::Bool(b))
    }
}

impl From<&str> for FilterExpr {
    fn from(s: &str) -> Self {
        FilterExpr::Constant(Constant::Text(s.into()))
    }
}

impl From<DateTime<Utc>> for FilterExpr {
    fn from(t: DateTime<Utc>) -> Self {
        FilterExpr::Constant(Constant::Instant(t))
    }
}

impl From<TimeInterval> for FilterExpr {
    fn from(i: TimeInterval) -> Self {
        FilterExpr::Constant(Constant::Interval(i))
    }
}

impl From<chrono::Duration> for FilterExpr {
    fn from(d: chrono::Duration) -> Self {
        FilterExpr::Constant(Constant::Duration(d))
    }
}
