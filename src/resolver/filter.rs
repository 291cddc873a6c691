//! Translation of filter trees into SQL predicates.
//!
//! Every operand is first lowered to an [`Operand`] that remembers what kind
//! of value it is. Comparisons then pick SQL by the kinds on both sides:
//!
//! ```text
//! instant  vs instant   plain comparison
//! interval vs instant   interval algebra, the instant read as [t, t]
//! result   vs literal   the result slot matching the literal's type
//! x        eq null      x IS NULL
//! ```

use crate::error::{StoreError, StoreResult};
use crate::fields::{DirectKind, FieldMapping, FieldRegistry};
use crate::model::{format_timestamp, parse_timestamp};
use crate::query::{ArithOp, CompareOp, Constant, FilterExpr, FilterFunction, PropertyPath};
use crate::sql::{func, lit_bool, lit_float, lit_int, lit_str, Expr, ExprExt, Literal};

use super::context::{EntityTable, ResolverContext};

const LIKE_ESCAPE: char = '\\';

/// A lowered operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Expr),
    Bool(Expr),
    Instant(Expr),
    Interval {
        start: Expr,
        end: Expr,
    },
    Duration(i64),
    /// The typed slots of an observation result.
    Result {
        kind: Expr,
        number: Expr,
        boolean: Expr,
        string: Expr,
    },
    Null,
}

/// Start and end of a temporal operand.
struct Span {
    start: Expr,
    end: Expr,
    instant: bool,
}

pub struct FilterTranslator<'c, 'r> {
    ctx: &'c mut ResolverContext<'r>,
    fields: &'r FieldRegistry,
    root: EntityTable,
}

impl<'c, 'r> FilterTranslator<'c, 'r> {
    pub fn new(ctx: &'c mut ResolverContext<'r>, fields: &'r FieldRegistry, root: EntityTable) -> Self {
        Self { ctx, fields, root }
    }

    /// Translate a boolean filter.
    pub fn predicate(&mut self, expr: &FilterExpr) -> StoreResult<Expr> {
        let operand = self.operand(expr)?;
        boolean(operand)
    }

    /// Translate an ordering expression into sort keys.
    pub fn order_keys(&mut self, expr: &FilterExpr) -> StoreResult<Vec<Expr>> {
        Ok(match self.operand(expr)? {
            Operand::Value(e) | Operand::Bool(e) | Operand::Instant(e) => vec![e],
            Operand::Interval { start, end } => vec![start, end],
            Operand::Result { number, string, .. } => vec![number, string],
            Operand::Null | Operand::Duration(_) => {
                return Err(StoreError::IllegalArgument(
                    "cannot order by a constant".into(),
                ))
            }
        })
    }

    fn operand(&mut self, expr: &FilterExpr) -> StoreResult<Operand> {
        match expr {
            FilterExpr::Property(path) => self.property(path),
            FilterExpr::Constant(c) => constant(c),
            FilterExpr::Compare { op, left, right } => {
                let left = self.operand(left)?;
                let right = self.operand(right)?;
                Ok(Operand::Bool(compare(*op, left, right)?))
            }
            FilterExpr::Arith { op, left, right } => {
                let left = self.operand(left)?;
                let right = self.operand(right)?;
                arith(*op, left, right)
            }
            FilterExpr::And(a, b) => {
                let a = self.predicate(a)?;
                Ok(Operand::Bool(a.and(self.predicate(b)?)))
            }
            FilterExpr::Or(a, b) => {
                let a = self.predicate(a)?;
                Ok(Operand::Bool(a.or(self.predicate(b)?)))
            }
            FilterExpr::Not(inner) => Ok(Operand::Bool(self.predicate(inner)?.not())),
            FilterExpr::Function { function, args } => {
                if args.len() != function.arity() {
                    return Err(StoreError::IllegalArgument(format!(
                        "{} takes {} argument(s), got {}",
                        function.name(),
                        function.arity(),
                        args.len()
                    )));
                }
                let mut operands = Vec::with_capacity(args.len());
                for arg in args {
                    operands.push(self.operand(arg)?);
                }
                function_call(*function, operands)
            }
        }
    }

    fn property(&mut self, path: &PropertyPath) -> StoreResult<Operand> {
        let table = if path.navigation.is_empty() {
            self.root.clone()
        } else {
            self.ctx.navigate(&self.root, &path.navigation)?
        };
        let mapping = self.fields.mapping(table.entity_type, path.property)?;
        let col = |name: &str| table.col(name);
        let nested = |base: Expr| -> Operand {
            if path.sub_path.is_empty() {
                Operand::Value(base)
            } else {
                Operand::Value(Expr::JsonPath {
                    expr: Box::new(base),
                    path: path.sub_path.clone(),
                })
            }
        };
        let no_sub_path = || -> StoreResult<()> {
            if path.sub_path.is_empty() {
                Ok(())
            } else {
                Err(StoreError::IllegalArgument(format!(
                    "{} has no sub-properties",
                    path.property.name()
                )))
            }
        };

        Ok(match mapping {
            FieldMapping::Id(c) => {
                no_sub_path()?;
                Operand::Value(col(c.name))
            }
            FieldMapping::Direct { column, kind } => match kind {
                DirectKind::Instant => {
                    no_sub_path()?;
                    Operand::Instant(col(column.name))
                }
                DirectKind::Json => nested(col(column.name)),
                DirectKind::Text => {
                    no_sub_path()?;
                    Operand::Value(col(column.name))
                }
            },
            FieldMapping::JsonMap(c) => nested(col(c.name)),
            FieldMapping::JsonList { column, .. } => nested(col(column.name)),
            FieldMapping::Unit {
                name,
                symbol,
                definition,
            } => match path.sub_path.as_slice() {
                [key] if key == "name" => Operand::Value(col(name.name)),
                [key] if key == "symbol" => Operand::Value(col(symbol.name)),
                [key] if key == "definition" => Operand::Value(col(definition.name)),
                _ => {
                    return Err(StoreError::IllegalArgument(format!(
                        "unitOfMeasurement needs one of name, symbol or definition, got {:?}",
                        path.sub_path
                    )))
                }
            },
            FieldMapping::TimePair { start, end, .. } => {
                no_sub_path()?;
                Operand::Interval {
                    start: col(start.name),
                    end: col(end.name),
                }
            }
            FieldMapping::Result {
                kind,
                number,
                boolean,
                string,
                json,
            } => {
                if path.sub_path.is_empty() {
                    Operand::Result {
                        kind: col(kind.name),
                        number: col(number.name),
                        boolean: col(boolean.name),
                        string: col(string.name),
                    }
                } else {
                    nested(col(json.name))
                }
            }
            FieldMapping::Geometry { source, .. } => nested(col(source.name)),
            FieldMapping::Static(value) => {
                no_sub_path()?;
                match value.as_text() {
                    Some(text) => Operand::Value(lit_str(text)),
                    None => Operand::Null,
                }
            }
            FieldMapping::ForeignKey { .. }
            | FieldMapping::Children { .. }
            | FieldMapping::LinkEdge(_)
            | FieldMapping::OrderedLinkEdge(_) => {
                return Err(StoreError::IllegalArgument(format!(
                    "{} is not filterable",
                    path.property.name()
                )))
            }
        })
    }
}

fn constant(c: &Constant) -> StoreResult<Operand> {
    Ok(match c {
        Constant::Null => Operand::Null,
        Constant::Bool(b) => Operand::Value(lit_bool(*b)),
        Constant::Integer(n) => Operand::Value(lit_int(*n)),
        Constant::Double(f) if !f.is_finite() => {
            return Err(StoreError::IllegalArgument(format!("not a finite number: {}", f)))
        }
        Constant::Double(f) => Operand::Value(lit_float(*f)),
        Constant::Text(s) => Operand::Value(lit_str(s)),
        Constant::Instant(t) => Operand::Instant(lit_str(&format_timestamp(t))),
        Constant::Interval(i) => Operand::Interval {
            start: lit_str(&format_timestamp(&i.start)),
            end: lit_str(&format_timestamp(&i.end)),
        },
        Constant::Duration(d) => Operand::Duration(d.num_milliseconds()),
    })
}

fn boolean(operand: Operand) -> StoreResult<Expr> {
    match operand {
        Operand::Bool(e) | Operand::Value(e) => Ok(e),
        Operand::Result { boolean, .. } => Ok(boolean),
        other => Err(StoreError::IllegalArgument(format!(
            "expression is not boolean: {:?}",
            other
        ))),
    }
}

fn is_temporal(operand: &Operand) -> bool {
    matches!(operand, Operand::Instant(_) | Operand::Interval { .. })
}

/// Text literal parsed as a timestamp, if it is one.
fn literal_instant(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(Literal::String(s)) => parse_timestamp(s).ok().map(|t| format_timestamp(&t)),
        _ => None,
    }
}

fn span(operand: Operand) -> StoreResult<Span> {
    match operand {
        Operand::Instant(e) => Ok(Span {
            start: e.clone(),
            end: e,
            instant: true,
        }),
        Operand::Interval { start, end } => Ok(Span {
            start,
            end,
            instant: false,
        }),
        Operand::Value(e) => {
            let text = literal_instant(&e).ok_or_else(|| {
                StoreError::IllegalArgument(format!("not a time value: {:?}", e))
            })?;
            Ok(Span {
                start: lit_str(&text),
                end: lit_str(&text),
                instant: true,
            })
        }
        other => Err(StoreError::IllegalArgument(format!(
            "not a time value: {:?}",
            other
        ))),
    }
}

fn null_check(op: CompareOp, operand: Operand) -> StoreResult<Expr> {
    let probe = match operand {
        Operand::Value(e) | Operand::Bool(e) | Operand::Instant(e) => e,
        Operand::Interval { start, .. } => start,
        Operand::Result { kind, .. } => kind,
        Operand::Null | Operand::Duration(_) => {
            return Err(StoreError::IllegalArgument(
                "cannot compare null with a constant".into(),
            ))
        }
    };
    match op {
        CompareOp::Eq => Ok(probe.is_null()),
        CompareOp::Ne => Ok(probe.is_not_null()),
        _ => Err(StoreError::IllegalArgument(
            "null only supports eq and ne".into(),
        )),
    }
}

fn plain(op: CompareOp, left: Expr, right: Expr) -> Expr {
    match op {
        CompareOp::Eq => left.eq(right),
        CompareOp::Ne => left.ne(right),
        CompareOp::Lt => left.lt(right),
        CompareOp::Le => left.lte(right),
        CompareOp::Gt => left.gt(right),
        CompareOp::Ge => left.gte(right),
    }
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        other => other,
    }
}

fn before(a: &Span, b: &Span) -> Expr {
    a.end.clone().lte(b.start.clone()).and(a.start.clone().lt(b.start.clone()))
}

fn after(a: &Span, b: &Span) -> Expr {
    a.start.clone().gte(b.end.clone()).and(a.end.clone().gt(b.end.clone()))
}

fn same(a: &Span, b: &Span) -> Expr {
    a.start.clone().eq(b.start.clone()).and(a.end.clone().eq(b.end.clone()))
}

fn temporal_compare(op: CompareOp, a: Span, b: Span) -> Expr {
    if a.instant && b.instant {
        return plain(op, a.start, b.start);
    }
    match op {
        CompareOp::Eq => same(&a, &b),
        CompareOp::Ne => same(&a, &b).not(),
        CompareOp::Lt => before(&a, &b),
        CompareOp::Le => before(&a, &b).or(same(&a, &b)),
        CompareOp::Gt => after(&a, &b),
        CompareOp::Ge => after(&a, &b).or(same(&a, &b)),
    }
}

/// Compare a result against a plain value using the matching slot.
fn result_compare(op: CompareOp, number: Expr, boolean: Expr, string: Expr, value: Expr) -> Expr {
    let slot = match &value {
        Expr::Literal(Literal::String(_)) => string,
        Expr::Literal(Literal::Bool(_)) => boolean,
        _ => number,
    };
    plain(op, slot, value)
}

pub(crate) fn compare(op: CompareOp, left: Operand, right: Operand) -> StoreResult<Expr> {
    use Operand::*;
    match (left, right) {
        (Null, Null) => Err(StoreError::IllegalArgument(
            "cannot compare null with null".into(),
        )),
        (other, Null) | (Null, other) => null_check(op, other),
        (Duration(_), _) | (_, Duration(_)) => Err(StoreError::IllegalArgument(
            "durations can only be added to or subtracted from times".into(),
        )),
        (l, r) if is_temporal(&l) || is_temporal(&r) => Ok(temporal_compare(op, span(l)?, span(r)?)),
        (
            Result {
                number,
                boolean,
                string,
                ..
            },
            Value(v) | Bool(v),
        ) => Ok(result_compare(op, number, boolean, string, v)),
        (
            Value(v) | Bool(v),
            Result {
                number,
                boolean,
                string,
                ..
            },
        ) => Ok(result_compare(flip(op), number, boolean, string, v)),
        (Result { number: a, .. }, Result { number: b, .. }) => Ok(plain(op, a, b)),
        (Value(a) | Bool(a), Value(b) | Bool(b)) => Ok(plain(op, a, b)),
        (l, r) => Err(StoreError::IllegalArgument(format!(
            "cannot compare {:?} with {:?}",
            l, r
        ))),
    }
}

/// Shift a time expression; literal timestamps are shifted in place.
fn shift(expr: Expr, millis: i64) -> StoreResult<Expr> {
    if let Expr::Literal(Literal::String(s)) = &expr {
        if let Ok(t) = parse_timestamp(s) {
            let shifted = chrono::Duration::try_milliseconds(millis)
                .and_then(|d| t.checked_add_signed(d))
                .ok_or_else(|| out_of_range("time"))?;
            return Ok(lit_str(&format_timestamp(&shifted)));
        }
    }
    Ok(expr.shift_millis(millis))
}

fn out_of_range(what: &str) -> StoreError {
    StoreError::IllegalArgument(format!("{} out of range", what))
}

fn numeric(operand: Operand) -> StoreResult<Expr> {
    match operand {
        Operand::Value(e) => Ok(e),
        Operand::Result { number, .. } => Ok(number),
        other => Err(StoreError::IllegalArgument(format!(
            "not a number: {:?}",
            other
        ))),
    }
}

fn arith(op: ArithOp, left: Operand, right: Operand) -> StoreResult<Operand> {
    use Operand::*;
    let signed = |millis: i64| match op {
        ArithOp::Sub => millis.checked_neg().ok_or_else(|| out_of_range("duration")),
        ArithOp::Add => Ok(millis),
        _ => Err(StoreError::IllegalArgument(
            "times only support add and sub".into(),
        )),
    };
    match (left, right) {
        (Duration(a), Duration(b)) => match op {
            ArithOp::Add => a
                .checked_add(b)
                .map(Duration)
                .ok_or_else(|| out_of_range("duration")),
            ArithOp::Sub => a
                .checked_sub(b)
                .map(Duration)
                .ok_or_else(|| out_of_range("duration")),
            _ => Err(StoreError::IllegalArgument(
                "durations only support add and sub".into(),
            )),
        },
        (Instant(e), Duration(ms)) => Ok(Instant(shift(e, signed(ms)?)?)),
        (Duration(ms), Instant(e)) if op == ArithOp::Add => Ok(Instant(shift(e, ms)?)),
        (Interval { start, end }, Duration(ms)) => {
            let ms = signed(ms)?;
            Ok(Interval {
                start: shift(start, ms)?,
                end: shift(end, ms)?,
            })
        }
        (Value(e), Duration(ms)) if literal_instant(&e).is_some() => {
            Ok(Instant(shift(e, signed(ms)?)?))
        }
        (Duration(_), _) | (_, Duration(_)) => Err(StoreError::IllegalArgument(
            "durations can only be added to or subtracted from times".into(),
        )),
        (l, r) => {
            let (l, r) = (numeric(l)?, numeric(r)?);
            Ok(Value(match op {
                ArithOp::Add => l.add(r),
                ArithOp::Sub => l.sub(r),
                ArithOp::Mul => l.mul(r),
                ArithOp::Div => l.div(r),
                ArithOp::Mod => l.modulo(r),
            }))
        }
    }
}

fn text(operand: Operand) -> StoreResult<Expr> {
    match operand {
        Operand::Value(e) => Ok(e),
        Operand::Result { string, .. } => Ok(string),
        other => Err(StoreError::IllegalArgument(format!(
            "not a string: {:?}",
            other
        ))),
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// `haystack LIKE prefix || needle || suffix`, escaping literal needles.
fn like(haystack: Expr, needle: Expr, prefix: &str, suffix: &str) -> Expr {
    if let Expr::Literal(Literal::String(s)) = &needle {
        let pattern = format!("{}{}{}", prefix, escape_like(s), suffix);
        return haystack.like_escape(lit_str(&pattern), LIKE_ESCAPE);
    }
    let mut pattern = needle;
    if !prefix.is_empty() {
        pattern = lit_str(prefix).concat(pattern);
    }
    if !suffix.is_empty() {
        pattern = pattern.concat(lit_str(suffix));
    }
    haystack.like(pattern)
}

fn function_call(function: FilterFunction, args: Vec<Operand>) -> StoreResult<Operand> {
    let mut args = args.into_iter();
    let mut next = || {
        args.next().ok_or_else(|| {
            StoreError::IllegalArgument(format!("{}: missing argument", function.name()))
        })
    };

    let expr = match function {
        FilterFunction::Before
        | FilterFunction::After
        | FilterFunction::Meets
        | FilterFunction::During
        | FilterFunction::Overlaps
        | FilterFunction::Starts
        | FilterFunction::Finishes => {
            let a = span(next()?)?;
            let b = span(next()?)?;
            match function {
                FilterFunction::Before => before(&a, &b),
                FilterFunction::After => after(&a, &b),
                FilterFunction::Meets => a.end.clone().eq(b.start.clone()).or(a.start.eq(b.end)),
                FilterFunction::During => {
                    if b.instant {
                        return Err(StoreError::IllegalArgument(
                            "during needs an interval as second argument".into(),
                        ));
                    }
                    a.start.gte(b.start).and(a.end.lte(b.end))
                }
                FilterFunction::Overlaps => {
                    if a.instant || b.instant {
                        a.start.lte(b.end).and(a.end.gte(b.start))
                    } else {
                        a.start.lt(b.end).and(a.end.gt(b.start))
                    }
                }
                FilterFunction::Starts => a.start.eq(b.start),
                _ => a.end.eq(b.end),
            }
        }
        FilterFunction::StartsWith => {
            let haystack = text(next()?)?;
            like(haystack, text(next()?)?, "", "%")
        }
        FilterFunction::EndsWith => {
            let haystack = text(next()?)?;
            like(haystack, text(next()?)?, "%", "")
        }
        FilterFunction::SubstringOf => {
            let needle = text(next()?)?;
            like(text(next()?)?, needle, "%", "%")
        }
        FilterFunction::Length => return Ok(Operand::Value(func("LENGTH", vec![text(next()?)?]))),
        FilterFunction::ToLower => return Ok(Operand::Value(func("LOWER", vec![text(next()?)?]))),
        FilterFunction::ToUpper => return Ok(Operand::Value(func("UPPER", vec![text(next()?)?]))),
        FilterFunction::Round => return Ok(Operand::Value(func("ROUND", vec![numeric(next()?)?]))),
    };
    Ok(Operand::Bool(expr))
}
