//! 表达式树（Expression Tree）
//!
//! 规约的过滤条件、排序键与预加载路径均以数据形式的表达式描述，而非闭包：
//! - 可被结构化改写（参数替换），组合 AND/OR 时不产生“调用子 lambda”节点；
//! - 可被结构化比较（预加载去重）；
//! - 可交给外部查询提供者翻译，也可由内存提供者直接求值。
//!
use super::value::{FieldAccess, ToValue, Value};
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT_PARAMETER_ID: AtomicU64 = AtomicU64::new(1);

/// lambda 参数；名称仅用于展示，身份由进程内唯一 id 决定
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    id: u64,
    name: Arc<str>,
}

impl Parameter {
    pub fn new(name: &str) -> Self {
        Self {
            id: NEXT_PARAMETER_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    IsNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAlso,
    OrElse,
    Contains,
    StartsWith,
    EndsWith,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Contains => "contains",
            BinaryOp::StartsWith => "starts_with",
            BinaryOp::EndsWith => "ends_with",
        }
    }
}

/// 表达式节点
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Parameter(Parameter),
    Constant(Value),
    Member {
        target: Box<Expr>,
        member: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// 可转换为表达式的值（常量或已有表达式）
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for Value {
    fn into_expr(self) -> Expr {
        Expr::Constant(self)
    }
}

macro_rules! constant_into_expr {
    ($($t:ty),*) => {
        $(impl IntoExpr for $t {
            fn into_expr(self) -> Expr {
                Expr::Constant(self.to_value())
            }
        })*
    };
}

constant_into_expr!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
    &str,
    Uuid,
    DateTime<Utc>
);

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn constant(value: impl ToValue) -> Expr {
        Expr::Constant(value.to_value())
    }

    /// 成员访问：`x.member`
    pub fn member(self, member: &str) -> Expr {
        Expr::Member {
            target: Box::new(self),
            member: member.to_string(),
        }
    }

    fn binary(self, op: BinaryOp, right: impl IntoExpr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into_expr()),
        }
    }

    pub fn eq(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::Eq, right)
    }

    pub fn ne(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::Ne, right)
    }

    pub fn lt(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::Lt, right)
    }

    pub fn le(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::Le, right)
    }

    pub fn gt(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::Gt, right)
    }

    pub fn ge(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::Ge, right)
    }

    pub fn and(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::AndAlso, right)
    }

    pub fn or(self, right: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::OrElse, right)
    }

    pub fn contains(self, needle: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::Contains, needle)
    }

    pub fn starts_with(self, prefix: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::StartsWith, prefix)
    }

    pub fn ends_with(self, suffix: impl IntoExpr) -> Expr {
        self.binary(BinaryOp::EndsWith, suffix)
    }

    pub fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::IsNull,
            operand: Box::new(self),
        }
    }

    /// 以访问者遍历并重建表达式
    pub fn accept<V: ExprVisitor + ?Sized>(&self, visitor: &mut V) -> Expr {
        visitor.visit(self)
    }

    /// 表达式中是否引用了指定参数
    pub fn references(&self, parameter: &Parameter) -> bool {
        match self {
            Expr::Parameter(p) => p == parameter,
            Expr::Constant(_) => false,
            Expr::Member { target, .. } => target.references(parameter),
            Expr::Unary { operand, .. } => operand.references(parameter),
            Expr::Binary { left, right, .. } => {
                left.references(parameter) || right.references(parameter)
            }
        }
    }

    /// 若为 `param.a.b.c` 形式的成员链，返回 `["a", "b", "c"]`
    pub fn member_chain(&self) -> Option<Vec<&str>> {
        match self {
            Expr::Parameter(_) => Some(Vec::new()),
            Expr::Member { target, member } => {
                let mut chain = target.member_chain()?;
                chain.push(member.as_str());
                Some(chain)
            }
            _ => None,
        }
    }

    /// 以 `item` 绑定 `parameter` 求值
    pub fn evaluate<T: FieldAccess + ?Sized>(
        &self,
        parameter: &Parameter,
        item: &T,
    ) -> DomainResult<Value> {
        match self {
            Expr::Parameter(p) if p == parameter => Err(DomainError::translation(
                self,
                "a bare parameter is not a scalar value",
            )),
            Expr::Parameter(p) => Err(DomainError::translation(
                self,
                format!("unbound parameter '{}'", p.name()),
            )),
            Expr::Constant(v) => Ok(v.clone()),
            Expr::Member { target, member } => match target.as_ref() {
                Expr::Parameter(p) if p == parameter => item.field(member).ok_or_else(|| {
                    DomainError::translation(self, format!("unknown member '{member}'"))
                }),
                _ => Err(DomainError::translation(
                    self,
                    "nested member access is not supported in memory",
                )),
            },
            Expr::Unary { op, operand } => {
                let v = operand.evaluate(parameter, item)?;
                match op {
                    UnaryOp::IsNull => Ok(Value::Bool(v.is_null())),
                    UnaryOp::Not => v
                        .as_bool()
                        .map(|b| Value::Bool(!b))
                        .ok_or_else(|| type_error(self, "bool", &v)),
                }
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::AndAlso | BinaryOp::OrElse => {
                    let l = left.evaluate(parameter, item)?;
                    let l = l.as_bool().ok_or_else(|| type_error(self, "bool", &l))?;
                    // 短路
                    if (*op == BinaryOp::AndAlso && !l) || (*op == BinaryOp::OrElse && l) {
                        return Ok(Value::Bool(l));
                    }
                    let r = right.evaluate(parameter, item)?;
                    r.as_bool()
                        .map(Value::Bool)
                        .ok_or_else(|| type_error(self, "bool", &r))
                }
                _ => {
                    let l = left.evaluate(parameter, item)?;
                    let r = right.evaluate(parameter, item)?;
                    compare(self, *op, &l, &r).map(Value::Bool)
                }
            },
        }
    }
}

fn type_error(expr: &Expr, expected: &str, found: &Value) -> DomainError {
    DomainError::translation(
        expr,
        format!("expected {expected}, found {}", found.kind()),
    )
}

fn compare(expr: &Expr, op: BinaryOp, l: &Value, r: &Value) -> DomainResult<bool> {
    use std::cmp::Ordering::*;
    let result = match op {
        BinaryOp::Eq => l.loose_eq(r),
        BinaryOp::Ne => !l.loose_eq(r),
        BinaryOp::Lt => l.partial_compare(r) == Some(Less),
        BinaryOp::Le => matches!(l.partial_compare(r), Some(Less | Equal)),
        BinaryOp::Gt => l.partial_compare(r) == Some(Greater),
        BinaryOp::Ge => matches!(l.partial_compare(r), Some(Greater | Equal)),
        BinaryOp::Contains | BinaryOp::StartsWith | BinaryOp::EndsWith => {
            if l.is_null() || r.is_null() {
                return Ok(false);
            }
            match (l.as_text(), r.as_text()) {
                (Some(s), Some(p)) => match op {
                    BinaryOp::Contains => s.contains(p),
                    BinaryOp::StartsWith => s.starts_with(p),
                    _ => s.ends_with(p),
                },
                (None, _) => return Err(type_error(expr, "text", l)),
                (_, None) => return Err(type_error(expr, "text", r)),
            }
        }
        BinaryOp::AndAlso | BinaryOp::OrElse => unreachable!("logical ops are short-circuited"),
    };
    Ok(result)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Parameter(p) => write!(f, "{}", p.name()),
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Member { target, member } => write!(f, "{target}.{member}"),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!{operand}"),
            Expr::Unary {
                op: UnaryOp::IsNull,
                operand,
            } => write!(f, "({operand} is null)"),
            Expr::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
        }
    }
}

/// 表达式访问者：默认实现按结构递归重建
pub trait ExprVisitor {
    fn visit(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Parameter(p) => self.visit_parameter(p),
            Expr::Constant(v) => Expr::Constant(v.clone()),
            Expr::Member { target, member } => Expr::Member {
                target: Box::new(self.visit(target)),
                member: member.clone(),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: Box::new(self.visit(operand)),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(self.visit(left)),
                right: Box::new(self.visit(right)),
            },
        }
    }

    fn visit_parameter(&mut self, parameter: &Parameter) -> Expr {
        Expr::Parameter(parameter.clone())
    }
}

/// 把表达式中的某个参数替换为另一个表达式
pub struct ParameterReplacer<'a> {
    from: &'a Parameter,
    to: &'a Expr,
}

impl<'a> ParameterReplacer<'a> {
    pub fn new(from: &'a Parameter, to: &'a Expr) -> Self {
        Self { from, to }
    }
}

impl ExprVisitor for ParameterReplacer<'_> {
    fn visit_parameter(&mut self, parameter: &Parameter) -> Expr {
        if parameter == self.from {
            self.to.clone()
        } else {
            Expr::Parameter(parameter.clone())
        }
    }
}
