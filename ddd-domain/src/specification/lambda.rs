use super::expr::{BinaryOp, Expr, ParameterReplacer, Parameter};
use super::value::{FieldAccess, Value};
use crate::error::{DomainError, DomainResult};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 作用于 `T` 的单参数表达式：`|x| body`
///
/// 主体以 `Arc` 共享，克隆开销很小；构造后不可变。
pub struct Lambda<T> {
    parameter: Parameter,
    body: Arc<Expr>,
    _marker: PhantomData<fn(&T) -> Value>,
}

impl<T> Lambda<T> {
    /// 以闭包构造：闭包接收参数表达式并返回主体
    ///
    /// ```
    /// use ddd_domain::specification::Lambda;
    ///
    /// struct Customer;
    /// let adult = Lambda::<Customer>::new(|c| c.member("age").ge(18));
    /// assert_eq!(adult.to_string(), "x => (x.age >= 18)");
    /// ```
    pub fn new(build: impl FnOnce(Expr) -> Expr) -> Self {
        let parameter = Parameter::new("x");
        let body = build(Expr::Parameter(parameter.clone()));
        Self::from_parts(parameter, body)
    }

    pub fn from_parts(parameter: Parameter, body: Expr) -> Self {
        Self {
            parameter,
            body: Arc::new(body),
            _marker: PhantomData,
        }
    }

    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// 把主体中的参数替换为 `parameter`，返回改写后的主体
    pub fn rebind(&self, parameter: &Parameter) -> Expr {
        let to = Expr::Parameter(parameter.clone());
        self.body.accept(&mut ParameterReplacer::new(&self.parameter, &to))
    }

    /// 以一个新的共享参数组合两个 lambda：`|x| left(x) op right(x)`
    ///
    /// 两侧主体被直接改写到同一参数下，不产生调用节点，便于查询提供者翻译。
    pub fn combine(left: &Lambda<T>, right: &Lambda<T>, op: BinaryOp) -> Lambda<T> {
        let shared = Parameter::new(left.parameter.name());
        let body = Expr::Binary {
            op,
            left: Box::new(left.rebind(&shared)),
            right: Box::new(right.rebind(&shared)),
        };
        Lambda::from_parts(shared, body)
    }

    /// 逻辑取反：`|x| !body`
    pub fn negate(&self) -> Lambda<T> {
        Lambda::from_parts(self.parameter.clone(), self.body.as_ref().clone().not())
    }

    /// 结构相等（忽略参数身份）
    pub fn structurally_eq(&self, other: &Lambda<T>) -> bool {
        if self.parameter == other.parameter {
            return self.body == other.body;
        }
        *self.body == other.rebind(&self.parameter)
    }

    /// 导航路径（如 `orders.lines`）；主体不是成员链时返回 `None`
    pub fn member_path(&self) -> Option<String> {
        self.body
            .member_chain()
            .filter(|chain| !chain.is_empty())
            .map(|chain| chain.join("."))
    }
}

impl<T: FieldAccess> Lambda<T> {
    pub fn evaluate(&self, item: &T) -> DomainResult<Value> {
        self.body.evaluate(&self.parameter, item)
    }

    /// 以谓词方式求值，主体结果必须为布尔值
    pub fn matches(&self, item: &T) -> DomainResult<bool> {
        match self.evaluate(item)? {
            Value::Bool(b) => Ok(b),
            other => Err(DomainError::translation(
                self,
                format!("predicate must yield bool, found {}", other.kind()),
            )),
        }
    }
}

impl<T> Clone for Lambda<T> {
    fn clone(&self) -> Self {
        Self {
            parameter: self.parameter.clone(),
            body: Arc::clone(&self.body),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Lambda<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda")
            .field("parameter", &self.parameter)
            .field("body", &self.body)
            .finish()
    }
}

impl<T> fmt::Display for Lambda<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.parameter.name(), self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::value::ToValue;

    struct Row {
        age: i64,
        active: bool,
    }

    impl FieldAccess for Row {
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "age" => Some(self.age.to_value()),
                "active" => Some(self.active.to_value()),
                _ => None,
            }
        }
    }

    #[test]
    fn combine_uses_one_shared_parameter() {
        let adult = Lambda::<Row>::new(|x| x.member("age").ge(18));
        let active = Lambda::<Row>::new(|x| x.member("active").eq(true));
        let both = Lambda::combine(&adult, &active, BinaryOp::AndAlso);

        assert!(both.body().references(both.parameter()));
        assert!(!both.body().references(adult.parameter()));
        assert!(!both.body().references(active.parameter()));
        assert_eq!(
            both.to_string(),
            "x => ((x.age >= 18) && (x.active == true))"
        );

        assert!(both.matches(&Row { age: 20, active: true }).unwrap());
        assert!(!both.matches(&Row { age: 20, active: false }).unwrap());
    }

    #[test]
    fn structural_equality_ignores_parameter_identity() {
        let a = Lambda::<Row>::new(|x| x.member("age"));
        let b = Lambda::<Row>::new(|y| y.member("age"));
        let c = Lambda::<Row>::new(|x| x.member("active"));
        assert!(a.structurally_eq(&b));
        assert!(!a.structurally_eq(&c));
    }

    #[test]
    fn member_path_joins_navigation_chain() {
        let nav = Lambda::<Row>::new(|x| x.member("orders").member("lines"));
        assert_eq!(nav.member_path().as_deref(), Some("orders.lines"));
        let not_nav = Lambda::<Row>::new(|x| x.member("age").ge(1));
        assert_eq!(not_nav.member_path(), None);
    }

    #[test]
    fn non_boolean_predicate_is_rejected() {
        let key = Lambda::<Row>::new(|x| x.member("age"));
        let err = key.matches(&Row { age: 1, active: true });
        assert!(matches!(err, Err(DomainError::QueryTranslation { .. })));
    }
}
