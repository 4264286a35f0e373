use ddd_domain::specification::{FieldAccess, Value};
use ddd_macros::FieldAccess;

#[derive(FieldAccess)]
struct Customer {
    name: String,
    #[field(rename = "years")]
    age: u32,
    nickname: Option<String>,
    #[field(skip)]
    password_hash: String,
}

fn main() {
    let c = Customer {
        name: "alice".into(),
        age: 30,
        nickname: None,
        password_hash: "x".into(),
    };
    assert_eq!(c.field("name"), Some(Value::Text("alice".into())));
    assert_eq!(c.field("years"), Some(Value::Int(30)));
    assert_eq!(c.field("age"), None);
    assert_eq!(c.field("nickname"), Some(Value::Null));
    assert_eq!(c.field("password_hash"), None);
    let _ = c.password_hash;
}
