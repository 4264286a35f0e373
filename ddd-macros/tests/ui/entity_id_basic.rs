use ddd_domain::specification::{ToValue, Value};
use ddd_macros::entity_id;
use uuid::Uuid;

#[entity_id]
struct UserId(Uuid);

#[entity_id]
struct Sku(String);

fn main() {
    let raw = Uuid::new_v4();
    let id = UserId::new(raw);
    let parsed: UserId = raw.to_string().parse().unwrap();
    assert_eq!(id, parsed);
    assert_eq!(id.to_string(), raw.to_string());
    assert_eq!(id.to_value(), Value::Uuid(raw));

    let sku = Sku::from("A-1".to_string());
    assert_eq!(sku.as_ref(), "A-1");
    assert_eq!(sku.value(), "A-1");
}
