use ddd_domain::entity::Entity;
use ddd_macros::entity;

#[entity]
struct Tag {
    label: String,
}

#[entity(id = u32, debug = false)]
struct Secret {
    value: String,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(..)")
    }
}

fn main() {
    let tag = Tag {
        id: "t-1".to_string(),
        label: "rust".to_string(),
    };
    assert_eq!(tag.id(), "t-1");
    assert_eq!(tag.label, "rust");

    let secret = Secret {
        id: 1,
        value: "hidden".to_string(),
    };
    assert_eq!(format!("{:?}", secret.clone()), "Secret(..)");
    assert!(secret.same_identity_as(&secret.clone()));
    let _ = secret.value;
}
