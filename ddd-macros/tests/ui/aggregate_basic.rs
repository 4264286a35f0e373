use ddd_domain::aggregate::AggregateRoot;
use ddd_domain::entity::Entity;
use ddd_macros::{aggregate_root, domain_event};

#[domain_event(name = "account.opened")]
struct AccountOpened {
    owner: String,
}

#[aggregate_root(id = u64)]
struct Account {
    owner: String,
}

impl Account {
    fn open(id: u64, owner: &str) -> Self {
        let mut account = Account {
            id,
            owner: owner.to_string(),
            domain_events: Default::default(),
        };
        account.raise(AccountOpened {
            meta: Default::default(),
            owner: owner.to_string(),
        });
        account
    }
}

fn main() {
    let mut account = Account::open(7, "alice");
    assert_eq!(*account.id(), 7);
    assert_eq!(account.owner, "alice");
    assert_eq!(account.take_domain_events().len(), 1);
    let _ = format!("{:?}", account.clone());
}
