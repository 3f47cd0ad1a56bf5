//! Basic Tessera Usage Example
//!
//! This example demonstrates:
//! - Opening a store with an indexed table
//! - Creating and updating objects with optimistic versioning
//! - Querying with `By`
//! - Watching committed changes
//! - Loading many objects through a batch
//!
//! Run with: cargo run --example basic_usage

use tessera::prelude::*;

const ACCOUNTS: &str = "accounts";

#[derive(Debug, Clone)]
struct Account {
    id: String,
    owner: String,
    balance: i64,
    version: Version,
}

impl Account {
    fn new(id: &str, owner: &str, balance: i64) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            balance,
            version: Version::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
enum AccountEvent {
    Opened { id: String, balance: i64 },
    Changed { id: String, delta: i64 },
    Closed { id: String },
}

impl Event for AccountEvent {
    fn matches(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Object for Account {
    type Event = AccountEvent;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn event_create(&self) -> AccountEvent {
        AccountEvent::Opened {
            id: self.id.clone(),
            balance: self.balance,
        }
    }

    fn event_update(&self, previous: &Self) -> AccountEvent {
        AccountEvent::Changed {
            id: self.id.clone(),
            delta: self.balance - previous.balance,
        }
    }

    fn event_delete(&self) -> AccountEvent {
        AccountEvent::Closed {
            id: self.id.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("tessera=debug")
        .init();

    println!("\n=== Tessera Basic Usage Example ===\n");

    // ========================================
    // 1. Open Store
    // ========================================
    println!("Step 1: Opening store");

    let accounts = TableSchema::new(ACCOUNTS)
        .with_index(IndexSchema::single("owner", |a: &Account| Some(a.owner.clone())));
    let store: Store<Account> = Store::open([accounts], StoreConfig::default())?;

    let (mut feed, _cancel) = watch(store.watch_queue(), [])?;
    println!("   Store opened at {}\n", store.version());

    // ========================================
    // 2. Create Accounts
    // ========================================
    println!("Step 2: Creating accounts");

    let mut alice = Account::new("acc-1", "alice", 10_000);
    store.update(|tx| {
        tx.create(ACCOUNTS, &mut alice)?;
        tx.create(ACCOUNTS, &mut Account::new("acc-2", "bob", 2_500))
    })?;
    println!("   alice's account is at {}\n", alice.version);

    // ========================================
    // 3. Optimistic Update
    // ========================================
    println!("Step 3: Withdrawing with a stale copy");

    let mut stale = Account::new("acc-1", "alice", 9_000);
    match store.update(|tx| tx.update(ACCOUNTS, &mut stale)) {
        Err(err) if err.is_sequence_conflict() => println!("   Rejected: {err}"),
        other => println!("   Unexpected outcome: {other:?}"),
    }

    alice.balance -= 1_000;
    store.update(|tx| tx.update(ACCOUNTS, &mut alice))?;
    println!("   Withdrawal applied, alice is now at {}\n", alice.version);

    // ========================================
    // 4. Batch Load
    // ========================================
    println!("Step 4: Loading 500 accounts in a batch");

    let loaded = store.batch(|batch| {
        for i in 0..500 {
            let mut account = Account::new(&format!("bulk-{i:03}"), "carol", 100);
            batch.update(|tx| tx.create(ACCOUNTS, &mut account))?;
        }
        Ok(batch.applied())
    })?;
    println!("   Loaded {loaded} accounts\n");

    // ========================================
    // 5. Query
    // ========================================
    println!("Step 5: Querying");

    let total: i64 = store.view(|tx| -> Result<i64> {
        let owned = tx.find_all(ACCOUNTS, &By::or([By::index("owner", "alice"), By::id("acc-2")]))?;
        Ok(owned.iter().map(|a| a.balance).sum())
    })?;
    println!("   alice + bob hold {total}");

    let bulk = store.view(|tx| tx.find_all(ACCOUNTS, &By::id_prefix("bulk-")))?;
    println!("   {} bulk accounts\n", bulk.len());

    // ========================================
    // 6. Watched Changes
    // ========================================
    println!("Step 6: Changes seen by the watcher");

    let mut opened = 0i64;
    for event in feed.drain() {
        match event {
            StoreEvent::Commit(commit) => {
                println!("   commit {} ({} changes)", commit.version, commit.changelist.len())
            }
            StoreEvent::Change(AccountEvent::Opened { balance, .. }) => opened += balance,
            StoreEvent::Change(AccountEvent::Changed { id, delta }) => {
                println!("   {id} changed by {delta}")
            }
            StoreEvent::Change(AccountEvent::Closed { id }) => println!("   {id} closed"),
        }
    }
    println!("   {opened} deposited at opening");

    store.close();
    println!("\nDone.");
    Ok(())
}
