use tracing::debug;

use crate::protocol::{PurseSnapshot, ResourceKind};

/// Receiver for resources earned by agents visiting buildings.
pub trait EconomySink {
    fn add_resource(&mut self, kind: ResourceKind, amount: i64);
}

/// Player's money and faith balances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Purse {
    pub money: i64,
    pub faith: i64,
}

impl Purse {
    pub fn new(money: i64, faith: i64) -> Self {
        Purse { money, faith }
    }

    pub fn can_afford(&self, price: i64) -> bool {
        self.money >= price
    }

    /// Deduct `price` from money. Returns `false` and leaves the balance
    /// untouched when the purse cannot cover it.
    pub fn spend(&mut self, price: i64) -> bool {
        if !self.can_afford(price) {
            return false;
        }
        self.money -= price;
        true
    }

    pub fn snapshot(&self) -> PurseSnapshot {
        PurseSnapshot {
            money: self.money,
            faith: self.faith,
        }
    }
}

impl EconomySink for Purse {
    fn add_resource(&mut self, kind: ResourceKind, amount: i64) {
        match kind {
            ResourceKind::Money => self.money += amount,
            ResourceKind::Faith => self.faith += amount,
        }
        debug!(
            "{:?} +{} (money {}, faith {})",
            kind, amount, self.money, self.faith
        );
    }
}
