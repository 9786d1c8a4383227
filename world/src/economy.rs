//! Player currency and lives.

use tile_defence_core::EconomySnapshot;

#[derive(Debug)]
pub(crate) struct Economy {
    starting_currency: u32,
    starting_lives: u32,
    currency: u32,
    lives: u32,
}

impl Economy {
    pub(crate) fn new(starting_currency: u32, starting_lives: u32) -> Self {
        Self {
            starting_currency,
            starting_lives,
            currency: starting_currency,
            lives: starting_lives,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.currency = self.starting_currency;
        self.lives = self.starting_lives;
    }

    pub(crate) fn can_afford(&self, cost: u32) -> bool {
        self.currency >= cost
    }

    /// Deducts the cost, returning `false` without charging when funds are short.
    pub(crate) fn try_spend(&mut self, cost: u32) -> bool {
        match self.currency.checked_sub(cost) {
            Some(left) => {
                self.currency = left;
                true
            }
            None => false,
        }
    }

    pub(crate) fn earn(&mut self, reward: u32) {
        self.currency = self.currency.saturating_add(reward);
    }

    /// Removes a life and reports how many remain.
    pub(crate) fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    pub(crate) fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            currency: self.currency,
            lives: self.lives,
        }
    }
}
