//! Subscription & referral ledger.
//!
//! Decides how a payment or a referral turns into subscription time while
//! keeping at most one active window per user.

pub mod clock;
pub mod events;
pub mod engine;
pub mod locks;

#[cfg(test)]
mod testing;

pub mod store {
    pub mod memory;
    pub mod postgres;

    mod seam;
    pub use seam::LedgerStore;
}

pub mod services {
    pub mod payment;
    pub mod referral;
    pub mod resolver;
}

pub use engine::{Ledger, Registration, SubscriptionStatus};
