//! The expression nodes a boot command parses into.
//!
//! Each node type lives in its own file together with the bracket syntax it
//! accepts. [`Expression`] is the closed sum over them.

mod literal;
mod special;
mod wait;

pub use literal::Literal;
pub use special::{SPECIAL_KEYS, Special};
pub use wait::{Wait, sleep_or_cancel};

use crate::driver::Driver;
use crate::error::Result;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// One step of a boot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Wait(Wait),
    Literal(Literal),
    Special(Special),
}

impl Expression {
    /// Run this expression once against `driver`.
    pub async fn execute<D>(&self, cancel: &CancellationToken, driver: &mut D) -> Result<()>
    where
        D: Driver + ?Sized,
    {
        match self {
            Expression::Wait(wait) => wait.execute(cancel, driver).await,
            Expression::Literal(literal) => literal.execute(driver).await,
            Expression::Special(special) => special.execute(driver).await,
        }
    }

    /// Check the expression without running it.
    pub fn validate(&self) -> Result<()> {
        match self {
            Expression::Special(special) => special.validate(),
            Expression::Wait(_) | Expression::Literal(_) => Ok(()),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Wait(wait) => wait.fmt(f),
            Expression::Literal(literal) => literal.fmt(f),
            Expression::Special(special) => special.fmt(f),
        }
    }
}
