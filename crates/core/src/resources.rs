//! Resource ledger arithmetic over the (leaves, dew, berries) triple.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// One of the three resource channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Primary soft currency.
    Leaves,
    /// Secondary currency.
    Dew,
    /// Rare currency.
    Berries,
}

impl ResourceKind {
    /// All channels in ledger order.
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Leaves, ResourceKind::Dew, ResourceKind::Berries];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Leaves => "leaves",
            ResourceKind::Dew => "dew",
            ResourceKind::Berries => "berries",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leaves" => Ok(ResourceKind::Leaves),
            "dew" => Ok(ResourceKind::Dew),
            "berries" => Ok(ResourceKind::Berries),
            other => Err(format!("unknown resource '{other}'")),
        }
    }
}

/// Non-negative amounts of each resource.
///
/// Missing channels deserialize as zero, so the same type doubles as a
/// partial price (see [`Cost`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    /// Leaves held or required.
    pub leaves: u64,
    /// Dew held or required.
    pub dew: u64,
    /// Berries held or required.
    pub berries: u64,
}

/// A price expressed in resources; channels left out of catalog data are zero.
pub type Cost = Resources;

impl Resources {
    /// All channels zero.
    pub const ZERO: Self = Self {
        leaves: 0,
        dew: 0,
        berries: 0,
    };

    /// Construct from explicit channel amounts.
    pub const fn new(leaves: u64, dew: u64, berries: u64) -> Self {
        Self {
            leaves,
            dew,
            berries,
        }
    }

    /// Amount held in a single channel.
    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Leaves => self.leaves,
            ResourceKind::Dew => self.dew,
            ResourceKind::Berries => self.berries,
        }
    }

    /// True when every channel is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// True when every channel covers the matching channel of `cost`.
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.leaves >= cost.leaves && self.dew >= cost.dew && self.berries >= cost.berries
    }

    /// Subtract `cost`. Callers must check [`Resources::can_afford`] first;
    /// channels floor at zero only as a last line against overflow.
    pub fn debit(&mut self, cost: &Cost) {
        debug_assert!(self.can_afford(cost), "debit without affordability check");
        self.leaves = self.leaves.saturating_sub(cost.leaves);
        self.dew = self.dew.saturating_sub(cost.dew);
        self.berries = self.berries.saturating_sub(cost.berries);
    }

    /// Per-channel product with a tick count.
    pub fn times(&self, n: u64) -> Self {
        Self {
            leaves: self.leaves.saturating_mul(n),
            dew: self.dew.saturating_mul(n),
            berries: self.berries.saturating_mul(n),
        }
    }

    /// Scale every channel by `percent / 100`, flooring each channel on its own.
    pub fn scale_percent(&self, percent: u64) -> Self {
        let scale = |v: u64| ((u128::from(v) * u128::from(percent)) / 100).min(u128::from(u64::MAX)) as u64;
        Self {
            leaves: scale(self.leaves),
            dew: scale(self.dew),
            berries: scale(self.berries),
        }
    }
}

impl Add for Resources {
    type Output = Resources;

    fn add(self, rhs: Resources) -> Resources {
        Resources {
            leaves: self.leaves.saturating_add(rhs.leaves),
            dew: self.dew.saturating_add(rhs.dew),
            berries: self.berries.saturating_add(rhs.berries),
        }
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, rhs: Resources) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} leaves / {} dew / {} berries",
            self.leaves, self.dew, self.berries
        )
    }
}
