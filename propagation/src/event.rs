use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Set of integer variable event kinds, as a bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventMask(u8);

impl EventMask {
    pub const VOID: Self = Self(0);
    pub const INSTANTIATE: Self = Self(1);
    pub const INCLOW: Self = Self(2);
    pub const DECUPP: Self = Self(4);
    pub const BOUND: Self = Self(2 | 4);
    pub const REMOVE: Self = Self(8);
    pub const ALL: Self = Self(1 | 2 | 4 | 8);

    #[inline(always)]
    pub fn bits(&self) -> u8 {
        return self.0;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.0 == 0;
    }

    #[inline(always)]
    pub fn intersects(&self, other: Self) -> bool {
        return self.0 & other.0 != 0;
    }

    #[inline(always)]
    pub fn contains(&self, other: Self) -> bool {
        return self.0 & other.0 == other.0;
    }
}

impl BitOr for EventMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EventMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::fmt::Debug for EventMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (Self::INSTANTIATE, "INSTANTIATE"),
            (Self::INCLOW, "INCLOW"),
            (Self::DECUPP, "DECUPP"),
            (Self::REMOVE, "REMOVE"),
        ];
        let mut list = f.debug_set();
        for (mask, name) in names {
            if self.contains(mask) {
                list.entry(&format_args!("{name}"));
            }
        }
        return list.finish();
    }
}

/// Change made to the domain of an integer variable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IntEvent {
    /// A value strictly between the bounds was removed.
    Remove,
    IncLow,
    DecUpp,
    /// Both bounds moved at once without fixing the variable.
    Bound,
    Instantiate,
}

impl IntEvent {
    #[inline(always)]
    pub fn mask(&self) -> EventMask {
        return match self {
            Self::Remove => EventMask::REMOVE,
            Self::IncLow => EventMask::INCLOW,
            Self::DecUpp => EventMask::DECUPP,
            Self::Bound => EventMask::BOUND,
            Self::Instantiate => EventMask::INSTANTIATE,
        };
    }

    /// Every event kind this one implies: a bound change also removes
    /// values, an instantiation is every change at once.
    #[inline(always)]
    pub fn strengthened_mask(&self) -> EventMask {
        return match self {
            Self::Remove => EventMask::REMOVE,
            Self::IncLow => EventMask::INCLOW | EventMask::REMOVE,
            Self::DecUpp => EventMask::DECUPP | EventMask::REMOVE,
            Self::Bound => EventMask::BOUND | EventMask::REMOVE,
            Self::Instantiate => EventMask::ALL,
        };
    }

    /// Whether a propagator listening to `conditions` must hear of this event.
    #[inline(always)]
    pub fn triggers(&self, conditions: EventMask) -> bool {
        return self.strengthened_mask().intersects(conditions);
    }
}

/// Kind of coarse-grained run asked of a propagator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PropagatorEventType {
    /// Filter from scratch.
    Full,
    /// Filter on behalf of the propagator itself, after fine events.
    Custom,
}
