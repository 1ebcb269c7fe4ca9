//! The closed set of value types a reversible cell can hold.

use std::{any::Any, fmt::Debug, sync::Arc};

use ordered_float::OrderedFloat;

use crate::{
    environment::{Environment, Strategy},
    store::StoreKind,
    trail::{ChunkedLog, Entry, Log, PackedLog},
};

mod sealed {
    pub trait Sealed {}
}

/// Fixed-size little-endian encoding used by [`PackedLog`].
pub trait Packable: Sized {
    const SIZE: usize;
    fn pack(&self, bytes: &mut [u8]);
    fn unpack(bytes: &[u8]) -> Self;
}

macro_rules! impl_packable {
    ($($type:ty),*) => {
        $(
            impl Packable for $type {
                const SIZE: usize = std::mem::size_of::<$type>();

                #[inline(always)]
                fn pack(&self, bytes: &mut [u8]) {
                    bytes[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                #[inline(always)]
                fn unpack(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$type>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    return <$type>::from_le_bytes(raw);
                }
            }
        )*
    };
}

impl_packable!(i32, i64, u32, f64);

impl Packable for bool {
    const SIZE: usize = 1;

    #[inline(always)]
    fn pack(&self, bytes: &mut [u8]) {
        bytes[0] = *self as u8;
    }

    #[inline(always)]
    fn unpack(bytes: &[u8]) -> Self {
        return bytes[0] != 0;
    }
}

impl Packable for (u32, u32) {
    const SIZE: usize = 8;

    #[inline(always)]
    fn pack(&self, bytes: &mut [u8]) {
        self.0.pack(&mut bytes[..4]);
        self.1.pack(&mut bytes[4..8]);
    }

    #[inline(always)]
    fn unpack(bytes: &[u8]) -> Self {
        return (u32::unpack(&bytes[..4]), u32::unpack(&bytes[4..8]));
    }
}

/// Shared, immutable payload of an object cell. Two objects are the same
/// value only when they are the same allocation.
#[derive(Clone)]
pub struct Object(Arc<dyn Any + Send + Sync>);

impl Object {
    pub fn new<ValueT: Any + Send + Sync>(value: ValueT) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc<ValueT: Any + Send + Sync>(value: Arc<ValueT>) -> Self {
        Self(value)
    }

    pub fn downcast<ValueT: Any + Send + Sync>(&self) -> Option<Arc<ValueT>> {
        self.0.clone().downcast::<ValueT>().ok()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({:p})", Arc::as_ptr(&self.0))
    }
}

/// A type that reversible scalar cells can hold.
///
/// The trait also routes a value type to its store inside an
/// [`Environment`], so the dispatch over types is resolved at compile time.
pub trait StateValue: sealed::Sealed + Clone + Debug + 'static {
    const KIND: StoreKind;

    /// Log used by [`PackedTrailing`](crate::PackedTrailing) environments.
    type CompactLog: Log<Entry<u32, Self>>;

    /// Whether writing `other` over `self` is a change worth recording.
    fn differs(&self, other: &Self) -> bool;

    #[doc(hidden)]
    fn store<StrategyT: Strategy>(
        environment: &Environment<StrategyT>,
    ) -> &Option<StrategyT::Scalar<Self>>;

    #[doc(hidden)]
    fn store_mut<StrategyT: Strategy>(
        environment: &mut Environment<StrategyT>,
    ) -> &mut Option<StrategyT::Scalar<Self>>;
}

/// A type that reversible vectors can hold.
pub trait VectorValue: StateValue + Copy + Packable {
    const VECTOR_KIND: StoreKind;

    type CompactVectorLog: Log<Entry<(u32, u32), Self>>;

    #[doc(hidden)]
    fn vector_store<StrategyT: Strategy>(
        environment: &Environment<StrategyT>,
    ) -> &Option<StrategyT::Vector<Self>>;

    #[doc(hidden)]
    fn vector_store_mut<StrategyT: Strategy>(
        environment: &mut Environment<StrategyT>,
    ) -> &mut Option<StrategyT::Vector<Self>>;
}

macro_rules! route_scalar {
    ($field:ident) => {
        #[inline(always)]
        fn store<StrategyT: Strategy>(
            environment: &Environment<StrategyT>,
        ) -> &Option<StrategyT::Scalar<Self>> {
            &environment.$field
        }

        #[inline(always)]
        fn store_mut<StrategyT: Strategy>(
            environment: &mut Environment<StrategyT>,
        ) -> &mut Option<StrategyT::Scalar<Self>> {
            &mut environment.$field
        }
    };
}

macro_rules! route_vector {
    ($field:ident) => {
        #[inline(always)]
        fn vector_store<StrategyT: Strategy>(
            environment: &Environment<StrategyT>,
        ) -> &Option<StrategyT::Vector<Self>> {
            &environment.$field
        }

        #[inline(always)]
        fn vector_store_mut<StrategyT: Strategy>(
            environment: &mut Environment<StrategyT>,
        ) -> &mut Option<StrategyT::Vector<Self>> {
            &mut environment.$field
        }
    };
}

impl sealed::Sealed for i32 {}
impl sealed::Sealed for i64 {}
impl sealed::Sealed for bool {}
impl sealed::Sealed for f64 {}
impl sealed::Sealed for Object {}

impl StateValue for i32 {
    const KIND: StoreKind = StoreKind::Int;
    type CompactLog = PackedLog<Entry<u32, Self>>;

    #[inline(always)]
    fn differs(&self, other: &Self) -> bool {
        self != other
    }

    route_scalar!(ints);
}

impl StateValue for i64 {
    const KIND: StoreKind = StoreKind::Long;
    type CompactLog = PackedLog<Entry<u32, Self>>;

    #[inline(always)]
    fn differs(&self, other: &Self) -> bool {
        self != other
    }

    route_scalar!(longs);
}

impl StateValue for bool {
    const KIND: StoreKind = StoreKind::Bool;
    type CompactLog = PackedLog<Entry<u32, Self>>;

    #[inline(always)]
    fn differs(&self, other: &Self) -> bool {
        self != other
    }

    route_scalar!(bools);
}

impl StateValue for f64 {
    const KIND: StoreKind = StoreKind::Double;
    type CompactLog = PackedLog<Entry<u32, Self>>;

    #[inline(always)]
    fn differs(&self, other: &Self) -> bool {
        OrderedFloat(*self) != OrderedFloat(*other)
    }

    route_scalar!(doubles);
}

impl StateValue for Object {
    const KIND: StoreKind = StoreKind::Object;
    // objects have no byte encoding; the packed strategy keeps them in chunks
    type CompactLog = ChunkedLog<Entry<u32, Self>>;

    #[inline(always)]
    fn differs(&self, other: &Self) -> bool {
        !self.ptr_eq(other)
    }

    route_scalar!(objects);
}

impl VectorValue for i32 {
    const VECTOR_KIND: StoreKind = StoreKind::IntVector;
    type CompactVectorLog = PackedLog<Entry<(u32, u32), Self>>;

    route_vector!(int_vectors);
}

impl VectorValue for f64 {
    const VECTOR_KIND: StoreKind = StoreKind::DoubleVector;
    type CompactVectorLog = PackedLog<Entry<(u32, u32), Self>>;

    route_vector!(double_vectors);
}
