//! Integer handles. None of them carry a generation: ids are never reused by a store.

use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Default)]
        pub struct $name(pub $inner);
        impl From<$inner> for $name {
            fn from(a: $inner) -> Self {
                Self(a)
            }
        }
        impl From<$name> for $inner {
            fn from(a: $name) -> Self {
                a.0
            }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Caller-chosen id of a source mesh.
    MeshId(u64)
);
id_type!(
    /// Id of a cached `FractureData` template. `0` is never issued.
    FractureId(u64)
);
id_type!(
    /// Id of a placed destructible. `0` is the "no instance" sentinel.
    InstanceId(u64)
);
id_type!(CellId(u32));
id_type!(PieceId(u32));
id_type!(ClusterId(u32));

impl FractureId {
    pub const NONE: FractureId = FractureId(0);
}

impl InstanceId {
    pub const NONE: InstanceId = InstanceId(0);
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

// Cells, pieces and leaf clusters share an index space.
impl CellId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
impl PieceId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
impl ClusterId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<CellId> for PieceId {
    fn from(c: CellId) -> Self {
        PieceId(c.0)
    }
}
impl From<PieceId> for CellId {
    fn from(p: PieceId) -> Self {
        CellId(p.0)
    }
}
