//! Typed integer ids.
//!
//! Every id is a thin wrapper around the SQLite rowid of its table. The raw
//! value `0` never names a row and is used as "unset".

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> i64 {
                self.0
            }

            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(
    /// A file, or a directory through its `"."` pseudo file.
    SourceId
);
typed_id!(
    /// A directory path.
    SourceContextId
);
typed_id!(ModuleId);
typed_id!(TypeId);
typed_id!(
    /// A named scope of directories and qmltypes files. The default scope is
    /// `0`, which is valid here even though it has no row; negative values
    /// are rejected by the updater.
    ProjectPartId
);

impl ProjectPartId {
    pub const DEFAULT: Self = Self(0);

    pub const fn is_valid_scope(self) -> bool {
        self.0 >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(!SourceId::default().is_valid());
        assert!(SourceId::new(4).is_valid());
        assert!(!ModuleId::new(-1).is_valid());
        assert!(ProjectPartId::DEFAULT.is_valid_scope());
        assert!(!ProjectPartId::new(-3).is_valid_scope());
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeId::new(42).to_string(), "42");
    }
}
