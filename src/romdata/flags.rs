//! Small bitmask newtypes.

macro_rules! flags_newtype {
    ($name:ident($repr:ty) # $doc:literal { $($(#[$meta:meta])* $flag:ident = $value:expr;)* }) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl $name {
            pub const NONE: Self = Self(0);
            $($(#[$meta])* pub const $flag: Self = Self($value);)*

            /// True if every bit of `other` is set here.
            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// True if any bit of `other` is set here.
            #[inline]
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            #[inline]
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            #[inline]
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Names of the set flags.
            pub fn names(self) -> Vec<&'static str> {
                let mut out = Vec::new();
                $(if $value != 0 && self.contains(Self::$flag) {
                    out.push(stringify!($flag));
                })*
                out
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }
    };
}

pub(crate) use flags_newtype;
