/// Declares one or more id newtypes over a scalar:
///
/// ```ignore
/// define_id_type!(i64 => UserId, PetId);
/// ```
///
/// Each type is `Copy`, ordered and hashable, serializes as the bare scalar,
/// parses from a string and converts to and from the scalar.
#[macro_export]
macro_rules! define_id_type {
    ($inner:ty => $($name:ident),+ $(,)?) => {
        $(
            #[derive(
                Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
                serde::Serialize, serde::Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub $inner);

            impl $name {
                pub const fn new(value: $inner) -> Self {
                    Self(value)
                }

                pub const fn value(&self) -> $inner {
                    self.0
                }
            }

            impl ::std::fmt::Display for $name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    ::std::fmt::Display::fmt(&self.0, f)
                }
            }

            impl ::std::str::FromStr for $name {
                type Err = <$inner as ::std::str::FromStr>::Err;

                fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                    s.trim().parse::<$inner>().map(Self)
                }
            }

            impl ::std::convert::From<$inner> for $name {
                fn from(value: $inner) -> Self {
                    Self(value)
                }
            }

            impl ::std::convert::From<$name> for $inner {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}
