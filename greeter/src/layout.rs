//! Fixed-width binary layout of records shared with the on-chain program.
//!
//! A record is declared with the [`layout!`](crate::layout!) macro which
//! defines the struct together with its [`Schema`] and the functions encoding
//! it into and decoding it from bytes.  Fields are laid out in declaration
//! order with no padding between them and multi-byte integers use little
//! endian encoding.  This is the same format Borsh uses for structs made of
//! fixed-width fields.
//!
//! The layout is part of the protocol with the on-chain program.  Reordering,
//! adding or removing fields changes the meaning of every existing account
//! with that shape.  Records whose layout may evolve should implement
//! [`Versioned`] and be stored as [`Tagged`].
//!
//! ```
//! use solana_greeter::layout::Layout;
//!
//! solana_greeter::layout! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct Pair {
//!         pub first: u32,
//!         pub second: u32,
//!     }
//! }
//!
//! let pair = Pair { first: 3, second: 77 };
//! let bytes = pair.encode();
//! assert_eq!(&[3, 0, 0, 0, 77, 0, 0, 0][..], bytes.as_slice());
//! assert_eq!(Ok(pair), Pair::decode(&bytes));
//! ```

use solana_program::pubkey::{Pubkey, PUBKEY_BYTES};


/// Error returned when bytes don’t match a record’s layout.
#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum LayoutError {
    /// Buffer length differs from the record’s span.
    #[display("{schema}: expected {expected} bytes, got {actual}")]
    Length { schema: &'static str, expected: usize, actual: usize },

    /// A field’s raw bytes violate the field type’s invariant.
    #[display("{schema}.{field} at offset {offset}: {kind}")]
    Field {
        schema: &'static str,
        field: &'static str,
        offset: usize,
        kind: FieldError,
    },

    /// Version tag of a [`Tagged`] record doesn’t match.
    #[display("{schema}: expected version {expected}, got {actual}")]
    Version { schema: &'static str, expected: u8, actual: u8 },

    /// Record used as instruction arguments encodes to no bytes.
    #[display("{schema}: record encodes to no bytes")]
    Empty { schema: &'static str },
}

impl std::error::Error for LayoutError {}

/// Invariant violation of a single field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum FieldError {
    #[display("invalid bool value {_0}")]
    InvalidBool(u8),
}


/// A type which can be a field of a record.
///
/// Every implementation has a fixed width.  `write` and `read` are always
/// called with a slice exactly [`Field::WIDTH`] bytes long.
pub trait Field: Sized {
    const WIDTH: usize;

    fn write(&self, buf: &mut [u8]);

    fn read(buf: &[u8]) -> Result<Self, FieldError>;
}

macro_rules! impl_int_field {
    ($($ty:ty),*) => {$(
        impl Field for $ty {
            const WIDTH: usize = core::mem::size_of::<$ty>();

            fn write(&self, buf: &mut [u8]) {
                buf.copy_from_slice(&self.to_le_bytes());
            }

            fn read(buf: &[u8]) -> Result<Self, FieldError> {
                let mut bytes = [0; core::mem::size_of::<$ty>()];
                bytes.copy_from_slice(buf);
                Ok(Self::from_le_bytes(bytes))
            }
        }
    )*};
}

impl_int_field!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl Field for bool {
    const WIDTH: usize = 1;

    fn write(&self, buf: &mut [u8]) { buf[0] = u8::from(*self); }

    fn read(buf: &[u8]) -> Result<Self, FieldError> {
        match buf[0] {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(FieldError::InvalidBool(byte)),
        }
    }
}

impl<const N: usize> Field for [u8; N] {
    const WIDTH: usize = N;

    fn write(&self, buf: &mut [u8]) { buf.copy_from_slice(self); }

    fn read(buf: &[u8]) -> Result<Self, FieldError> {
        let mut bytes = [0; N];
        bytes.copy_from_slice(buf);
        Ok(bytes)
    }
}

impl Field for Pubkey {
    const WIDTH: usize = PUBKEY_BYTES;

    fn write(&self, buf: &mut [u8]) { buf.copy_from_slice(self.as_ref()); }

    fn read(buf: &[u8]) -> Result<Self, FieldError> {
        <[u8; PUBKEY_BYTES]>::read(buf).map(Pubkey::new_from_array)
    }
}


/// Description of a single field of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: &'static str,
    pub width: usize,
}

/// Description of a record’s layout: its name and its fields in the order
/// they are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    /// Number of bytes preceding the first field, e.g. a version tag.
    pub prefix: usize,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Returns total length of the encoded record.
    pub const fn span(&self) -> usize {
        let mut span = self.prefix;
        let mut idx = 0;
        while idx < self.fields.len() {
            span += self.fields[idx].width;
            idx += 1;
        }
        span
    }

    /// Returns iterator over fields together with their byte offsets.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, &FieldSpec)> + '_ {
        self.fields.iter().scan(self.prefix, |at, field| {
            let offset = *at;
            *at += field.width;
            Some((offset, field))
        })
    }

    /// Returns byte offset of field with given name.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.offsets()
            .find(|(_, field)| field.name == name)
            .map(|(offset, _)| offset)
    }
}


/// A record with a fixed binary layout.
///
/// Implemented by the [`layout!`](crate::layout!) macro; there’s rarely
/// a reason to implement it by hand.
pub trait Layout: Sized {
    /// Description of the record’s fields.
    const SCHEMA: Schema;

    /// Length of the encoded record in bytes.
    const SPAN: usize = Self::SCHEMA.span();

    /// Writes fields into `buf` which is exactly [`Layout::SPAN`] bytes.
    #[doc(hidden)]
    fn write_fields(&self, buf: &mut [u8]);

    /// Reads fields from `buf` which is exactly [`Layout::SPAN`] bytes.
    #[doc(hidden)]
    fn read_fields(buf: &[u8]) -> Result<Self, LayoutError>;

    /// Encodes the record into a new buffer of [`Layout::SPAN`] bytes.
    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0; Self::SPAN];
        self.write_fields(&mut buf);
        buf
    }

    /// Encodes the record into given buffer.
    ///
    /// Fails if the buffer isn’t exactly [`Layout::SPAN`] bytes long.
    fn encode_into(&self, buf: &mut [u8]) -> Result<(), LayoutError> {
        check_length::<Self>(buf.len())?;
        self.write_fields(buf);
        Ok(())
    }

    /// Decodes the record.
    ///
    /// Fails if `bytes` isn’t exactly [`Layout::SPAN`] bytes long or if any of
    /// the fields holds an invalid value.  Trailing bytes are not ignored.
    fn decode(bytes: &[u8]) -> Result<Self, LayoutError> {
        check_length::<Self>(bytes.len())?;
        Self::read_fields(bytes)
    }
}

fn check_length<T: Layout>(actual: usize) -> Result<(), LayoutError> {
    if actual == T::SPAN {
        Ok(())
    } else {
        Err(LayoutError::Length {
            schema: T::SCHEMA.name,
            expected: T::SPAN,
            actual,
        })
    }
}


/// A record with an explicit layout version.
pub trait Versioned: Layout {
    const VERSION: u8;
}

/// A [`Versioned`] record prefixed with its one-byte version tag.
///
/// [`Layout::SCHEMA`] lists the wrapped record’s fields shifted past the tag.
/// Decoding fails with [`LayoutError::Version`] if the tag doesn’t match
/// `T::VERSION`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tagged<T>(pub T);

impl<T: Versioned> Layout for Tagged<T> {
    const SCHEMA: Schema =
        Schema { prefix: 1 + T::SCHEMA.prefix, ..T::SCHEMA };

    fn write_fields(&self, buf: &mut [u8]) {
        let (tag, rest) = buf.split_at_mut(1);
        tag[0] = T::VERSION;
        self.0.write_fields(rest);
    }

    fn read_fields(buf: &[u8]) -> Result<Self, LayoutError> {
        let (tag, rest) = buf.split_at(1);
        if tag[0] != T::VERSION {
            return Err(LayoutError::Version {
                schema: T::SCHEMA.name,
                expected: T::VERSION,
                actual: tag[0],
            });
        }
        T::read_fields(rest).map(Self).map_err(|err| match err {
            LayoutError::Field { schema, field, offset, kind } => {
                LayoutError::Field { schema, field, offset: offset + 1, kind }
            }
            err => err,
        })
    }
}


/// Declares a record with a fixed binary layout.
///
/// Defines the struct as written and implements [`Layout`] for it.  Every
/// field type must implement [`Field`].
#[macro_export]
macro_rules! layout {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::layout::Layout for $name {
            const SCHEMA: $crate::layout::Schema = $crate::layout::Schema {
                name: ::core::stringify!($name),
                prefix: 0,
                fields: &[$(
                    $crate::layout::FieldSpec {
                        name: ::core::stringify!($field),
                        ty: ::core::stringify!($ty),
                        width: <$ty as $crate::layout::Field>::WIDTH,
                    },
                )*],
            };

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn write_fields(&self, buf: &mut [u8]) {
                let mut at = 0;
                $(
                    let end = at + <$ty as $crate::layout::Field>::WIDTH;
                    $crate::layout::Field::write(&self.$field, &mut buf[at..end]);
                    at = end;
                )*
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn read_fields(
                buf: &[u8],
            ) -> ::core::result::Result<Self, $crate::layout::LayoutError> {
                let mut at = 0;
                $(
                    let end = at + <$ty as $crate::layout::Field>::WIDTH;
                    let $field =
                        <$ty as $crate::layout::Field>::read(&buf[at..end])
                            .map_err(|kind| {
                                $crate::layout::LayoutError::Field {
                                    schema: ::core::stringify!($name),
                                    field: ::core::stringify!($field),
                                    offset: at,
                                    kind,
                                }
                            })?;
                    at = end;
                )*
                ::core::result::Result::Ok(Self { $($field),* })
            }
        }
    };
}
