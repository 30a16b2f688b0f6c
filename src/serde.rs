//! [`serde`](https://serde.rs/) support.
//!
//! This module is optionally compiled if the `with-serde` feature is enabled (which is the
//! default). [`KeyHash`] and [`Key`] are serialized as though they were variants of a single
//! enum, so a reader can tell which one it is looking at. Metadata types ([`KeyMetadata`],
//! [`KeyVersion`], and their enums) derive their implementations directly.
//!
//! Both types serialize as bytes if the serializer is not marked as human-readable. If it is,
//! `KeyHash` serializes as a base58 string and `Key` as a standard base64 string of its encoded
//! key material.
//!
//! Serializing a `Key` writes out secret key material. Treat the output accordingly.
//!
//! [`KeyMetadata`]: crate::metadata::KeyMetadata
//! [`KeyVersion`]: crate::metadata::KeyVersion

/// Name marker used for the library's fictional enum type
pub const KEYSET_TYPE_ENUM: &str = "_KeysetType";
/// Enum variant name for [`KeyHash`]
pub const KEYSET_TYPE_ENUM_KEY_HASH_NAME: &str = "KeyHash";
/// Enum variant name for [`Key`]
pub const KEYSET_TYPE_ENUM_KEY_NAME: &str = "Key";

/// Enum variant index for [`KeyHash`]
pub const KEYSET_TYPE_ENUM_KEY_HASH_INDEX: u64 = 1;
/// Enum variant index for [`Key`]
pub const KEYSET_TYPE_ENUM_KEY_INDEX: u64 = 2;

const VARIANTS: &[&str] = &[KEYSET_TYPE_ENUM_KEY_HASH_NAME, KEYSET_TYPE_ENUM_KEY_NAME];

use crate::{hash::KeyHash, key::Key};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{
    de::{Deserialize, Deserializer, EnumAccess, Error, Unexpected, VariantAccess, Visitor},
    ser::{Serialize, Serializer},
};
use serde_bytes::{ByteBuf, Bytes};
use zeroize::Zeroize;

use std::{convert::TryFrom, fmt};

impl Serialize for KeyHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            let value = self.to_base58();
            serializer.serialize_newtype_variant(
                KEYSET_TYPE_ENUM,
                KEYSET_TYPE_ENUM_KEY_HASH_INDEX as u32,
                KEYSET_TYPE_ENUM_KEY_HASH_NAME,
                &value,
            )
        } else {
            let value = Bytes::new(self.as_ref());
            serializer.serialize_newtype_variant(
                KEYSET_TYPE_ENUM,
                KEYSET_TYPE_ENUM_KEY_HASH_INDEX as u32,
                KEYSET_TYPE_ENUM_KEY_HASH_NAME,
                value,
            )
        }
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut raw = self.to_vec();
        let result = if serializer.is_human_readable() {
            let mut value = STANDARD.encode(&raw);
            let result = serializer.serialize_newtype_variant(
                KEYSET_TYPE_ENUM,
                KEYSET_TYPE_ENUM_KEY_INDEX as u32,
                KEYSET_TYPE_ENUM_KEY_NAME,
                &value,
            );
            value.zeroize();
            result
        } else {
            serializer.serialize_newtype_variant(
                KEYSET_TYPE_ENUM,
                KEYSET_TYPE_ENUM_KEY_INDEX as u32,
                KEYSET_TYPE_ENUM_KEY_NAME,
                Bytes::new(&raw),
            )
        };
        raw.zeroize();
        result
    }
}

///////////////////////////////////////////////////////////////////////////////
// Deserialization
///////////////////////////////////////////////////////////////////////////////

enum KeysetEnum {
    KeyHash,
    Key,
}

impl KeysetEnum {
    fn as_str(&self) -> &'static str {
        match *self {
            KeysetEnum::KeyHash => KEYSET_TYPE_ENUM_KEY_HASH_NAME,
            KeysetEnum::Key => KEYSET_TYPE_ENUM_KEY_NAME,
        }
    }

    fn from_name<E: Error>(v: &str) -> Result<Self, E> {
        match v {
            KEYSET_TYPE_ENUM_KEY_HASH_NAME => Ok(KeysetEnum::KeyHash),
            KEYSET_TYPE_ENUM_KEY_NAME => Ok(KeysetEnum::Key),
            _ => Err(E::unknown_variant(v, VARIANTS)),
        }
    }
}

struct KeysetEnumVisitor;
impl<'de> Visitor<'de> for KeysetEnumVisitor {
    type Value = KeysetEnum;
    fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "variant identifier")
    }

    fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
        match v {
            KEYSET_TYPE_ENUM_KEY_HASH_INDEX => Ok(KeysetEnum::KeyHash),
            KEYSET_TYPE_ENUM_KEY_INDEX => Ok(KeysetEnum::Key),
            _ => Err(E::invalid_value(
                Unexpected::Unsigned(v),
                &"variant index 1 <= i <= 2",
            )),
        }
    }

    fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
        KeysetEnum::from_name(v)
    }

    fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        let v = std::str::from_utf8(v).map_err(|_| {
            let v = String::from_utf8_lossy(v);
            E::unknown_variant(v.as_ref(), VARIANTS)
        })?;
        KeysetEnum::from_name(v)
    }
}

impl<'de> Deserialize<'de> for KeysetEnum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_identifier(KeysetEnumVisitor)
    }
}

impl<'de> Deserialize<'de> for KeyHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyHashVisitor {
            is_human_readable: bool,
        }

        impl<'de> Visitor<'de> for KeyHashVisitor {
            type Value = KeyHash;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
                write!(
                    fmt,
                    "{} enum with variant {} (id {})",
                    KEYSET_TYPE_ENUM, KEYSET_TYPE_ENUM_KEY_HASH_NAME, KEYSET_TYPE_ENUM_KEY_HASH_INDEX
                )
            }

            fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
            where
                A: EnumAccess<'de>,
            {
                let variant = match data.variant()? {
                    (KeysetEnum::KeyHash, variant) => variant,
                    (e, _) => {
                        return Err(A::Error::invalid_type(
                            Unexpected::Other(e.as_str()),
                            &"KeyHash",
                        ))
                    }
                };
                if self.is_human_readable {
                    let base58: String = variant.newtype_variant()?;
                    KeyHash::from_base58(&base58).map_err(|e| A::Error::custom(e.serde_err()))
                } else {
                    let bytes: ByteBuf = variant.newtype_variant()?;
                    KeyHash::try_from(bytes.as_ref()).map_err(|e| A::Error::custom(e.serde_err()))
                }
            }
        }
        let is_human_readable = deserializer.is_human_readable();
        deserializer.deserialize_enum(
            KEYSET_TYPE_ENUM,
            &[KEYSET_TYPE_ENUM_KEY_HASH_NAME],
            KeyHashVisitor { is_human_readable },
        )
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyVisitor {
            is_human_readable: bool,
        }

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = Key;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
                write!(
                    fmt,
                    "{} enum with variant {} (id {})",
                    KEYSET_TYPE_ENUM, KEYSET_TYPE_ENUM_KEY_NAME, KEYSET_TYPE_ENUM_KEY_INDEX
                )
            }

            fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
            where
                A: EnumAccess<'de>,
            {
                let variant = match data.variant()? {
                    (KeysetEnum::Key, variant) => variant,
                    (e, _) => {
                        return Err(A::Error::invalid_type(
                            Unexpected::Other(e.as_str()),
                            &"Key",
                        ))
                    }
                };
                let mut raw = if self.is_human_readable {
                    let mut base64: String = variant.newtype_variant()?;
                    let raw = STANDARD.decode(&base64);
                    base64.zeroize();
                    raw.map_err(|_| {
                        A::Error::invalid_value(Unexpected::Other("invalid base64"), &"base64 key")
                    })?
                } else {
                    let bytes: ByteBuf = variant.newtype_variant()?;
                    bytes.into_vec()
                };
                let key = Key::try_from(&raw[..]).map_err(|e| A::Error::custom(e.serde_err()));
                raw.zeroize();
                key
            }
        }
        let is_human_readable = deserializer.is_human_readable();
        deserializer.deserialize_enum(
            KEYSET_TYPE_ENUM,
            &[KEYSET_TYPE_ENUM_KEY_NAME],
            KeyVisitor { is_human_readable },
        )
    }
}
