/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! Utilities for serializing memory as base64 strings or just bytes in binary serializers.
use core::fmt;
use std::borrow::Cow;
use std::convert::TryInto;

use ::serde::{
    Serialize, Serializer, Deserialize, Deserializer,
    de::{self, Visitor}
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Serializes a boxed byte array as a base64 string for human-readable
/// serializers and as raw bytes otherwise.
pub fn serialize_bank<S, const LEN: usize>(bank: &Box<[u8; LEN]>, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer
{
    serialize_slice(&bank[..], serializer)
}

/// Deserializes a boxed byte array written by [serialize_bank].
///
/// The encoded data must decode to exactly `LEN` bytes.
pub fn deserialize_bank<'de, D, const LEN: usize>(deserializer: D) -> Result<Box<[u8; LEN]>, D::Error>
    where D: Deserializer<'de>
{
    boxed_from_vec(deserialize_vec(deserializer)?)
}

/// Serializes an array of boxed byte arrays, each bank encoded as with
/// [serialize_bank].
pub fn serialize_banks<S, const LEN: usize, const N: usize>(
        banks: &[Box<[u8; LEN]>; N],
        serializer: S
    ) -> Result<S::Ok, S::Error>
    where S: Serializer
{
    let mut refs: [BankSlice; N] = [BankSlice(&[]); N];
    for (dst, bank) in refs.iter_mut().zip(banks.iter()) {
        *dst = BankSlice(&bank[..]);
    }
    refs.serialize(serializer)
}

/// Deserializes an array of boxed byte arrays written by [serialize_banks].
pub fn deserialize_banks<'de, D, const LEN: usize, const N: usize>(
        deserializer: D
    ) -> Result<[Box<[u8; LEN]>; N], D::Error>
    where D: Deserializer<'de>
{
    struct BanksVisitor<const LEN: usize, const N: usize>;

    impl<'de, const LEN: usize, const N: usize> Visitor<'de> for BanksVisitor<LEN, N> {
        type Value = [Box<[u8; LEN]>; N];

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "an array of {} memory banks", N)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where A: de::SeqAccess<'de>
        {
            let mut res: [Box<[u8; LEN]>; N] = core::array::from_fn(|_| Box::new([0u8; LEN]));
            for (index, bank) in res.iter_mut().enumerate() {
                match seq.next_element::<BankVec>()? {
                    Some(vec) => *bank = boxed_from_vec(vec.0)?,
                    None => return Err(de::Error::invalid_length(index, &self))
                }
            }
            Ok(res)
        }
    }

    deserializer.deserialize_seq(BanksVisitor::<LEN, N>)
}

fn serialize_slice<S: Serializer>(slice: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&BASE64.encode(slice))
    }
    else {
        serializer.serialize_bytes(slice)
    }
}

fn deserialize_vec<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where D: Deserializer<'de>
{
    if deserializer.is_human_readable() {
        Deserialize::deserialize(deserializer).and_then(|string: Cow<str>|
            BASE64.decode(&*string).map_err(de::Error::custom)
        )
    }
    else {
        deserializer.deserialize_byte_buf(ByteBufVisitor)
    }
}

fn boxed_from_vec<E, const LEN: usize>(buf: Vec<u8>) -> Result<Box<[u8; LEN]>, E>
    where E: de::Error
{
    let len = buf.len();
    buf.into_boxed_slice().try_into().map_err(|_|
        E::custom(format!("failed to deserialize {} bytes of memory, got {}", LEN, len))
    )
}

struct BankSlice<'a>(&'a [u8]);

impl<'a> Clone for BankSlice<'a> {
    fn clone(&self) -> Self { *self }
}

impl<'a> Copy for BankSlice<'a> {}

impl<'a> Serialize for BankSlice<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_slice(self.0, serializer)
    }
}

struct BankVec(Vec<u8>);

impl<'de> Deserialize<'de> for BankVec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<BankVec, D::Error> {
        deserialize_vec(deserializer).map(BankVec)
    }
}

struct ByteBufVisitor;

impl<'de> Visitor<'de> for ByteBufVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "bytes")
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(v.to_vec())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where A: de::SeqAccess<'de>
    {
        let mut res = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element()? {
            res.push(byte);
        }
        Ok(res)
    }
}
