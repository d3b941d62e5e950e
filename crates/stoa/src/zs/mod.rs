//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Zero-suppression vectors: compressed sequences of `u32`.
//!
//! All codecs share one surface: `len`, random `get`, a forward iterator,
//! a stateful decoder that is cheaper for sequential or clustered access,
//! and a bulk `decode` into a plain `Vec<u32>`.

mod bp128;
mod fixed;

pub use bp128::{Bp128Decoder, Bp128Iter, SimdBp128Vector};
pub use fixed::{FixedIter, FixedSizeVector, FixedWidth};

/// Physical form of a zero-suppression vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZsType {
    /// One byte per element.
    Fixed1,
    /// Two bytes per element.
    Fixed2,
    /// Four bytes per element.
    Fixed4,
    /// 128-integer blocks packed at per-block bit widths.
    SimdBp128,
}

impl ZsType {
    /// The narrowest byte-aligned form whose range covers `max`.
    pub fn fixed_for_max(max: u32) -> ZsType {
        if max <= u8::MAX as u32 {
            ZsType::Fixed1
        } else if max <= u16::MAX as u32 {
            ZsType::Fixed2
        } else {
            ZsType::Fixed4
        }
    }
}

/// A compressed `u32` sequence, dispatched by `ZsType`.
#[derive(Debug, Clone)]
pub enum ZsVector {
    Fixed1(FixedSizeVector<u8>),
    Fixed2(FixedSizeVector<u16>),
    Fixed4(FixedSizeVector<u32>),
    SimdBp128(SimdBp128Vector),
}

impl ZsVector {
    pub fn encode(values: &[u32], zs_type: ZsType) -> ZsVector {
        match zs_type {
            ZsType::Fixed1 => ZsVector::Fixed1(FixedSizeVector::encode(values)),
            ZsType::Fixed2 => ZsVector::Fixed2(FixedSizeVector::encode(values)),
            ZsType::Fixed4 => ZsVector::Fixed4(FixedSizeVector::encode(values)),
            ZsType::SimdBp128 => ZsVector::SimdBp128(SimdBp128Vector::encode(values)),
        }
    }

    pub fn zs_type(&self) -> ZsType {
        match self {
            ZsVector::Fixed1(_) => ZsType::Fixed1,
            ZsVector::Fixed2(_) => ZsType::Fixed2,
            ZsVector::Fixed4(_) => ZsType::Fixed4,
            ZsVector::SimdBp128(_) => ZsType::SimdBp128,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ZsVector::Fixed1(v) => v.len(),
            ZsVector::Fixed2(v) => v.len(),
            ZsVector::Fixed4(v) => v.len(),
            ZsVector::SimdBp128(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> u32 {
        match self {
            ZsVector::Fixed1(v) => v.get(index),
            ZsVector::Fixed2(v) => v.get(index),
            ZsVector::Fixed4(v) => v.get(index),
            ZsVector::SimdBp128(v) => v.get(index),
        }
    }

    pub fn iter(&self) -> ZsIter<'_> {
        match self {
            ZsVector::Fixed1(v) => ZsIter::Fixed1(v.iter()),
            ZsVector::Fixed2(v) => ZsIter::Fixed2(v.iter()),
            ZsVector::Fixed4(v) => ZsIter::Fixed4(v.iter()),
            ZsVector::SimdBp128(v) => ZsIter::SimdBp128(v.iter()),
        }
    }

    pub fn decoder(&self) -> ZsDecoder<'_> {
        match self {
            ZsVector::Fixed1(v) => ZsDecoder::Fixed1(v),
            ZsVector::Fixed2(v) => ZsDecoder::Fixed2(v),
            ZsVector::Fixed4(v) => ZsDecoder::Fixed4(v),
            ZsVector::SimdBp128(v) => ZsDecoder::SimdBp128(v.decoder()),
        }
    }

    /// Materialize the whole sequence.
    pub fn decode(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

/// Forward iterator over any zero-suppression vector.
pub enum ZsIter<'a> {
    Fixed1(FixedIter<'a, u8>),
    Fixed2(FixedIter<'a, u16>),
    Fixed4(FixedIter<'a, u32>),
    SimdBp128(Bp128Iter<'a>),
}

impl Iterator for ZsIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        match self {
            ZsIter::Fixed1(it) => it.next(),
            ZsIter::Fixed2(it) => it.next(),
            ZsIter::Fixed4(it) => it.next(),
            ZsIter::SimdBp128(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            ZsIter::Fixed1(it) => it.size_hint(),
            ZsIter::Fixed2(it) => it.size_hint(),
            ZsIter::Fixed4(it) => it.size_hint(),
            ZsIter::SimdBp128(it) => it.size_hint(),
        }
    }
}

/// Stateful decoder. For the fixed forms this is a plain passthrough; for
/// SIMD-BP128 it caches the most recently unpacked block.
pub enum ZsDecoder<'a> {
    Fixed1(&'a FixedSizeVector<u8>),
    Fixed2(&'a FixedSizeVector<u16>),
    Fixed4(&'a FixedSizeVector<u32>),
    SimdBp128(Bp128Decoder<'a>),
}

impl ZsDecoder<'_> {
    pub fn get(&mut self, index: usize) -> u32 {
        match self {
            ZsDecoder::Fixed1(v) => v.get(index),
            ZsDecoder::Fixed2(v) => v.get(index),
            ZsDecoder::Fixed4(v) => v.get(index),
            ZsDecoder::SimdBp128(d) => d.get(index),
        }
    }
}
