//! Key contract: how a key type exposes its bits to the trie.
//!
//! Keys are treated as infinite bit-strings, zero-padded past their declared
//! length. Bit `0` is the most significant bit of the first byte, so the
//! in-order walk of a trie visits keys in lexicographic order of their
//! big-endian bit sequence.

/// Result of comparing two keys bit by bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitDiff {
    /// Lowest bit index at which the keys differ.
    At(usize),
    /// The keys carry the same bits (including any zero padding).
    Equal,
    /// Both keys reduce to all-zero bits.
    Null,
}

impl BitDiff {
    /// The differing bit, or `None` when the keys are indistinguishable.
    #[inline]
    pub fn bit(self) -> Option<usize> {
        match self {
            BitDiff::At(bit) => Some(bit),
            BitDiff::Equal | BitDiff::Null => None,
        }
    }

    /// `true` for both [`BitDiff::Equal`] and [`BitDiff::Null`].
    #[inline]
    pub fn is_equal(self) -> bool {
        self.bit().is_none()
    }
}

/// Bit-level view of a key type.
///
/// Implementations must be consistent with each other: `is_bit_set` must agree
/// with `first_differing_bit`, and `is_prefix(k, p)` must hold exactly when the
/// first `bit_length(p)` bits of `k` equal those of `p`.
pub trait KeyAnalyzer<K: ?Sized> {
    /// Number of addressable bits in `key`.
    fn bit_length(&self, key: &K) -> usize;

    /// Bit `bit` of `key`; `false` for any index past [`bit_length`](Self::bit_length).
    fn is_bit_set(&self, key: &K, bit: usize) -> bool;

    /// Lowest bit index where `a` and `b` differ.
    fn first_differing_bit(&self, a: &K, b: &K) -> BitDiff;

    /// Whether `key` starts with every bit of `prefix`.
    fn is_prefix(&self, key: &K, prefix: &K) -> bool;
}

// =============================================================================
// Byte strings
// =============================================================================

/// Analyzer for byte-string keys: `str`, `String`, `[u8]`, `Vec<u8>`, ...
///
/// Keys that differ only by trailing `0x00` bytes are indistinguishable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteAnalyzer;

/// Bit index within its byte, where `0` is the MSB and `7` is the LSB.
#[inline]
fn bit_in_byte_msb0(bit: usize) -> u32 {
    (bit % 8) as u32
}

impl<K: AsRef<[u8]> + ?Sized> KeyAnalyzer<K> for ByteAnalyzer {
    #[inline]
    fn bit_length(&self, key: &K) -> usize {
        key.as_ref().len() * 8
    }

    #[inline]
    fn is_bit_set(&self, key: &K, bit: usize) -> bool {
        match key.as_ref().get(bit / 8) {
            Some(byte) => (byte << bit_in_byte_msb0(bit)) & 0x80 != 0,
            None => false,
        }
    }

    fn first_differing_bit(&self, a: &K, b: &K) -> BitDiff {
        let (a, b) = (a.as_ref(), b.as_ref());
        let len = a.len().max(b.len());

        let mut all_zero = true;
        for i in 0..len {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            if x != y {
                return BitDiff::At(i * 8 + (x ^ y).leading_zeros() as usize);
            }
            if x != 0 {
                all_zero = false;
            }
        }

        if all_zero {
            BitDiff::Null
        } else {
            BitDiff::Equal
        }
    }

    fn is_prefix(&self, key: &K, prefix: &K) -> bool {
        let (key, prefix) = (key.as_ref(), prefix.as_ref());
        let shared = key.len().min(prefix.len());
        key[..shared] == prefix[..shared] && prefix[shared..].iter().all(|&b| b == 0)
    }
}

// =============================================================================
// Fixed-width integers
// =============================================================================

/// Unsigned integers usable with [`IntAnalyzer`].
pub trait FixedWidth: Copy {
    /// Width of the integer in bits.
    const BITS: u32;

    /// Zero-extends the value to 128 bits.
    fn widen(self) -> u128;
}

macro_rules! impl_fixed_width {
    ($($t:ty),*) => {
        $(
            impl FixedWidth for $t {
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn widen(self) -> u128 {
                    self as u128
                }
            }
        )*
    };
}

impl_fixed_width!(u8, u16, u32, u64, u128, usize);

/// Analyzer for unsigned integers, big-endian, so trie order is numeric order.
///
/// Every key has the full width of its type, which makes `is_prefix` an
/// equality test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntAnalyzer;

impl<K: FixedWidth> KeyAnalyzer<K> for IntAnalyzer {
    #[inline]
    fn bit_length(&self, _key: &K) -> usize {
        K::BITS as usize
    }

    #[inline]
    fn is_bit_set(&self, key: &K, bit: usize) -> bool {
        if bit >= K::BITS as usize {
            return false;
        }
        (key.widen() >> (K::BITS as usize - 1 - bit)) & 1 == 1
    }

    fn first_differing_bit(&self, a: &K, b: &K) -> BitDiff {
        let (a, b) = (a.widen(), b.widen());
        let x = a ^ b;
        if x == 0 {
            return if a == 0 { BitDiff::Null } else { BitDiff::Equal };
        }
        BitDiff::At((x.leading_zeros() - (128 - K::BITS)) as usize)
    }

    #[inline]
    fn is_prefix(&self, key: &K, prefix: &K) -> bool {
        key.widen() == prefix.widen()
    }
}
