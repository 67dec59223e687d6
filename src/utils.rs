/// [Szudzik pairing function][szudzik-pairing], wrapping on overflow.
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// [Pairing function][pairing] for two `u64` values.
///
/// [pairing]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Fold a sequence of hashes into one, sensitive to order and length.
pub fn pairing_seq(values: impl IntoIterator<Item = u64>) -> u64 {
    let mut len = 0u64;
    let mut acc = 0u64;
    for v in values {
        acc = pairing2(acc, v);
        len += 1;
    }
    pairing2(acc, len)
}

/// 64-bit FNV-1a over raw bytes, for names and big-integer literals.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |acc, &b| (acc ^ b as u64).wrapping_mul(PRIME))
}

pub trait MyHash {
    /// Hash used for bucket selection in [`Table`][crate::table::Table] and
    /// [`Cache`][crate::cache::Cache]. Must agree with `Eq`.
    fn hash(&self) -> u64;
}
