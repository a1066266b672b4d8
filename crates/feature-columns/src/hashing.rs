//! Deterministic string hashing for categorical bucket assignment.
//!
//! Bucket ids are assigned with the formula
//!
//! ```text
//! bucket(value) = fingerprint64(text(value)) % num_buckets
//! ```
//!
//! where `text` is the UTF-8 string itself, or the decimal representation for
//! integer values, and `fingerprint64` is FarmHash's 64-bit fingerprint
//! (the `farmhashna` variant). The fingerprint is fixed across platforms and
//! releases, so the ids are reproducible bit-for-bit by any implementation of
//! the same function.

const K0: u64 = 0xc3a5_c85c_97cb_3127;
const K1: u64 = 0xb492_b66f_be98_f273;
const K2: u64 = 0x9ae1_6a3b_2f90_404f;

#[inline]
fn fetch64(s: &[u8], i: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&s[i..i + 8]);
    u64::from_le_bytes(buf)
}

#[inline]
fn fetch32(s: &[u8], i: usize) -> u64 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&s[i..i + 4]);
    u64::from(u32::from_le_bytes(buf))
}

#[inline]
fn shift_mix(v: u64) -> u64 {
    v ^ (v >> 47)
}

#[inline]
fn hash_len_16(u: u64, v: u64, mul: u64) -> u64 {
    let mut a = (u ^ v).wrapping_mul(mul);
    a ^= a >> 47;
    let mut b = (v ^ a).wrapping_mul(mul);
    b ^= b >> 47;
    b.wrapping_mul(mul)
}

fn hash_len_0_to_16(s: &[u8]) -> u64 {
    let len = s.len();
    if len >= 8 {
        let mul = K2.wrapping_add(len as u64 * 2);
        let a = fetch64(s, 0).wrapping_add(K2);
        let b = fetch64(s, len - 8);
        let c = b.rotate_right(37).wrapping_mul(mul).wrapping_add(a);
        let d = a.rotate_right(25).wrapping_add(b).wrapping_mul(mul);
        return hash_len_16(c, d, mul);
    }
    if len >= 4 {
        let mul = K2.wrapping_add(len as u64 * 2);
        let a = fetch32(s, 0);
        return hash_len_16((len as u64).wrapping_add(a << 3), fetch32(s, len - 4), mul);
    }
    if len > 0 {
        let a = u32::from(s[0]);
        let b = u32::from(s[len >> 1]);
        let c = u32::from(s[len - 1]);
        let y = a.wrapping_add(b << 8);
        let z = (len as u32).wrapping_add(c << 2);
        return shift_mix(u64::from(y).wrapping_mul(K2) ^ u64::from(z).wrapping_mul(K0)).wrapping_mul(K2);
    }
    K2
}

fn hash_len_17_to_32(s: &[u8]) -> u64 {
    let len = s.len();
    let mul = K2.wrapping_add(len as u64 * 2);
    let a = fetch64(s, 0).wrapping_mul(K1);
    let b = fetch64(s, 8);
    let c = fetch64(s, len - 8).wrapping_mul(mul);
    let d = fetch64(s, len - 16).wrapping_mul(K2);
    hash_len_16(
        a.wrapping_add(b)
            .rotate_right(43)
            .wrapping_add(c.rotate_right(30))
            .wrapping_add(d),
        a.wrapping_add(b.wrapping_add(K2).rotate_right(18)).wrapping_add(c),
        mul,
    )
}

fn hash_len_33_to_64(s: &[u8]) -> u64 {
    let len = s.len();
    let mul = K2.wrapping_add(len as u64 * 2);
    let a = fetch64(s, 0).wrapping_mul(K2);
    let b = fetch64(s, 8);
    let c = fetch64(s, len - 8).wrapping_mul(mul);
    let d = fetch64(s, len - 16).wrapping_mul(K2);
    let y = a
        .wrapping_add(b)
        .rotate_right(43)
        .wrapping_add(c.rotate_right(30))
        .wrapping_add(d);
    let z = hash_len_16(y, a.wrapping_add(b.wrapping_add(K2).rotate_right(18)).wrapping_add(c), mul);
    let e = fetch64(s, 16).wrapping_mul(mul);
    let f = fetch64(s, 24);
    let g = y.wrapping_add(fetch64(s, len - 32)).wrapping_mul(mul);
    let h = z.wrapping_add(fetch64(s, len - 24)).wrapping_mul(mul);
    hash_len_16(
        e.wrapping_add(f)
            .rotate_right(43)
            .wrapping_add(g.rotate_right(30))
            .wrapping_add(h),
        e.wrapping_add(f.wrapping_add(a).rotate_right(18)).wrapping_add(g),
        mul,
    )
}

#[inline]
fn weak_hash_len_32_with_seeds(s: &[u8], i: usize, mut a: u64, mut b: u64) -> (u64, u64) {
    let w = fetch64(s, i);
    let x = fetch64(s, i + 8);
    let y = fetch64(s, i + 16);
    let z = fetch64(s, i + 24);
    a = a.wrapping_add(w);
    b = b.wrapping_add(a).wrapping_add(z).rotate_right(21);
    let c = a;
    a = a.wrapping_add(x).wrapping_add(y);
    b = b.wrapping_add(a.rotate_right(44));
    (a.wrapping_add(z), b.wrapping_add(c))
}

/// FarmHash 64-bit fingerprint of `s`.
pub fn fingerprint64(s: &[u8]) -> u64 {
    let len = s.len();
    if len <= 16 {
        return hash_len_0_to_16(s);
    }
    if len <= 32 {
        return hash_len_17_to_32(s);
    }
    if len <= 64 {
        return hash_len_33_to_64(s);
    }

    const SEED: u64 = 81;
    let mut x = SEED;
    let mut y = SEED.wrapping_mul(K1).wrapping_add(113);
    let mut z = shift_mix(y.wrapping_mul(K2).wrapping_add(113)).wrapping_mul(K2);
    let mut v = (0u64, 0u64);
    let mut w = (0u64, 0u64);
    x = x.wrapping_mul(K2).wrapping_add(fetch64(s, 0));

    let end = ((len - 1) / 64) * 64;
    let last64 = end + ((len - 1) & 63) - 63;
    let mut p = 0;
    loop {
        x = x
            .wrapping_add(y)
            .wrapping_add(v.0)
            .wrapping_add(fetch64(s, p + 8))
            .rotate_right(37)
            .wrapping_mul(K1);
        y = y
            .wrapping_add(v.1)
            .wrapping_add(fetch64(s, p + 48))
            .rotate_right(42)
            .wrapping_mul(K1);
        x ^= w.1;
        y = y.wrapping_add(v.0).wrapping_add(fetch64(s, p + 40));
        z = z.wrapping_add(w.0).rotate_right(33).wrapping_mul(K1);
        v = weak_hash_len_32_with_seeds(s, p, v.1.wrapping_mul(K1), x.wrapping_add(w.0));
        w = weak_hash_len_32_with_seeds(s, p + 32, z.wrapping_add(w.1), y.wrapping_add(fetch64(s, p + 16)));
        std::mem::swap(&mut z, &mut x);
        p += 64;
        if p == end {
            break;
        }
    }

    let mul = K1.wrapping_add((z & 0xff) << 1);
    p = last64;
    w.0 = w.0.wrapping_add(((len - 1) & 63) as u64);
    v.0 = v.0.wrapping_add(w.0);
    w.0 = w.0.wrapping_add(v.0);
    x = x
        .wrapping_add(y)
        .wrapping_add(v.0)
        .wrapping_add(fetch64(s, p + 8))
        .rotate_right(37)
        .wrapping_mul(mul);
    y = y
        .wrapping_add(v.1)
        .wrapping_add(fetch64(s, p + 48))
        .rotate_right(42)
        .wrapping_mul(mul);
    x ^= w.1.wrapping_mul(9);
    y = y
        .wrapping_add(v.0.wrapping_mul(9))
        .wrapping_add(fetch64(s, p + 40));
    z = z.wrapping_add(w.0).rotate_right(33).wrapping_mul(mul);
    v = weak_hash_len_32_with_seeds(s, p, v.1.wrapping_mul(mul), x.wrapping_add(w.0));
    w = weak_hash_len_32_with_seeds(s, p + 32, z.wrapping_add(w.1), y.wrapping_add(fetch64(s, p + 16)));
    std::mem::swap(&mut z, &mut x);
    hash_len_16(
        hash_len_16(v.0, w.0, mul)
            .wrapping_add(shift_mix(y).wrapping_mul(K0))
            .wrapping_add(z),
        hash_len_16(v.1, w.1, mul).wrapping_add(x),
        mul,
    )
}

/// Bucket of a string value in `[0, num_buckets)`.
///
/// `num_buckets` must be at least 1; columns validate this at construction.
#[inline]
pub fn string_bucket(value: &str, num_buckets: u64) -> u64 {
    debug_assert!(num_buckets > 0);
    fingerprint64(value.as_bytes()) % num_buckets
}

/// Bucket of an integer value: the decimal text of the value is hashed.
#[inline]
pub fn int_bucket(value: i64, num_buckets: u64) -> u64 {
    string_bucket(&value.to_string(), num_buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_input_is_k2() {
        assert_eq!(fingerprint64(b""), K2);
    }

    #[test]
    fn single_byte_fingerprint() {
        assert_eq!(fingerprint64(b"a"), 0xb345_4265_b6df_75e3);
    }

    #[rstest]
    #[case("omar", 10, 6)]
    #[case("stringer", 10, 4)]
    #[case("marlo", 10, 1)]
    #[case("omar", 4, 2)]
    #[case("stringer", 4, 0)]
    #[case("marlo", 4, 3)]
    #[case("skywalker", 4, 2)]
    fn string_buckets_match_fixture(#[case] value: &str, #[case] buckets: u64, #[case] expected: u64) {
        assert_eq!(string_bucket(value, buckets), expected);
    }

    #[rstest]
    #[case(101, 3)]
    #[case(201, 7)]
    #[case(301, 5)]
    fn int_buckets_hash_decimal_text(#[case] value: i64, #[case] expected: u64) {
        assert_eq!(int_bucket(value, 10), expected);
    }

    #[test]
    fn fingerprints_of_longer_inputs() {
        assert_eq!(fingerprint64(b"abcdefghijklmnopqrst"), 0x65fe_d21c_0de0_497e);
        assert_eq!(fingerprint64(b"hello world, this is a longer string"), 0xecae_dcf6_d960_3114);
        assert_eq!(fingerprint64(&[b'x'; 100]), 0x5b76_16b8_5456_8a1f);
        let bytes: Vec<u8> = (0..200u8).collect();
        assert_eq!(fingerprint64(&bytes), 0x074c_7fcc_26d6_6fb3);
    }

    #[test]
    fn fingerprints_at_block_multiples() {
        // Inputs that are an exact multiple of 64 bytes run the block loop
        // one fewer time than their length suggests.
        let bytes: Vec<u8> = (0..128u8).collect();
        assert_eq!(fingerprint64(&bytes), 0x1c48_4c95_f0ea_5dd3);
        assert_eq!(fingerprint64(&[b'x'; 128]), 0x5170_af09_fd87_0c17);
    }

    #[test]
    fn long_inputs_are_deterministic_and_distinct() {
        let long_a = vec![b'x'; 100];
        let mut long_b = long_a.clone();
        long_b[99] = b'y';
        assert_eq!(fingerprint64(&long_a), fingerprint64(&long_a.clone()));
        assert_ne!(fingerprint64(&long_a), fingerprint64(&long_b));

        let mid = b"hello world, this is a longer string";
        assert_eq!(fingerprint64(mid), fingerprint64(mid));
    }
}
