//! XOR-only parity buffer algebra.
//!
//! Every parity in this system — fast local, compact local, or a gateway's
//! relayed sum — is an elementwise XOR over equal-length byte buffers.
//! There is no Reed-Solomon/GF(2^w) math anywhere in this crate (explicit
//! non-goal); the manual word-stride XOR loops in the source are modeled
//! here as a single portable, byte-level contract.

use bytes::Bytes;
use lrc_common::{Error, Result};

/// An opaque fixed-size byte buffer representing one block's contents.
pub type Block = Bytes;

/// XOR two equal-length buffers into a freshly allocated buffer.
pub fn xor(a: &[u8], b: &[u8]) -> Result<Bytes> {
    if a.len() != b.len() {
        return Err(Error::invalid_argument(format!(
            "cannot XOR buffers of different lengths ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    let mut out = vec![0u8; a.len()];
    xor_into(&mut out, a, b)?;
    Ok(Bytes::from(out))
}

/// XOR `a` and `b` into `dst`; all three buffers must share a length.
pub fn xor_into(dst: &mut [u8], a: &[u8], b: &[u8]) -> Result<()> {
    if dst.len() != a.len() || a.len() != b.len() {
        return Err(Error::invalid_argument(
            "xor_into requires dst, a, and b to share one length",
        ));
    }
    for ((d, x), y) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
        *d = x ^ y;
    }
    Ok(())
}

/// XOR a non-empty slice of equal-length buffers together.
pub fn xor_many<'a, I>(buffers: I) -> Result<Bytes>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut iter = buffers.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::invalid_argument("xor_many requires at least one buffer"))?;
    let mut acc = first.to_vec();
    for buf in iter {
        if buf.len() != acc.len() {
            return Err(Error::invalid_argument(
                "xor_many requires all buffers to share one length",
            ));
        }
        for (d, s) in acc.iter_mut().zip(buf.iter()) {
            *d ^= s;
        }
    }
    Ok(Bytes::from(acc))
}

/// Verify that `parity` equals the XOR of `members`.
pub fn verify_parity<'a, I>(parity: &[u8], members: I) -> Result<bool>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let expected = xor_many(members)?;
    Ok(expected.as_ref() == parity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_is_its_own_inverse() {
        let a = vec![0xAA_u8; 16];
        let b = vec![0x55_u8; 16];
        let parity = xor(&a, &b).unwrap();
        let recovered = xor(&parity, &b).unwrap();
        assert_eq!(recovered.as_ref(), a.as_slice());
    }

    #[test]
    fn xor_rejects_mismatched_lengths() {
        assert!(xor(&[1, 2, 3], &[1, 2]).is_err());
    }

    #[test]
    fn xor_many_matches_pairwise_xor() {
        let a = vec![1u8, 2, 3];
        let b = vec![4u8, 5, 6];
        let c = vec![7u8, 8, 9];
        let expected = xor(&xor(&a, &b).unwrap(), &c).unwrap();
        let actual = xor_many([a.as_slice(), b.as_slice(), c.as_slice()]).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn verify_parity_detects_corruption() {
        let a = vec![1u8, 2, 3];
        let b = vec![4u8, 5, 6];
        let parity = xor(&a, &b).unwrap();
        assert!(verify_parity(&parity, [a.as_slice(), b.as_slice()]).unwrap());
        let corrupted = vec![0u8, 0, 0];
        assert!(!verify_parity(&corrupted, [a.as_slice(), b.as_slice()]).unwrap());
    }
}
