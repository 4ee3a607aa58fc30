//! A cryptographic suite for the STB 34.101 family of standards
//!
//! This library implements the Belarusian state cryptographic standards: the
//! `belt` block cipher and its modes of operation (STB 34.101.31), the `bign`
//! elliptic-curve signature, key transport and identity-based signature
//! algorithms (STB 34.101.45), the `bake` authenticated key establishment
//! protocols (STB 34.101.66), the `bash` sponge family (STB 34.101.77) and
//! the `btok` smart-token layer (STB 34.101.79) with CV certificates and
//! APDU secure messaging.
//!
//! The modules are layered the way the standards reference one another:
//! multi-precision words ([`ww`]) carry the prime field ([`gfp`]), the field
//! carries the curve engine ([`ec`]), and the curve engine together with the
//! [`belt`] primitives carries [`bign`], [`bake`] and [`btok`]. Pseudorandom
//! generation ([`brng`]) and DER encoding ([`der`]) sit to the side.
//!
//! # Randomness
//!
//! Every randomized operation takes an exclusive reference to an [`Entropy`]
//! source. Any [`rand_core`] generator that is both `RngCore` and `CryptoRng`
//! satisfies the contract, as do the generators in [`brng`]. A process-wide
//! convenience generator is available through [`brng::global`]; note that all
//! sessions sharing it serialize on its lock, so a blocking entropy source
//! blocks them all.
//!
//! # Secrets
//!
//! Private keys, one-time scalars and derived session keys are zeroized when
//! their owning values are dropped. Comparisons over secret data are
//! timing-safe.

pub mod error;
pub mod util;
pub mod ww;
pub mod gfp;
pub mod ec;
pub mod belt;
pub mod bash;
pub mod brng;
pub mod der;
pub mod bign;
pub mod bake;
pub mod btok;

pub use error::Error;

/// Shorthand for results produced by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Contract for an external producer of random octets.
///
/// The library never seeds entropy itself; callers inject a generator into
/// each randomized operation. Failure of the underlying producer surfaces as
/// [`Error::BadRng`].
pub trait Entropy {
    /// Fill `buf` with fresh random octets.
    fn fill(&mut self, buf: &mut [u8]) -> Result<()>;
}

impl<T> Entropy for T
where
    T: rand_core::RngCore + rand_core::CryptoRng,
{
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.try_fill_bytes(buf).map_err(|_| Error::BadRng)
    }
}
