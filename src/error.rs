//! The error taxonomy shared by every operation in the suite
//!
//! Errors fall into three bands: input/contract violations surfaced before
//! any state change (`BadInput`, `BadLength`, `BadOid`, `BadFormat`),
//! cryptographic failures (`BadParams`, `BadSig`, `BadMac`, `Auth`, ...)
//! after which a protocol session is terminal, and environmental conditions
//! (`BadRng`, `Timeout`, `OutOfMemory`) that propagate from collaborators
//! unchanged.
//!
//! Verification-style operations report `BadSig`, `BadMac`, `BadCert` or
//! `Auth` through the `Err` arm rather than a boolean, so a forgotten check
//! cannot read as success.

use core::fmt;

/// Error codes of the suite.
///
/// The numeric values (see [`Error::into_val`]) are stable and match the
/// tabulated code list; they are what a foreign-function or wire surface
/// would transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Operating system level failure
    Sys,
    /// Wrong device or unit
    BadUnit,
    /// Wrong file
    BadFile,
    /// Function does not apply
    BadFunction,
    /// Unknown or inapplicable command
    BadCommand,
    /// Buffer length violates the operation contract
    BadLength,
    /// Malformed input buffer
    BadInput,
    /// Allocation failed
    OutOfMemory,
    /// Caller may not perform the operation
    AccessDenied,
    /// Collaborator not ready
    NotReady,
    /// Resource busy
    Busy,
    /// Channel or collaborator timed out
    Timeout,
    /// Operation is recognized but not provided
    NotImplemented,
    /// Operation arrived after its window closed
    After,
    /// File could not be opened
    FileOpen,
    /// File could not be created
    FileCreate,
    /// File does not exist
    FileNotFound,
    /// File read failed
    FileRead,
    /// File write failed
    FileWrite,
    /// File size is wrong
    FileSize,
    /// Dotted OID string is lexically invalid or a component overflows
    BadOid,
    /// Entropy source failed a quality check
    BadEntropy,
    /// Random generator failed to produce octets
    BadRng,
    /// Random generator state is unusable
    BadAng,
    /// Octet string does not parse under the expected format
    BadFormat,
    /// Date or time requisite is malformed
    BadTime,
    /// Octets do not decode to a point on the curve
    BadPoint,
    /// Number expected to be prime is not
    NotPrime,
    /// Numbers expected to be coprime are not
    NotCoprime,
    /// Polynomial expected to be irreducible is not
    NotIrred,
    /// Domain parameters are unusable
    BadParams,
    /// Secret octet string is out of range
    BadSecKey,
    /// Private key is out of range
    BadPrivKey,
    /// Public key is not a valid curve point
    BadPubKey,
    /// Certificate failed validation
    BadCert,
    /// Derived shared key failed a consistency check
    BadSharedKey,
    /// Transported key share is inconsistent
    BadShareKey,
    /// Hash value does not match
    BadHash,
    /// Signature does not verify
    BadSig,
    /// Message authentication code does not verify
    BadMac,
    /// Key token failed to unwrap
    BadKeyToken,
    /// Protocol step invoked out of order
    BadLogic,
    /// Password rejected
    BadPwd,
    /// Requested key is absent from the store
    KeyNotFound,
    /// Protocol-level confirmation failed
    Auth,
    /// Certificate requisite name mismatch in a chain
    BadName,
    /// Known-answer self test failed
    SelfTest,
    /// Statistical test failed
    StatTest,
}

impl Error {
    /// The stable numeric value of this code.
    pub fn into_val(self) -> u32 {
        match self {
            Error::Sys => 1,
            Error::BadUnit => 2,
            Error::BadFile => 3,
            Error::BadFunction => 4,
            Error::BadCommand => 5,
            Error::BadLength => 6,
            Error::BadInput => 7,
            Error::OutOfMemory => 8,
            Error::AccessDenied => 9,
            Error::NotReady => 10,
            Error::Busy => 11,
            Error::Timeout => 12,
            Error::NotImplemented => 13,
            Error::After => 14,
            Error::FileOpen => 201,
            Error::FileCreate => 202,
            Error::FileNotFound => 203,
            Error::FileRead => 204,
            Error::FileWrite => 205,
            Error::FileSize => 206,
            Error::BadOid => 301,
            Error::BadEntropy => 302,
            Error::BadRng => 303,
            Error::BadAng => 304,
            Error::BadFormat => 305,
            Error::BadTime => 306,
            Error::BadPoint => 401,
            Error::NotPrime => 402,
            Error::NotCoprime => 403,
            Error::NotIrred => 404,
            Error::BadParams => 405,
            Error::BadSecKey => 406,
            Error::BadPrivKey => 407,
            Error::BadPubKey => 408,
            Error::BadCert => 409,
            Error::BadSharedKey => 410,
            Error::BadShareKey => 411,
            Error::BadHash => 412,
            Error::BadSig => 413,
            Error::BadMac => 414,
            Error::BadKeyToken => 415,
            Error::BadLogic => 416,
            Error::BadPwd => 417,
            Error::KeyNotFound => 418,
            Error::Auth => 419,
            Error::BadName => 420,
            Error::SelfTest => 501,
            Error::StatTest => 502,
        }
    }

    /// Recover a code from its numeric value.
    pub fn try_from_val(val: u32) -> core::result::Result<Self, u32> {
        let code = match val {
            1 => Error::Sys,
            2 => Error::BadUnit,
            3 => Error::BadFile,
            4 => Error::BadFunction,
            5 => Error::BadCommand,
            6 => Error::BadLength,
            7 => Error::BadInput,
            8 => Error::OutOfMemory,
            9 => Error::AccessDenied,
            10 => Error::NotReady,
            11 => Error::Busy,
            12 => Error::Timeout,
            13 => Error::NotImplemented,
            14 => Error::After,
            201 => Error::FileOpen,
            202 => Error::FileCreate,
            203 => Error::FileNotFound,
            204 => Error::FileRead,
            205 => Error::FileWrite,
            206 => Error::FileSize,
            301 => Error::BadOid,
            302 => Error::BadEntropy,
            303 => Error::BadRng,
            304 => Error::BadAng,
            305 => Error::BadFormat,
            306 => Error::BadTime,
            401 => Error::BadPoint,
            402 => Error::NotPrime,
            403 => Error::NotCoprime,
            404 => Error::NotIrred,
            405 => Error::BadParams,
            406 => Error::BadSecKey,
            407 => Error::BadPrivKey,
            408 => Error::BadPubKey,
            409 => Error::BadCert,
            410 => Error::BadSharedKey,
            411 => Error::BadShareKey,
            412 => Error::BadHash,
            413 => Error::BadSig,
            414 => Error::BadMac,
            415 => Error::BadKeyToken,
            416 => Error::BadLogic,
            417 => Error::BadPwd,
            418 => Error::KeyNotFound,
            419 => Error::Auth,
            420 => Error::BadName,
            501 => Error::SelfTest,
            502 => Error::StatTest,
            _ => return Err(val),
        };

        Ok(code)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Sys => write!(f, "operating system failure"),
            Error::BadUnit => write!(f, "wrong device or unit"),
            Error::BadFile => write!(f, "wrong file"),
            Error::BadFunction => write!(f, "function does not apply"),
            Error::BadCommand => write!(f, "unknown command"),
            Error::BadLength => write!(f, "invalid buffer length"),
            Error::BadInput => write!(f, "malformed input"),
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::AccessDenied => write!(f, "access denied"),
            Error::NotReady => write!(f, "not ready"),
            Error::Busy => write!(f, "busy"),
            Error::Timeout => write!(f, "timeout"),
            Error::NotImplemented => write!(f, "not implemented"),
            Error::After => write!(f, "operation window closed"),
            Error::FileOpen => write!(f, "cannot open file"),
            Error::FileCreate => write!(f, "cannot create file"),
            Error::FileNotFound => write!(f, "file not found"),
            Error::FileRead => write!(f, "file read failed"),
            Error::FileWrite => write!(f, "file write failed"),
            Error::FileSize => write!(f, "wrong file size"),
            Error::BadOid => write!(f, "invalid object identifier"),
            Error::BadEntropy => write!(f, "entropy source failed"),
            Error::BadRng => write!(f, "random generator failed"),
            Error::BadAng => write!(f, "random generator state unusable"),
            Error::BadFormat => write!(f, "format violation"),
            Error::BadTime => write!(f, "malformed date or time"),
            Error::BadPoint => write!(f, "octets are not a curve point"),
            Error::NotPrime => write!(f, "number is not prime"),
            Error::NotCoprime => write!(f, "numbers are not coprime"),
            Error::NotIrred => write!(f, "polynomial is not irreducible"),
            Error::BadParams => write!(f, "unusable domain parameters"),
            Error::BadSecKey => write!(f, "secret octets out of range"),
            Error::BadPrivKey => write!(f, "private key out of range"),
            Error::BadPubKey => write!(f, "invalid public key"),
            Error::BadCert => write!(f, "certificate validation failed"),
            Error::BadSharedKey => write!(f, "shared key inconsistent"),
            Error::BadShareKey => write!(f, "key share inconsistent"),
            Error::BadHash => write!(f, "hash mismatch"),
            Error::BadSig => write!(f, "signature does not verify"),
            Error::BadMac => write!(f, "authentication code does not verify"),
            Error::BadKeyToken => write!(f, "key token failed to unwrap"),
            Error::BadLogic => write!(f, "protocol step out of order"),
            Error::BadPwd => write!(f, "password rejected"),
            Error::KeyNotFound => write!(f, "key not found"),
            Error::Auth => write!(f, "authentication failed"),
            Error::BadName => write!(f, "certificate name mismatch"),
            Error::SelfTest => write!(f, "self test failed"),
            Error::StatTest => write!(f, "statistical test failed"),
        }
    }
}

impl std::error::Error for Error {}
