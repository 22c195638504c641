#![crate_name = "switchkey_math"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Modular arithmetic building blocks for the switchkey library: moduli of
//! up to 62 bits and the negacyclic Number-Theoretic Transform.

mod errors;

pub mod ntt;
pub mod zq;

pub use errors::{Error, Result};

#[cfg(test)]
#[macro_use]
extern crate proptest;
