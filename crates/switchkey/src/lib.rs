#![crate_name = "switchkey"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]
#![doc = include_str!("../README.md")]

mod errors;

pub mod factors;
pub mod kernel;
pub mod key;
pub mod layout;
pub mod moduli;
pub mod parameters;

pub use errors::{Error, ParametersError, Result};
pub use factors::ModSwitchFactorTable;
pub use kernel::{switch_key, SwitchKeyKernel};
pub use key::KeySwitchKeyMaterial;
pub use layout::{BufferLayout, InPlaceBufferWriter};
pub use moduli::ModulusTable;
pub use parameters::{SwitchKeyParameters, SwitchKeyParametersBuilder};
