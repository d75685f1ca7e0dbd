pub(crate) mod af;
pub(crate) mod prefix_id;

pub use af::AddressFamily;
pub(crate) use prefix_id::PrefixId;

pub mod errors;
pub mod test_types;
