pub mod bio;
pub mod browser;
pub mod classify;
pub mod followers;
pub mod login;
pub mod pipeline;
pub mod session;
pub mod site;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod boundary_tests;

pub use pipeline::Pipeline;
