extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate chrono;
extern crate clap;
extern crate derivative;
extern crate itertools;
#[macro_use]
extern crate lazy_static;
extern crate more_asserts;
extern crate num_traits;
extern crate prettytable;
extern crate rand;
extern crate rand_xoshiro;

#[cfg(feature = "cli")]
pub mod cli;
pub mod diff;
pub mod history;
pub mod ledger;
pub mod numeric;
pub mod reduction;
pub mod session;
pub mod store;
pub mod util;
pub mod visualize;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
