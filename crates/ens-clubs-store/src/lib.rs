// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod contracts;
mod error;
mod local;
mod paths;

pub use contracts::{CategoryName, ClubStore};
pub use error::{StoreError, StoreErrorCode};
pub use local::LocalFsStore;
pub use paths::{
    DirectoryLayout, PathLayout, PathTarget, CATEGORIES_DIR, JSON_EXTENSION, SNAPSHOTS_DIR,
};

pub const CRATE_NAME: &str = "ens-clubs-store";
