//! Merging advertisement and sweep results

use lanscout_core::{Device, ResultSet};

/// Combine both discovery sources into one address-keyed set.
///
/// Advertisement entries are written first and never overwritten, so they
/// win on shared addresses regardless of arrival order; entries unique to
/// either source pass through untouched.
pub fn merge(advertised: Vec<Device>, swept: ResultSet) -> ResultSet {
    let mut merged = ResultSet::new();
    for device in advertised {
        merged.insert_if_absent(device);
    }
    merged.merge_from(swept);
    merged
}
