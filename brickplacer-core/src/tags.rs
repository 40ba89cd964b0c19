// vim: tw=80
//! Tag handling, and the tag-driven role predicates for arbiter volumes.
//!
//! The `arbiter` tag of a device, or of its node if the device doesn't set
//! one, says which kinds of brick it will take:
//!
//! | value       | data bricks | arbiter bricks |
//! |-------------|-------------|----------------|
//! | `required`  | no          | yes            |
//! | `supported` | yes         | yes            |
//! | `disabled`  | yes         | no             |
//!
//! An untagged device behaves as `supported`.

use crate::entries::{DeviceSource, PlacerDevice};
use std::collections::BTreeMap;

pub const TAG_ARBITER: &str = "arbiter";
pub const TAG_VAL_ARBITER_REQUIRED: &str = "required";
pub const TAG_VAL_ARBITER_SUPPORTED: &str = "supported";
pub const TAG_VAL_ARBITER_DISABLED: &str = "disabled";

/// Combine tag maps.  Later maps take priority over earlier ones.
pub fn merge_tags<'a, I>(maps: I) -> BTreeMap<String, String>
    where I: IntoIterator<Item=&'a BTreeMap<String, String>>
{
    let mut out = BTreeMap::new();
    for m in maps {
        out.extend(m.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    out
}

/// The effective `arbiter` tag value of a merged tag map
pub fn arbiter_tag(tags: &BTreeMap<String, String>) -> &str {
    tags.get(TAG_ARBITER)
        .map(String::as_str)
        .unwrap_or(TAG_VAL_ARBITER_SUPPORTED)
}

fn device_has_arbiter_tag(
    d: &dyn PlacerDevice,
    dsrc: &dyn DeviceSource,
    accepted: &[&str]) -> bool
{
    let node = match dsrc.node(d.parent_node_id()) {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("failed to fetch node ({}) for arbiter tag: {}",
                d.parent_node_id(), e);
            return false;
        }
    };
    let merged = merge_tags([&node.tags(), &d.tags()]);
    accepted.contains(&arbiter_tag(&merged))
}

pub fn can_host_arbiter(d: &dyn PlacerDevice, dsrc: &dyn DeviceSource) -> bool {
    device_has_arbiter_tag(d, dsrc,
        &[TAG_VAL_ARBITER_REQUIRED, TAG_VAL_ARBITER_SUPPORTED])
}

pub fn can_host_data(d: &dyn PlacerDevice, dsrc: &dyn DeviceSource) -> bool {
    device_has_arbiter_tag(d, dsrc,
        &[TAG_VAL_ARBITER_SUPPORTED, TAG_VAL_ARBITER_DISABLED])
}
