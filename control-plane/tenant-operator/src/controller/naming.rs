//! Child names are `tenant-<tenantID>-config`.
//!
//! The inverse strips one leading `tenant-` and one trailing `-config` when
//! present. It is not injective over arbitrary names: an owned ConfigMap
//! named `tenant-x-config-config` and a tenant `x-config` map to the same
//! identifier, and a name that lacks the affixes is returned unchanged.

const PREFIX: &str = "tenant-";
const SUFFIX: &str = "-config";

pub fn child_name(tenant_id: &str) -> String {
    format!("{PREFIX}{tenant_id}{SUFFIX}")
}

pub fn tenant_id_from_child_name(name: &str) -> &str {
    let id = name.strip_prefix(PREFIX).unwrap_or(name);
    id.strip_suffix(SUFFIX).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_for_plain_ids() {
        for id in ["a", "acme", "team-42"] {
            assert_eq!(tenant_id_from_child_name(&child_name(id)), id);
        }
        assert_eq!(child_name("a"), "tenant-a-config");
    }

    #[test]
    fn affixes_are_stripped_once() {
        assert_eq!(tenant_id_from_child_name("tenant-x-config-config"), "x-config");
        assert_eq!(tenant_id_from_child_name("tenant-tenant-x-config"), "tenant-x");
    }

    #[test]
    fn names_without_affixes_are_kept() {
        assert_eq!(tenant_id_from_child_name("settings"), "settings");
        assert_eq!(tenant_id_from_child_name("tenant-a"), "a");
        assert_eq!(tenant_id_from_child_name("a-config"), "a");
    }
}
