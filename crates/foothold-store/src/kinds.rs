//! The built-in directory edge-kind set.
//!
//! Covers the control relations a directory snapshot commonly carries:
//! group membership, ACL rights, ownership, delegation, and sessions. Most
//! kinds are certain (probability 100); the heuristic ones carry callbacks
//! that inspect the concrete pair.

use foothold_core::{EdgeKind, EdgeRegistry, Object, Probability};

use crate::error::Result;

/// Attribute consulted by the account-sensitive probability callbacks.
/// A zero value marks the account as disabled.
pub const ATTR_ENABLED: &str = "enabled";

/// Handles for the built-in kinds, resolved once at registration.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinKinds {
    /// Distinguished structural kind: the degree-cap policy always commits
    /// group-membership edges first.
    pub member_of_group: EdgeKind,
    pub owns: EdgeKind,
    pub generic_all: EdgeKind,
    pub write_dacl: EdgeKind,
    pub write_owner: EdgeKind,
    pub add_member: EdgeKind,
    pub reset_password: EdgeKind,
    pub dc_sync: EdgeKind,
    pub allowed_to_delegate: EdgeKind,
    pub admin_to: EdgeKind,
    pub has_session: EdgeKind,
    pub can_rdp: EdgeKind,
    pub read_laps_password: EdgeKind,
}

/// Password reset only helps while the victim account is enabled.
fn reset_password_probability(_source: &Object, target: &Object) -> Probability {
    match target.attr_int(ATTR_ENABLED) {
        Some(0) => 0,
        _ => 100,
    }
}

/// Credential material from a session is present but not guaranteed usable.
fn has_session_probability(_source: &Object, _target: &Object) -> Probability {
    20
}

/// RDP reach needs working credentials on top of the network path.
fn can_rdp_probability(_source: &Object, _target: &Object) -> Probability {
    30
}

/// Constrained delegation still requires a protocol-transition foothold.
fn delegation_probability(_source: &Object, target: &Object) -> Probability {
    match target.attr_int(ATTR_ENABLED) {
        Some(0) => 0,
        _ => 60,
    }
}

/// Register the built-in kinds into `registry`, returning their handles.
/// Idempotent: re-registration resolves to the existing kinds.
pub fn register_builtin(registry: &mut EdgeRegistry) -> Result<BuiltinKinds> {
    Ok(BuiltinKinds {
        member_of_group: registry.register("MemberOfGroup")?,
        owns: registry.register("Owns")?,
        generic_all: registry.register("GenericAll")?,
        write_dacl: registry.register("WriteDacl")?,
        write_owner: registry.register("WriteOwner")?,
        add_member: registry.register("AddMember")?,
        reset_password: registry.register_with("ResetPassword", reset_password_probability)?,
        dc_sync: registry.register("DCSync")?,
        allowed_to_delegate: registry.register_with("AllowedToDelegate", delegation_probability)?,
        admin_to: registry.register("AdminTo")?,
        has_session: registry.register_with("HasSession", has_session_probability)?,
        can_rdp: registry.register_with("CanRDP", can_rdp_probability)?,
        read_laps_password: registry.register("ReadLAPSPassword")?,
    })
}
