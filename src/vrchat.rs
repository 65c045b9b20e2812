//! VRChat convenience constructors (supplemental; spec.md §9 "Supplemented
//! features").
//!
//! Grounded on the teacher's `server.rs::receive_vrchat_avatar_parameters`
//! and `receive_vrchat_tracking_data` — write-only placeholder nodes so a
//! caller wiring this crate up for VRChat doesn't have to hand-construct
//! the address and access level.

use crate::node::Access;
use crate::tree::{MethodSpec, Tree};

/// Registers `/avatar` as a write-only node, the address VRChat pushes
/// avatar parameter changes under.
pub async fn receive_avatar_parameters(tree: &Tree) {
    tree.add_method(
        "/avatar",
        MethodSpec {
            description: Some("VRChat Avatar Parameters".to_string()),
            access: Access::WriteOnly,
            tags: None,
            critical: None,
            arguments: vec![],
        },
    )
    .await;
}

/// Registers `/tracking/vrsystem`, the address VRChat pushes VR tracking
/// data under.
pub async fn receive_tracking_data(tree: &Tree) {
    tree.add_method(
        "/tracking/vrsystem",
        MethodSpec {
            description: Some("VRChat VR Tracking Data".to_string()),
            access: Access::WriteOnly,
            tags: None,
            critical: None,
            arguments: vec![],
        },
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn avatar_parameters_registers_write_only_node() {
        let tree = Tree::new(None);
        receive_avatar_parameters(&tree).await;
        let node = tree.lookup("/avatar").await.unwrap();
        assert_eq!(node.access, Some(Access::WriteOnly));
    }

    #[tokio::test]
    async fn tracking_data_registers_write_only_node() {
        let tree = Tree::new(None);
        receive_tracking_data(&tree).await;
        let node = tree.lookup("/tracking/vrsystem").await.unwrap();
        assert_eq!(node.access, Some(Access::WriteOnly));
    }
}
