use serde_derive::{Deserialize, Serialize};

use crate::{
    entity::{new_entity_id, EntityId, LookComp, PLAYER_AABB},
    error::InventoryError,
    world::{floor_f32, ceil_f32, ChunkPos, IntVec3, Vec3f},
};

pub const HOTBAR_SLOTS: usize = 9;
pub const INVENTORY_SLOTS: usize = 36;
pub const MAX_STACK: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub count: u8,
}

impl ItemStack {
    pub fn new(item: &str, count: u8) -> ItemStack {
        ItemStack {
            item: item.to_string(),
            count,
        }
    }

    pub fn is_present(&self) -> bool {
        self.count > 0 && !self.item.is_empty()
    }

    /// Removes one item, emptying the stack when it runs out.
    pub fn take_one(&mut self) -> Option<String> {
        if !self.is_present() {
            return None;
        }
        let item = self.item.clone();
        self.count -= 1;
        if self.count == 0 {
            *self = ItemStack::default();
        }
        Some(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<ItemStack>,
    selected: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Inventory {
            slots: vec![ItemStack::default(); INVENTORY_SLOTS],
            selected: 0,
        }
    }
}

impl Inventory {
    /// What every new player starts with.
    pub fn starter() -> Inventory {
        let mut inventory = Inventory::default();
        let hotbar = [
            "mc:stone",
            "mc:dirt",
            "mc:grass",
            "mc:cobblestone",
            "mc:glass",
            "mc:furnace",
        ];
        for (slot, item) in hotbar.iter().enumerate() {
            inventory.slots[slot] = ItemStack::new(item, MAX_STACK);
        }
        inventory
    }

    pub fn selected_slot(&self) -> usize {
        self.selected
    }

    /// Selects a hotbar slot. Out-of-range slots are ignored.
    pub fn select(&mut self, slot: usize) -> bool {
        if slot < HOTBAR_SLOTS {
            self.selected = slot;
            true
        } else {
            false
        }
    }

    pub fn slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot)
    }

    pub fn held(&self) -> &ItemStack {
        &self.slots[self.selected]
    }

    pub fn held_mut(&mut self) -> &mut ItemStack {
        &mut self.slots[self.selected]
    }

    pub fn snapshot(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_snapshot(data: &str) -> Result<Inventory, InventoryError> {
        let inventory: Inventory = serde_json::from_str(data)?;
        if inventory.selected >= inventory.slots.len().min(HOTBAR_SLOTS) {
            return Err(InventoryError::InvalidSelection {
                selected: inventory.selected,
                slots: inventory.slots.len(),
            });
        }
        Ok(inventory)
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub entity_id: EntityId,
    pub username: String,
    pub position: Vec3f,
    pub look: LookComp,
    pub inventory: Inventory,
}

impl Player {
    pub fn new(username: &str, position: Vec3f) -> Player {
        Player {
            entity_id: new_entity_id(),
            username: username.to_string(),
            position,
            look: LookComp::default(),
            inventory: Inventory::starter(),
        }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::from_position(self.position)
    }

    /// Whether the player's bounding box overlaps the voxel at `block`.
    pub fn intersects_block(&self, block: IntVec3) -> bool {
        let min = self.position;
        let max = self.position + PLAYER_AABB;
        (floor_f32(min.x)..ceil_f32(max.x)).contains(&block.x)
            && (floor_f32(min.y)..ceil_f32(max.y)).contains(&block.y)
            && (floor_f32(min.z)..ceil_f32(max.z)).contains(&block.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_runs_out() {
        let mut stack = ItemStack::new("mc:stone", 2);
        assert_eq!(stack.take_one().as_deref(), Some("mc:stone"));
        assert_eq!(stack.count, 1);
        assert_eq!(stack.take_one().as_deref(), Some("mc:stone"));
        assert!(!stack.is_present());
        assert_eq!(stack.take_one(), None);
    }

    #[test]
    fn hotbar_selection() {
        let mut inventory = Inventory::starter();
        assert_eq!(inventory.held().item, "mc:stone");
        assert!(inventory.select(4));
        assert_eq!(inventory.held().item, "mc:glass");
        assert!(!inventory.select(9));
        assert_eq!(inventory.selected_slot(), 4);
        assert!(inventory.select(8));
        assert!(!inventory.held().is_present());
    }

    #[test]
    fn snapshot_survives_json() {
        let mut inventory = Inventory::starter();
        inventory.select(2);
        inventory.held_mut().take_one();

        let json = inventory.snapshot().unwrap();
        assert!(json.contains("mc:grass"));
        assert_eq!(Inventory::from_snapshot(&json).unwrap(), inventory);
    }

    #[test]
    fn snapshot_with_bad_selection_is_rejected() {
        let far_slot = r#"{"slots":[{"item":"mc:stone","count":1}],"selected":99}"#;
        assert!(matches!(
            Inventory::from_snapshot(far_slot),
            Err(InventoryError::InvalidSelection { selected: 99, slots: 1 })
        ));

        let no_slots = r#"{"slots":[],"selected":0}"#;
        assert!(matches!(
            Inventory::from_snapshot(no_slots),
            Err(InventoryError::InvalidSelection { selected: 0, slots: 0 })
        ));

        assert!(matches!(Inventory::from_snapshot("{"), Err(InventoryError::Json(_))));
    }

    #[test]
    fn player_box_covers_two_blocks() {
        let player = Player::new("steve", Vec3f::new(4.2, 65.0, 4.2));
        assert!(player.intersects_block(IntVec3::new(4, 65, 4)));
        assert!(player.intersects_block(IntVec3::new(4, 66, 4)));
        assert!(!player.intersects_block(IntVec3::new(4, 67, 4)));
        assert!(!player.intersects_block(IntVec3::new(4, 64, 4)));
        assert!(!player.intersects_block(IntVec3::new(5, 65, 4)));

        let straddling = Player::new("alex", Vec3f::new(4.7, 65.5, 4.2));
        assert!(straddling.intersects_block(IntVec3::new(5, 67, 4)));
    }
}
