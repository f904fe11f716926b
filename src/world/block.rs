use std::collections::HashMap;

/// Name reserved for the absence of a block.
pub const AIR: &str = "";

pub fn is_solid(name: &str) -> bool {
    name != AIR
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockType {
    pub name: String,
    pub transparent: bool,
    /// Opaque handle for the render layer, typically a texture name.
    pub render_type: Option<String>,
}

impl BlockType {
    pub fn new(name: &str, transparent: bool, render_type: Option<&str>) -> BlockType {
        BlockType {
            name: name.to_string(),
            transparent,
            render_type: render_type.map(|s| s.to_string()),
        }
    }
}

/// Name to descriptor table. Built once at startup and shared by reference;
/// never mutated after it is handed out.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    types: HashMap<String, BlockType>,
}

impl BlockRegistry {
    pub fn new() -> BlockRegistry {
        let mut types = HashMap::new();
        types.insert(AIR.to_string(), BlockType::new(AIR, true, None));
        BlockRegistry { types }
    }

    pub fn with_defaults() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry.register(BlockType::new("mc:stone", false, Some("stone")));
        registry.register(BlockType::new("mc:dirt", false, Some("dirt")));
        registry.register(BlockType::new("mc:grass", false, Some("grass")));
        registry.register(BlockType::new("mc:cobblestone", false, Some("cobblestone")));
        registry.register(BlockType::new("mc:glass", true, Some("glass")));
        registry.register(BlockType::new("mc:furnace", false, Some("furnace")));
        registry
    }

    pub fn register(&mut self, block_type: BlockType) {
        self.types.insert(block_type.name.clone(), block_type);
    }

    pub fn get(&self, name: &str) -> Option<&BlockType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Unknown names are treated as opaque.
    pub fn is_transparent(&self, name: &str) -> bool {
        self.get(name).map(|t| t.transparent).unwrap_or(false)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        BlockRegistry::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_is_always_registered() {
        let registry = BlockRegistry::new();
        assert!(registry.contains(AIR));
        assert!(registry.is_transparent(AIR));
        assert!(!is_solid(AIR));
    }

    #[test]
    fn defaults_have_transparency() {
        let registry = BlockRegistry::with_defaults();
        assert!(!registry.is_transparent("mc:stone"));
        assert!(registry.is_transparent("mc:glass"));
        assert!(!registry.is_transparent("mc:unknown"));
        assert_eq!(
            registry.get("mc:grass").and_then(|t| t.render_type.as_deref()),
            Some("grass")
        );
    }
}
