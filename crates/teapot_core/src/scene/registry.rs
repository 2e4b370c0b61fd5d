//! Session-scoped resource deduplication
//!
//! Loaders share one registry so the same texture file or named material is
//! only created once. Entries are weak: once no scene references a resource
//! it is released and a later request recreates it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::{Material, Texture};

/// Dedup cache for textures (by path) and materials (by name)
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    textures: HashMap<String, Weak<Texture>>,
    materials: HashMap<String, Weak<Material>>,
}

impl ResourceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared texture for `path`, created on first use
    pub fn texture(&mut self, path: &str) -> Arc<Texture> {
        if let Some(existing) = self.textures.get(path).and_then(Weak::upgrade) {
            return existing;
        }
        let texture = Arc::new(Texture::new(path));
        self.textures.insert(path.to_owned(), Arc::downgrade(&texture));
        texture
    }

    /// Named material if it is still alive
    #[must_use]
    pub fn material(&self, name: &str) -> Option<Arc<Material>> {
        self.materials.get(name).and_then(Weak::upgrade)
    }

    /// Shared material for `name`, built with `create` on first use
    pub fn material_or_insert_with<F>(&mut self, name: &str, create: F) -> Arc<Material>
    where
        F: FnOnce() -> Material,
    {
        if let Some(existing) = self.material(name) {
            return existing;
        }
        let material = Arc::new(create());
        self.materials.insert(name.to_owned(), Arc::downgrade(&material));
        material
    }

    /// Drop entries whose resource has been released
    pub fn purge(&mut self) {
        self.textures.retain(|_, t| t.strong_count() > 0);
        self.materials.retain(|_, m| m.strong_count() > 0);
    }

    /// Number of live textures
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.values().filter(|t| t.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Color;

    #[test]
    fn textures_are_shared_while_alive() {
        let mut registry = ResourceRegistry::new();
        let a = registry.texture("media/brick.png");
        let b = registry.texture("media/brick.png");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.live_textures(), 1);

        drop(a);
        drop(b);
        assert_eq!(registry.live_textures(), 0);
        registry.purge();
        let c = registry.texture("media/brick.png");
        assert_eq!(c.path(), "media/brick.png");
    }

    #[test]
    fn named_materials() {
        let mut registry = ResourceRegistry::new();
        let red = registry.material_or_insert_with("red", || Material::new(Color::rgb(1.0, 0.0, 0.0)));
        let again = registry.material_or_insert_with("red", Material::default);
        assert!(Arc::ptr_eq(&red, &again));
        assert!(registry.material("blue").is_none());
    }
}
