//! Material catalog and delivery cities, managed by the settings collaborator.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable material with its stock-keeping unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: String,
    /// Unit label shown next to quantities, e.g. "UN", "PCT", "CX".
    pub unit: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub materials: Vec<Material>,
    pub cities: Vec<String>,
}

/// Registry of materials and delivery cities used when composing orders.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogSnapshot>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&self, name: impl Into<String>, unit: impl Into<String>) -> Material {
        let material = Material {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            unit: unit.into(),
        };
        self.write().materials.push(material.clone());
        material
    }

    /// The unit for a material, looked up by name.
    pub fn unit_for(&self, material_name: &str) -> Option<String> {
        self.read()
            .materials
            .iter()
            .find(|m| m.name == material_name)
            .map(|m| m.unit.clone())
    }

    pub fn materials(&self) -> Vec<Material> {
        self.read().materials.clone()
    }

    pub fn add_city(&self, city: impl Into<String>) {
        let city = city.into();
        let mut inner = self.write();
        if !inner.cities.contains(&city) {
            inner.cities.push(city);
        }
    }

    pub fn cities(&self) -> Vec<String> {
        self.read().cities.clone()
    }

    pub fn restore(&self, snapshot: CatalogSnapshot) {
        *self.write() = snapshot;
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CatalogSnapshot> {
        self.inner.read().expect("Catalog lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CatalogSnapshot> {
        self.inner.write().expect("Catalog lock poisoned")
    }
}
