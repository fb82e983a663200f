//! Built-in product presets.
//!
//! Presets only supply strengths and pack sizes for common products so that
//! callers do not have to type them; they carry no dosing advice.

use crate::{ContainerKind, Result, StrengthSet};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// How a product is supplied
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductForm {
    Tablet {
        strengths: Vec<f64>,
        halvable: bool,
        box_size: u32,
    },
    Injectable {
        container: ContainerKind,
        capacity: f64,
        containers_per_box: u32,
    },
}

/// A named product preset
#[derive(Clone, Debug, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub form: ProductForm,
}

impl Product {
    /// Canonical strengths for tablet products
    pub fn strength_set(&self) -> Option<Result<StrengthSet>> {
        match &self.form {
            ProductForm::Tablet { strengths, .. } => {
                Some(StrengthSet::new(strengths.iter().copied()))
            }
            ProductForm::Injectable { .. } => None,
        }
    }
}

/// The set of known presets, keyed by id
#[derive(Clone, Debug)]
pub struct Catalog {
    pub products: HashMap<String, Product>,
}

/// Cached default catalog
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

fn tablet(id: &str, name: &str, strengths: &[f64], halvable: bool, box_size: u32) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        unit: "mg".into(),
        form: ProductForm::Tablet {
            strengths: strengths.to_vec(),
            halvable,
            box_size,
        },
    }
}

/// Builds the default catalog
pub fn build_default_catalog() -> Catalog {
    let mut products = HashMap::new();

    for product in [
        tablet("warfarin", "Warfarin", &[0.5, 1.0, 3.0, 5.0], false, 28),
        tablet("prednisolone", "Prednisolone", &[1.0, 5.0, 25.0], true, 28),
        tablet("methotrexate", "Methotrexate", &[2.5, 10.0], false, 24),
        tablet("levothyroxine", "Levothyroxine", &[25.0, 50.0, 75.0, 100.0], true, 28),
        tablet("dexamethasone", "Dexamethasone", &[0.5, 2.0], true, 50),
        Product {
            id: "insulin_pen_100".into(),
            name: "Insulin 100 units/mL prefilled pen (3 mL)".into(),
            unit: "units".into(),
            form: ProductForm::Injectable {
                container: ContainerKind::Pen,
                capacity: 300.0,
                containers_per_box: 5,
            },
        },
        Product {
            id: "insulin_vial_100".into(),
            name: "Insulin 100 units/mL vial (10 mL)".into(),
            unit: "units".into(),
            form: ProductForm::Injectable {
                container: ContainerKind::Vial,
                capacity: 1000.0,
                containers_per_box: 1,
            },
        },
    ] {
        products.insert(product.id.clone(), product);
    }

    Catalog { products }
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.get(&id.to_lowercase())
    }

    /// Products sorted by id
    pub fn sorted(&self) -> Vec<&Product> {
        let mut list: Vec<_> = self.products.values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Validate the catalog, returning a list of problems
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, product) in &self.products {
            if id.is_empty() || product.id.is_empty() {
                errors.push("Product has empty ID".to_string());
            }
            if id != &product.id {
                errors.push(format!(
                    "Product key '{}' doesn't match product.id '{}'",
                    id, product.id
                ));
            }
            if product.name.is_empty() {
                errors.push(format!("Product '{}' has empty name", id));
            }
            match &product.form {
                ProductForm::Tablet {
                    strengths,
                    box_size,
                    ..
                } => {
                    if strengths.is_empty() || strengths.iter().any(|s| *s <= 0.0) {
                        errors.push(format!("Product '{}' has invalid strengths", id));
                    }
                    if *box_size == 0 {
                        errors.push(format!("Product '{}' has zero box size", id));
                    }
                }
                ProductForm::Injectable {
                    capacity,
                    containers_per_box,
                    ..
                } => {
                    if *capacity <= 0.0 {
                        errors.push(format!("Product '{}' has invalid capacity", id));
                    }
                    if *containers_per_box == 0 {
                        errors.push(format!("Product '{}' has zero containers per box", id));
                    }
                }
            }
        }

        errors
    }
}
