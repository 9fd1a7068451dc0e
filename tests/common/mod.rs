#![allow(dead_code)]

use inherits::{declare_inheritance, ColumnType, InheritOptions, ModelDef, ModelRegistry, Store};

/// Product catalog with Book and Video as concrete products.
pub fn catalog() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register(ModelDef::new("Vendor").with_column("name", ColumnType::Text)).unwrap();
    registry
        .register(
            ModelDef::new("Review")
                .with_column("body", ColumnType::Text)
                .with_column("stars", ColumnType::Integer)
                .with_column("product_id", ColumnType::Integer),
        )
        .unwrap();
    registry
        .register(
            ModelDef::new("Product")
                .with_column("name", ColumnType::Text)
                .with_column("price", ColumnType::Float)
                .with_has_many("reviews", "Review")
                .with_belongs_to("vendor"),
        )
        .unwrap();
    registry.register(ModelDef::new("Book").with_column("pages", ColumnType::Integer)).unwrap();
    registry
        .register(
            ModelDef::new("Video")
                .with_column("minutes", ColumnType::Integer)
                .with_column("starring", ColumnType::Text),
        )
        .unwrap();

    declare_inheritance(&mut registry, "Book", "product", InheritOptions::default()).unwrap();
    declare_inheritance(&mut registry, "Video", "product", InheritOptions::default()).unwrap();

    registry.validates_presence_of("Review", &["body"]).unwrap();
    registry.validates_presence_of("Book", &["name", "pages"]).unwrap();
    registry.validates_presence_of("Video", &["name", "price", "minutes", "starring"]).unwrap();
    registry
}

pub fn mk_store(name: &str) -> Store {
    Store::temp(name).unwrap()
}
