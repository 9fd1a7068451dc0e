use crate::inherit::{declare_inheritance, InheritOptions};
use crate::registry::ModelRegistry;
use crate::schema::{ColumnType, ModelDef};
use crate::storage::Store;

/// Product catalog: Book and Video inherit from Product, which owns reviews and belongs to a vendor.
pub(crate) fn catalog() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register(ModelDef::new("Vendor").with_column("name", ColumnType::Text)).expect("vendor");
    registry
        .register(
            ModelDef::new("Review")
                .with_column("body", ColumnType::Text)
                .with_column("stars", ColumnType::Integer)
                .with_column("product_id", ColumnType::Integer),
        )
        .expect("review");
    registry
        .register(
            ModelDef::new("Product")
                .with_column("name", ColumnType::Text)
                .with_column("price", ColumnType::Float)
                .with_has_many("reviews", "Review")
                .with_belongs_to("vendor"),
        )
        .expect("product");
    registry.register(ModelDef::new("Book").with_column("pages", ColumnType::Integer)).expect("book");
    registry
        .register(
            ModelDef::new("Video")
                .with_column("minutes", ColumnType::Integer)
                .with_column("starring", ColumnType::Text),
        )
        .expect("video");

    declare_inheritance(&mut registry, "Book", "product", InheritOptions::default()).expect("book inherits");
    declare_inheritance(&mut registry, "Video", "product", InheritOptions::default()).expect("video inherits");

    registry.validates_presence_of("Vendor", &["name"]).expect("vendor validations");
    registry.validates_presence_of("Review", &["body"]).expect("review validations");
    registry.validates_presence_of("Book", &["name", "pages"]).expect("book validations");
    registry
        .validates_presence_of("Video", &["name", "price", "minutes", "starring"])
        .expect("video validations");
    registry
}

pub(crate) fn temp_store(name: &str) -> Store {
    Store::temp(name).expect("temp store")
}
