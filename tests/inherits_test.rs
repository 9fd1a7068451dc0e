mod common;

use common::{catalog, mk_store};
use inherits::*;

#[test]
fn saving_a_book_persists_product_and_book_rows() {
    let registry = catalog();
    let store = mk_store("e2e_book");
    let session = Session::new(&registry, &store);

    let mut book = registry.new_record("Book").unwrap();
    registry.write_attribute(&mut book, "name", "Agile Development with Rails").unwrap();
    registry.write_attribute(&mut book, "pages", 400).unwrap();
    session.save(&mut book).unwrap();

    let product_id = store.ids("products").unwrap();
    assert_eq!(product_id, vec![1]);
    let product_row = store.get("products", 1).unwrap().unwrap();
    assert_eq!(product_row["name"], Value::from("Agile Development with Rails"));
    assert_eq!(product_row["type"], Value::from("Book"));

    let book_id = book.id().unwrap();
    let book_row = store.get("books", book_id).unwrap().unwrap();
    assert_eq!(book_row["pages"], Value::Int(400));
    assert_eq!(book_row["product_id"], Value::Int(1));
    assert!(!book_row.contains_key("name"));

    assert_eq!(registry.read_attribute(&mut book, "name").unwrap(), Value::from("Agile Development with Rails"));
    let mut loaded = session.find("Book", book_id).unwrap();
    assert_eq!(registry.read_attribute(&mut loaded, "name").unwrap(), Value::from("Agile Development with Rails"));
    assert_eq!(registry.read_attribute(&mut loaded, "pages").unwrap(), Value::Int(400));
}

#[test]
fn each_child_class_stamps_its_own_discriminator() {
    let registry = catalog();
    let store = mk_store("e2e_discriminator");
    let session = Session::new(&registry, &store);

    let mut book = registry.new_record("Book").unwrap();
    registry
        .assign_attributes(&mut book, attributes_from_json(::serde_json::json!({ "name": "Refactoring", "pages": 448 })).unwrap())
        .unwrap();
    session.save(&mut book).unwrap();

    let mut video = registry.new_record("Video").unwrap();
    registry
        .assign_attributes(
            &mut video,
            attrs! { "name" => "Twilight Zone Season 1", "price" => 19.99, "minutes" => 25, "starring" => "Rod Serling" },
        )
        .unwrap();
    session.save(&mut video).unwrap();

    let types: Vec<Value> = store
        .scan("products")
        .unwrap()
        .into_iter()
        .map(|(_, row)| row[DISCRIMINATOR].clone())
        .collect();
    assert_eq!(types, vec![Value::from("Book"), Value::from("Video")]);
    assert_eq!(store.count("books").unwrap(), 1);
    assert_eq!(store.count("videos").unwrap(), 1);
}

#[test]
fn reviews_are_created_through_a_persisted_book() {
    let registry = catalog();
    let store = mk_store("e2e_reviews");
    let session = Session::new(&registry, &store);

    let mut book = registry.new_record("Book").unwrap();
    registry.assign_attributes(&mut book, attrs! { "name" => "Agile", "pages" => 400 }).unwrap();
    session.save(&mut book).unwrap();

    let review = session.create_association(&mut book, "reviews", attrs! { "body" => "Great read", "stars" => 5 }).unwrap();
    assert!(!review.is_new_record());
    let product_id = book.linked("product").and_then(Record::id).unwrap();

    let rows = store.scan("reviews").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1["product_id"], Value::from(product_id));

    let mut loaded = session.find("Book", book.id().unwrap()).unwrap();
    match registry.read_association(&mut loaded, "reviews").unwrap() {
        Linked::Many(reviews) => {
            assert_eq!(reviews.len(), 1);
            assert_eq!(reviews[0].attribute("body"), Some(&Value::from("Great read")));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_review_does_not_get_created() {
    let registry = catalog();
    let store = mk_store("e2e_invalid_review");
    let session = Session::new(&registry, &store);

    let mut book = registry.new_record("Book").unwrap();
    registry.assign_attributes(&mut book, attrs! { "name" => "Agile", "pages" => 400 }).unwrap();
    session.save(&mut book).unwrap();

    let err = session.create_association(&mut book, "reviews", attrs! { "stars" => 1 }).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.count("reviews").unwrap(), 0);
}

#[test]
fn parent_is_built_once_per_record() {
    let registry = catalog();
    let mut book = registry.new_record("Book").unwrap();
    registry.write_attribute(&mut book, "name", "Agile").unwrap();
    registry.write_attribute(&mut book, "price", 29.5).unwrap();
    ensure_parent_link(&registry, &mut book, "product").unwrap();
    registry.read_attribute(&mut book, "name").unwrap();

    let parent = book.linked("product").unwrap();
    assert!(parent.is_new_record());
    assert_eq!(parent.attribute("name"), Some(&Value::from("Agile")));
    assert_eq!(parent.attribute("price"), Some(&Value::Float(29.5)));
    assert_eq!(parent.attribute(DISCRIMINATOR), Some(&Value::from("Book")));
}

#[test]
fn book_responds_to_parent_members_only_where_not_shadowed() {
    let registry = catalog();
    let book = registry.resolve_class_by_name("Book").unwrap();
    for name in ["name", "price", "vendor", "vendor_id", "reviews", "pages", "product"] {
        assert!(book.responds_to(name), "Book should respond to {name}");
    }
    assert!(!book.responds_to(DISCRIMINATOR));
    assert!(!book.responds_to("minutes"));
    assert_eq!(registry.list_columns("Book").unwrap(), vec!["pages", "product_id"]);
    assert_eq!(registry.list_associations("Book").unwrap(), vec!["product"]);
}

#[test]
fn missing_attributes_fail_validation_before_any_write() {
    let registry = catalog();
    let store = mk_store("e2e_validation");
    let session = Session::new(&registry, &store);

    let mut video = registry.new_record("Video").unwrap();
    registry.write_attribute(&mut video, "minutes", 25).unwrap();
    match session.save(&mut video).unwrap_err() {
        AppError::Validation { model, errors } => {
            assert_eq!(model, "Video");
            assert!(errors.on("name").is_some());
            assert!(errors.on("starring").is_some());
            assert!(errors.on("minutes").is_none());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(store.count("products").unwrap(), 0);
    assert_eq!(store.count("videos").unwrap(), 0);
}

#[test]
fn failing_parent_keeps_the_child_unsaved() {
    let mut registry = catalog();
    registry
        .register_before_create(
            "Product",
            std::sync::Arc::new(|record: &mut Record, _: &Session<'_>| -> Result<(), AppError> {
                Err(AppError::Custom(format!("{} rejected", record.model())))
            }),
        )
        .unwrap();
    let store = mk_store("e2e_parent_failure");
    let session = Session::new(&registry, &store);

    let mut book = registry.new_record("Book").unwrap();
    registry.assign_attributes(&mut book, attrs! { "name" => "Agile", "pages" => 400 }).unwrap();
    let err = session.save(&mut book).unwrap_err();
    assert!(matches!(&err, AppError::Persistence { model, .. } if model == "Book"));
    assert!(book.is_new_record());
    assert_eq!(store.count("books").unwrap(), 0);
}

#[test]
fn rows_survive_reopening_the_store() {
    let registry = catalog();
    let config = StoreConfig::temp("e2e_reopen");
    let book_id = {
        let store = Store::open(&config).unwrap();
        let session = Session::new(&registry, &store);
        let mut book = registry.new_record("Book").unwrap();
        registry.assign_attributes(&mut book, attrs! { "name" => "Agile", "pages" => 400 }).unwrap();
        session.save(&mut book).unwrap();
        book.id().unwrap()
    };
    let store = Store::open(&config).unwrap();
    let session = Session::new(&registry, &store);
    let mut book = session.find("Book", book_id).unwrap();
    assert_eq!(registry.read_attribute(&mut book, "name").unwrap(), Value::from("Agile"));
}
