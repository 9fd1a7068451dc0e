/// Builds [`crate::Attributes`] from `name => value` pairs.
///
/// ```ignore
/// let attrs = attrs! { "body" => "Great read", "stars" => 5 };
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::Attributes::new();
        $(
            attributes.insert(::std::string::String::from($name), $crate::Value::from($value));
        )+
        attributes
    }};
}
