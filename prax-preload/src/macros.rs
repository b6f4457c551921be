//! Convenience macros.

/// Build a [`Row`](crate::Row) from `column => value` pairs.
///
/// ```rust
/// use prax_preload::{FilterValue, row};
///
/// let row = row! {"id" => 1, "title" => "Hello", "author_id" => FilterValue::Null};
/// assert_eq!(row.len(), 3);
/// assert_eq!(row["title"], FilterValue::from("Hello"));
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $(
            row.insert(::std::string::String::from($column), $crate::FilterValue::from($value));
        )+
        row
    }};
}
