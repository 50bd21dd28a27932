/// Joins `strings` into an English list, e.g. `"a, b, and c"`.
///
/// # Example
///
/// ```rust
/// # use exclusivity::utils::grammatical_list;
/// assert_eq!(grammatical_list(["dog", "cat"], "and", true), "dog and cat");
/// assert_eq!(grammatical_list(["dog", "cat", "mouse"], "or", true), "dog, cat, or mouse");
/// assert_eq!(grammatical_list(["dog", "cat", "mouse"], "and", false), "dog, cat and mouse");
/// ```
pub fn grammatical_list<I, S>(strings: I, conjunction: &str, oxford_comma: bool) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let strings: Vec<S> = strings.into_iter().collect();
    match strings.as_slice() {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} {conjunction} {}", first.as_ref(), second.as_ref()),
        [init @ .., last] => {
            let init: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            let separator = if oxford_comma { ", " } else { " " };
            format!(
                "{}{separator}{conjunction} {}",
                init.join(", "),
                last.as_ref()
            )
        }
    }
}

/// File name for a result written at `time`, e.g. `2024-05-01 13-37.json`.
pub fn result_file_basename<Tz>(time: chrono::DateTime<Tz>, ext: Option<&str>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut basename = time.format("%Y-%m-%d %H-%M").to_string();
    if let Some(ext) = ext {
        basename.push_str(ext);
    }
    basename
}
