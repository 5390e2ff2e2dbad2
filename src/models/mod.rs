pub mod ingredient;
pub mod job;
pub mod recipe;

/// Reject strings made only of whitespace; `length` alone lets them through.
pub(crate) fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("must not be blank"));
    }
    Ok(())
}
