use std::sync::Arc;
use tessera_core::Event;

/// Predicate deciding whether a subscriber receives an event
pub type Matcher<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Build a matcher from specifier events.
///
/// No specifiers means "everything" and yields `None`. Otherwise an event is
/// accepted when any specifier `matches` it.
pub fn any_of<E: Event>(specifiers: Vec<E>) -> Option<Matcher<E>> {
    if specifiers.is_empty() {
        return None;
    }
    Some(Arc::new(move |event: &E| {
        specifiers.iter().any(|spec| spec.matches(event))
    }))
}
