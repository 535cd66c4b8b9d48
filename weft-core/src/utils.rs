//! Utility functions for the container

/// Naming convention utilities for properties and setters
pub mod naming {
    /// Converts a camelCase or PascalCase name to snake_case.
    ///
    /// Names that are already snake_case are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use weft_core::utils::naming::to_snake_case;
    ///
    /// assert_eq!(to_snake_case("orderRepository"), "order_repository");
    /// assert_eq!(to_snake_case("order_repository"), "order_repository");
    /// assert_eq!(to_snake_case("Clock"), "clock");
    /// ```
    pub fn to_snake_case(s: &str) -> String {
        let mut result = String::with_capacity(s.len() + s.len() / 2);

        for ch in s.chars() {
            if ch.is_uppercase() {
                if !result.is_empty() && !result.ends_with('_') {
                    result.push('_');
                }
                result.extend(ch.to_lowercase());
            } else {
                result.push(ch);
            }
        }

        result
    }

    /// Conventional setter name for a property: `set_` + snake_case(property).
    ///
    /// ```
    /// use weft_core::utils::naming::setter_name;
    ///
    /// assert_eq!(setter_name("transactionManager"), "set_transaction_manager");
    /// ```
    pub fn setter_name(property: &str) -> String {
        format!("set_{}", to_snake_case(property))
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        /// tracker id -> names currently being created on this thread, in resolution order
        static IN_CREATION: RefCell<HashMap<u64, Vec<String>>> = RefCell::new(HashMap::new());
    }

    /// Tracks beans currently being created to detect circular dependencies.
    ///
    /// State is kept per thread, so unrelated creations running on other
    /// threads never look like a cycle. Each tracker owns a separate slot,
    /// so two containers used from the same thread do not interfere.
    #[derive(Debug)]
    pub struct CreationTracker {
        id: u64,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self {
                id: NEXT_TRACKER_ID.fetch_add(1, Ordering::Relaxed),
            }
        }

        /// Checks if a bean is currently being created on this thread.
        pub fn is_creating(&self, name: &str) -> bool {
            IN_CREATION.with(|slots| {
                slots
                    .borrow()
                    .get(&self.id)
                    .is_some_and(|names| names.iter().any(|n| n == name))
            })
        }

        /// Marks a bean as being created.
        ///
        /// Returns `false` if the bean was already being created on this thread.
        pub fn start_creating(&self, name: &str) -> bool {
            IN_CREATION.with(|slots| {
                let mut slots = slots.borrow_mut();
                let names = slots.entry(self.id).or_default();
                if names.iter().any(|n| n == name) {
                    return false;
                }
                names.push(name.to_string());
                true
            })
        }

        /// Marks a bean as finished being created.
        pub fn finish_creating(&self, name: &str) {
            IN_CREATION.with(|slots| {
                let mut slots = slots.borrow_mut();
                if let Some(names) = slots.get_mut(&self.id) {
                    if let Some(pos) = names.iter().rposition(|n| n == name) {
                        names.remove(pos);
                    }
                    if names.is_empty() {
                        slots.remove(&self.id);
                    }
                }
            })
        }

        /// Names currently being created on this thread, outermost first.
        pub fn current_creating(&self) -> Vec<String> {
            IN_CREATION.with(|slots| slots.borrow().get(&self.id).cloned().unwrap_or_default())
        }

        /// Marks `name` as being created until the returned guard is dropped.
        ///
        /// Returns `None` if `name` is already being created on this thread.
        pub fn guard(&self, name: &str) -> Option<CreationGuard<'_>> {
            self.start_creating(name).then(|| CreationGuard {
                tracker: self,
                name: name.to_string(),
            })
        }
    }

    impl Default for CreationTracker {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for CreationTracker {
        fn drop(&mut self) {
            // 线程局部存储在线程退出时可能已经销毁
            let _ = IN_CREATION.try_with(|slots| slots.borrow_mut().remove(&self.id));
        }
    }

    /// Clears the in-creation marker when dropped, on success and on failure.
    #[derive(Debug)]
    pub struct CreationGuard<'a> {
        tracker: &'a CreationTracker,
        name: String,
    }

    impl Drop for CreationGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_creating(&self.name);
        }
    }
}
