//! Utility functions for the container
//!
//! String helpers used by the configuration loader, bean naming helpers and
//! the bookkeeping structures used to track beans in creation.

/// String manipulation helpers
pub mod text {
    /// Returns true if the string contains at least one non-whitespace character.
    pub fn has_text(s: &str) -> bool {
        !s.trim().is_empty()
    }

    /// Splits a string on any of the given delimiter characters, trimming each
    /// token and dropping empty ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprig_core::utils::text::tokenize;
    ///
    /// assert_eq!(tokenize("a, b;c  d", ",; "), vec!["a", "b", "c", "d"]);
    /// assert!(tokenize("  ", ",").is_empty());
    /// ```
    pub fn tokenize(s: &str, delimiters: &str) -> Vec<String> {
        s.split(|c: char| delimiters.contains(c))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from)
            .collect()
    }

    /// Matches a name against a simple pattern where `*` stands for any
    /// sequence of characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprig_core::utils::text::simple_match;
    ///
    /// assert!(simple_match("*Service", "userService"));
    /// assert!(simple_match("repo*", "repository"));
    /// assert!(simple_match("*", "anything"));
    /// assert!(!simple_match("*Dao", "userService"));
    /// ```
    pub fn simple_match(pattern: &str, name: &str) -> bool {
        let Some(first_star) = pattern.find('*') else {
            return pattern == name;
        };
        let (prefix, rest) = pattern.split_at(first_star);
        if !name.starts_with(prefix) {
            return false;
        }
        let pattern_rest = &rest[1..];
        if pattern_rest.is_empty() {
            return true;
        }
        let name_rest = &name[prefix.len()..];
        // try every possible split point for the remaining pattern
        name_rest
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(name_rest.len()))
            .any(|i| simple_match(pattern_rest, &name_rest[i..]))
    }
}

/// Naming convention utilities for bean names
pub mod naming {
    use crate::constants::{GENERATED_BEAN_NAME_SEPARATOR, INNER_BEAN_PREFIX};

    /// Produces the first name of the form `<base>#<n>` that is not in use.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprig_core::utils::naming::unique_generated_name;
    ///
    /// let taken = ["Pool#0".to_string()];
    /// assert_eq!(unique_generated_name("Pool", |n| taken.contains(&n.to_string())), "Pool#1");
    /// ```
    pub fn unique_generated_name(base: &str, in_use: impl Fn(&str) -> bool) -> String {
        let mut counter = 0usize;
        loop {
            let candidate = format!("{}{}{}", base, GENERATED_BEAN_NAME_SEPARATOR, counter);
            if !in_use(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Name for an inner bean, unique within the owning factory.
    pub fn inner_bean_name(sequence: usize) -> String {
        format!("{}{}{}", INNER_BEAN_PREFIX, GENERATED_BEAN_NAME_SEPARATOR, sequence)
    }

    pub fn is_inner_bean_name(name: &str) -> bool {
        name.starts_with(INNER_BEAN_PREFIX)
    }
}

/// Dependency bookkeeping utilities
pub mod dependency {
    use std::collections::{HashMap, HashSet};

    /// Tracks beans currently being created to detect circular dependencies.
    ///
    /// Unlike a plain set, the creation order is kept so that the error for a
    /// cycle can show the full chain.
    #[derive(Debug, Default, Clone)]
    pub struct CreationTracker {
        creating: Vec<String>,
    }

    impl CreationTracker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_creating(&self, name: &str) -> bool {
            self.creating.iter().any(|n| n == name)
        }

        /// Marks a bean as being created.
        ///
        /// Returns `false` if the bean is already being created (circular dependency).
        pub fn start_creating(&mut self, name: &str) -> bool {
            if self.is_creating(name) {
                return false;
            }
            self.creating.push(name.to_string());
            true
        }

        pub fn finish_creating(&mut self, name: &str) {
            if let Some(position) = self.creating.iter().rposition(|n| n == name) {
                self.creating.remove(position);
            }
        }

        /// Chain from the first occurrence of `name` to the current bean, closed
        /// with `name` again, e.g. `a -> b -> a`.
        pub fn cycle_through(&self, name: &str) -> Vec<String> {
            let start = self.creating.iter().position(|n| n == name).unwrap_or(0);
            let mut chain = self.creating[start..].to_vec();
            chain.push(name.to_string());
            chain
        }

        pub fn current_creating(&self) -> &[String] {
            &self.creating
        }

        pub fn is_empty(&self) -> bool {
            self.creating.is_empty()
        }
    }

    /// Returns true if `target` is reachable from `start` in the given graph.
    pub fn is_reachable(graph: &HashMap<String, Vec<String>>, start: &str, target: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node.clone()) {
                continue;
            }
            if let Some(next) = graph.get(&node) {
                stack.extend(next.iter().cloned());
            }
        }
        false
    }
}
