//! Key Pattern Module
//!
//! Glob matching for pattern invalidation. `*` matches any substring
//! (including the empty one); every other character is literal.

// == Key Pattern ==
/// A compiled glob, split into the literal pieces between `*` wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    source: String,
    /// Literal segments, in order
    segments: Vec<String>,
    /// Pattern begins with `*`
    open_start: bool,
    /// Pattern ends with `*`
    open_end: bool,
}

impl KeyPattern {
    // == Compile ==
    /// Compiles a glob such as `product:*` into a matcher.
    pub fn compile(glob: &str) -> Self {
        let segments = glob
            .split('*')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            source: glob.to_string(),
            segments,
            open_start: glob.starts_with('*'),
            open_end: glob.ends_with('*'),
        }
    }

    /// Returns true if the pattern contains no wildcard.
    pub fn is_literal(&self) -> bool {
        !self.source.contains('*')
    }

    // == Matches ==
    /// Checks whether `key` matches the whole pattern.
    pub fn matches(&self, key: &str) -> bool {
        if self.is_literal() {
            return key == self.source;
        }

        let mut rest = key;
        let last = self.segments.len().saturating_sub(1);

        for (i, segment) in self.segments.iter().enumerate() {
            if i == 0 && !self.open_start {
                match rest.strip_prefix(segment.as_str()) {
                    Some(tail) => rest = tail,
                    None => return false,
                }
                continue;
            }

            if i == last && !self.open_end {
                // Final anchored segment must sit at the very end
                return rest.ends_with(segment.as_str());
            }

            match rest.find(segment.as_str()) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }

        // All segments consumed; a trailing literal with no `*` must leave nothing behind
        self.open_end || rest.is_empty()
    }
}
