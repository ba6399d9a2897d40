//! The [`ComponentFilter`] bitset.

use smallvec::SmallVec;

use crate::id::ComponentTypeId;

/// An immutable set of component type IDs, implemented as a bitset.
///
/// Filters restrict a snapshot synchronization to a subset of component
/// tables. They are pure values: comparable, unionable, and free of side
/// effects. Worker modules declare the components they read as a filter;
/// the kernel unions the filters of workers that share a provider.
///
/// The first 64 component types are stored inline; larger schemas spill
/// to the heap transparently.
#[derive(Clone, Debug, Default)]
pub struct ComponentFilter {
    words: SmallVec<[u64; 1]>,
}

impl ComponentFilter {
    const WORD_BITS: usize = 64;

    /// Create an empty filter.
    pub fn empty() -> Self {
        Self {
            words: SmallVec::new(),
        }
    }

    /// Create a filter containing a single component type.
    pub fn single(component: ComponentTypeId) -> Self {
        let mut filter = Self::empty();
        filter.insert(component);
        filter
    }

    /// Insert a component type into the filter.
    pub fn insert(&mut self, component: ComponentTypeId) {
        let word = component.0 as usize / Self::WORD_BITS;
        let bit = component.0 as usize % Self::WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    /// Check whether the filter contains a component type.
    pub fn contains(&self, component: ComponentTypeId) -> bool {
        let word = component.0 as usize / Self::WORD_BITS;
        let bit = component.0 as usize % Self::WORD_BITS;
        word < self.words.len() && (self.words[word] & (1u64 << bit)) != 0
    }

    /// Return the union of two filters (`self | other`).
    pub fn union(&self, other: &Self) -> Self {
        let max_len = self.words.len().max(other.words.len());
        let mut words = SmallVec::with_capacity(max_len);
        for i in 0..max_len {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            words.push(a | b);
        }
        Self { words }
    }

    /// Return the intersection of two filters (`self & other`).
    pub fn intersection(&self, other: &Self) -> Self {
        let min_len = self.words.len().min(other.words.len());
        let mut words = SmallVec::with_capacity(min_len);
        for i in 0..min_len {
            words.push(self.words[i] & other.words[i]);
        }
        while words.last() == Some(&0) {
            words.pop();
        }
        Self { words }
    }

    /// Check whether `self` is a subset of `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        for i in 0..self.words.len() {
            let b = other.words.get(i).copied().unwrap_or(0);
            if self.words[i] & !b != 0 {
                return false;
            }
        }
        true
    }

    /// Returns `true` if the filter contains no component types.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns the number of component types in the filter.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over the component type IDs in the filter, ascending.
    pub fn iter(&self) -> ComponentFilterIter<'_> {
        ComponentFilterIter {
            words: &self.words,
            word_idx: 0,
            bit_idx: 0,
        }
    }
}

impl PartialEq for ComponentFilter {
    fn eq(&self, other: &Self) -> bool {
        let max_len = self.words.len().max(other.words.len());
        for i in 0..max_len {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            if a != b {
                return false;
            }
        }
        true
    }
}

impl Eq for ComponentFilter {}

impl FromIterator<ComponentTypeId> for ComponentFilter {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        let mut filter = Self::empty();
        for component in iter {
            filter.insert(component);
        }
        filter
    }
}

impl<'a> IntoIterator for &'a ComponentFilter {
    type Item = ComponentTypeId;
    type IntoIter = ComponentFilterIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over component type IDs in a [`ComponentFilter`], ascending.
pub struct ComponentFilterIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    bit_idx: usize,
}

impl Iterator for ComponentFilterIter<'_> {
    type Item = ComponentTypeId;

    fn next(&mut self) -> Option<Self::Item> {
        while self.word_idx < self.words.len() {
            let word = self.words[self.word_idx];
            while self.bit_idx < 64 {
                let bit = self.bit_idx;
                self.bit_idx += 1;
                if word & (1u64 << bit) != 0 {
                    return Some(ComponentTypeId((self.word_idx * 64 + bit) as u32));
                }
            }
            self.word_idx += 1;
            self.bit_idx = 0;
        }
        None
    }
}
